//! Strength arithmetic: estimated maxes, plate loading, volume, rest timing.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{PersonalRecord, WeightUnit};

/// Epley loses accuracy past this many reps.
const MAX_REPS_FOR_ESTIMATE: u32 = 12;

const PLATES_KG: &[f64] = &[25.0, 20.0, 15.0, 10.0, 5.0, 2.5, 1.25];
const PLATES_LBS: &[f64] = &[45.0, 35.0, 25.0, 10.0, 5.0, 2.5];
const BAR_WEIGHT_KG: f64 = 20.0;
const BAR_WEIGHT_LBS: f64 = 45.0;

pub const LBS_PER_KG: f64 = 2.20462;

/// Rest timer presets in seconds.
pub const REST_PRESETS: &[u32] = &[30, 60, 90, 120, 180, 300];

const DEFAULT_REST_SECONDS: u32 = 90;

// --- One-rep max ---

/// Estimated one-rep max via the Epley formula.
#[must_use]
pub fn calculate_1rm(weight: f64, reps: u32) -> f64 {
    if reps <= 1 {
        return weight;
    }
    let reps = reps.min(MAX_REPS_FOR_ESTIMATE);
    (weight * (1.0 + f64::from(reps) / 30.0)).round()
}

/// Inverse Epley: the load that should allow `target_reps` given a max.
#[must_use]
pub fn working_weight(one_rep_max: f64, target_reps: u32) -> f64 {
    (one_rep_max / (1.0 + f64::from(target_reps) / 30.0)).round()
}

#[must_use]
pub fn percentage_of_max(one_rep_max: f64, percentage: u32) -> f64 {
    (one_rep_max * f64::from(percentage) / 100.0).round()
}

#[derive(Debug, Clone, Serialize)]
pub struct PercentageRow {
    pub percentage: u32,
    pub weight: f64,
    pub reps: &'static str,
}

const PERCENTAGE_REPS: &[(u32, &str)] = &[
    (100, "1"),
    (95, "2-3"),
    (90, "3-4"),
    (85, "5-6"),
    (80, "7-8"),
    (75, "9-10"),
    (70, "11-12"),
    (65, "13-15"),
    (60, "15-18"),
    (55, "18-20"),
    (50, "20+"),
];

#[must_use]
pub fn percentage_table(one_rep_max: f64) -> Vec<PercentageRow> {
    PERCENTAGE_REPS
        .iter()
        .map(|&(percentage, reps)| PercentageRow {
            percentage,
            weight: percentage_of_max(one_rep_max, percentage),
            reps,
        })
        .collect()
}

// --- Plates ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateCount {
    pub weight: f64,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateResult {
    /// Plates for one side of the bar, heaviest first.
    pub plates: Vec<PlateCount>,
    pub total_weight: f64,
    pub bar_weight: f64,
    pub is_achievable: bool,
}

#[must_use]
pub fn bar_weight(unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => BAR_WEIGHT_KG,
        WeightUnit::Lbs => BAR_WEIGHT_LBS,
    }
}

#[must_use]
pub fn available_plates(unit: WeightUnit) -> &'static [f64] {
    match unit {
        WeightUnit::Kg => PLATES_KG,
        WeightUnit::Lbs => PLATES_LBS,
    }
}

/// Greedy largest-first plate breakdown for a barbell load.
#[must_use]
#[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]
pub fn calculate_plates(target_weight: f64, unit: WeightUnit) -> PlateResult {
    let bar = bar_weight(unit);

    if target_weight < bar {
        return PlateResult {
            plates: Vec::new(),
            total_weight: bar,
            bar_weight: bar,
            is_achievable: false,
        };
    }

    let mut remaining = (target_weight - bar) / 2.0;
    let mut plates = Vec::new();

    for &plate in available_plates(unit) {
        // tolerate float drift from repeated subtraction
        if remaining + 1e-9 >= plate {
            let count = ((remaining + 1e-9) / plate).floor() as u32;
            plates.push(PlateCount {
                weight: plate,
                count,
            });
            remaining -= f64::from(count) * plate;
        }
    }

    let per_side: f64 = plates.iter().map(|p| p.weight * f64::from(p.count)).sum();

    PlateResult {
        plates,
        total_weight: bar + per_side * 2.0,
        bar_weight: bar,
        is_achievable: remaining.abs() < 0.01,
    }
}

// --- Conversions ---

#[must_use]
pub fn kg_to_lbs(kg: f64) -> f64 {
    (kg * LBS_PER_KG * 10.0).round() / 10.0
}

#[must_use]
pub fn lbs_to_kg(lbs: f64) -> f64 {
    (lbs / LBS_PER_KG * 10.0).round() / 10.0
}

// --- Aggregates ---

/// Total load moved: sum of weight x reps.
#[must_use]
pub fn calculate_volume<I>(sets: I) -> f64
where
    I: IntoIterator<Item = (f64, u32)>,
{
    sets.into_iter()
        .map(|(weight, reps)| weight * f64::from(reps))
        .sum()
}

/// Best lift by estimated 1RM. The earliest entry wins a tie.
#[must_use]
pub fn personal_record(history: &[(f64, u32, DateTime<Utc>)]) -> Option<PersonalRecord> {
    let mut best: Option<PersonalRecord> = None;
    for &(weight_kg, reps, date) in history {
        let estimate = calculate_1rm(weight_kg, reps);
        if best.as_ref().is_none_or(|b| estimate > b.estimated_one_rm) {
            best = Some(PersonalRecord {
                weight_kg,
                reps,
                date,
                estimated_one_rm: estimate,
            });
        }
    }
    best
}

// --- Rest timer ---

#[must_use]
pub fn format_rest_time(seconds: u32) -> String {
    let mins = seconds / 60;
    let secs = seconds % 60;
    if mins == 0 {
        format!("{secs}s")
    } else {
        format!("{mins}:{secs:02}")
    }
}

/// Accepts `1:30`, `90s`, or `90`. Unparseable input falls back to 90 seconds.
#[must_use]
pub fn parse_rest_time(input: &str) -> u32 {
    let input = input.trim();
    if let Some((mins, secs)) = input.split_once(':') {
        return match (mins.trim().parse::<u32>(), secs.trim().parse::<u32>()) {
            (Ok(m), Ok(s)) => m * 60 + s,
            _ => DEFAULT_REST_SECONDS,
        };
    }
    match input.trim_end_matches('s').trim().parse::<u32>() {
        Ok(0) | Err(_) => DEFAULT_REST_SECONDS,
        Ok(secs) => secs,
    }
}
