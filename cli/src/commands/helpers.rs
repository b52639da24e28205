use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use std::io::{self, BufRead, Write};

use forma_core::metrics::{LBS_PER_KG, kg_to_lbs};
use forma_core::models::WeightUnit;

/// One logged set from the command line: `"Bench Press=100x5"`, or
/// `"Pull Up=x8"` for a set without load.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SetSpec {
    pub exercise: String,
    pub weight: Option<f64>,
    pub reps: u32,
}

pub(crate) fn parse_set_spec(s: &str) -> Result<SetSpec> {
    let usage = || format!("Invalid set '{s}'. Use 'Exercise=WEIGHTxREPS' or 'Exercise=xREPS'");

    let (exercise, load) = s.rsplit_once('=').with_context(usage)?;
    let exercise = exercise.trim();
    if exercise.is_empty() {
        bail!("{}", usage());
    }

    let (weight, reps) = load
        .trim()
        .to_lowercase()
        .split_once('x')
        .map(|(w, r)| (w.trim().to_string(), r.trim().to_string()))
        .with_context(usage)?;

    let reps: u32 = reps.parse().with_context(usage)?;
    if reps == 0 {
        bail!("Reps must be at least 1 in '{s}'");
    }
    let weight = if weight.is_empty() {
        None
    } else {
        let w: f64 = weight.parse().with_context(usage)?;
        if w < 0.0 {
            bail!("Weight must not be negative in '{s}'");
        }
        Some(w)
    };

    Ok(SetSpec {
        exercise: exercise.to_string(),
        weight,
        reps,
    })
}

/// `"Bench Press:3:8-12"` for template entries.
pub(crate) fn parse_template_exercise(s: &str) -> Result<(String, u32, String)> {
    let parts: Vec<&str> = s.split(':').map(str::trim).collect();
    let [name, sets, reps] = parts.as_slice() else {
        bail!("Invalid exercise '{s}'. Use 'Name:SETS:REPS' (e.g. 'Squat:3:8-12')");
    };
    let sets: u32 = sets
        .parse()
        .with_context(|| format!("Invalid set count in '{s}'"))?;
    Ok(((*name).to_string(), sets, (*reps).to_string()))
}

pub(crate) fn parse_date(date_str: Option<String>) -> Result<NaiveDate> {
    match date_str {
        None => Ok(Local::now().date_naive()),
        Some(s) => match s.as_str() {
            "today" => Ok(Local::now().date_naive()),
            "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
            _ => NaiveDate::parse_from_str(&s, "%Y-%m-%d").with_context(|| {
                format!("Invalid date '{s}'. Use YYYY-MM-DD, today, or yesterday")
            }),
        },
    }
}

/// Finish time for a workout recorded after the fact: now for today,
/// otherwise 18:00 local on the given day. Future days are rejected.
pub(crate) fn finish_time(date: NaiveDate) -> Result<DateTime<Utc>> {
    let today = Local::now().date_naive();
    if date > today {
        bail!("Cannot record a workout on {date}, which is in the future");
    }
    if date == today {
        return Ok(Utc::now());
    }
    let evening = date
        .and_hms_opt(18, 0, 0)
        .context("Invalid time of day")?;
    Local
        .from_local_datetime(&evening)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("No local time 18:00 on {date}"))
}

/// Weight entered in the profile's unit, stored in kg. Not rounded, so a
/// value entered in lbs displays back unchanged.
pub(crate) fn to_kg(value: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => value,
        WeightUnit::Lbs => value / LBS_PER_KG,
    }
}

pub(crate) fn format_weight(kg: f64, unit: WeightUnit) -> String {
    match unit {
        WeightUnit::Kg => format!("{} kg", no_neg_zero((kg * 10.0).round() / 10.0)),
        WeightUnit::Lbs => format!("{} lbs", no_neg_zero(kg_to_lbs(kg))),
    }
}

pub(crate) fn format_local(t: DateTime<Utc>) -> String {
    t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub(crate) fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

/// Resolve a full id or a unique prefix of one.
pub(crate) fn resolve_id<'a, I>(ids: I, query: &str, kind: &str) -> Result<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let query = query.trim();
    if query.is_empty() {
        bail!("Empty {kind} id");
    }
    let matches: Vec<&str> = ids.into_iter().filter(|id| id.starts_with(query)).collect();
    if let Some(exact) = matches.iter().find(|id| **id == query) {
        return Ok((*exact).to_string());
    }
    match matches.as_slice() {
        [] => bail!("No {kind} matches '{query}'"),
        [one] => Ok((*one).to_string()),
        _ => bail!(
            "'{query}' matches {} {kind}s. Use a longer id",
            matches.len()
        ),
    }
}

pub(crate) fn confirm(question: &str) -> Result<bool> {
    eprint!("{question} [y/N]: ");
    io::stderr().flush()?;
    let stdin = io::stdin();
    let Some(line) = stdin.lock().lines().next() else {
        return Ok(false);
    };
    let answer = line?.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes")
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

pub(crate) fn no_neg_zero(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
