use anyhow::{Result, bail};
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use forma_core::FormaService;
use forma_core::metrics::{
    REST_PRESETS, calculate_1rm, calculate_plates, format_rest_time, kg_to_lbs, lbs_to_kg,
    parse_rest_time, percentage_table, working_weight,
};
use forma_core::models::WeightUnit;

use super::helpers::no_neg_zero;

/// Explicit `--unit`, else the profile's display unit.
fn unit_or_profile(svc: &FormaService, unit: Option<&str>) -> Result<WeightUnit> {
    match unit {
        Some(u) => u.parse(),
        None => Ok(svc.get_profile()?.weight_unit),
    }
}

pub(crate) fn cmd_calc_one_rm(
    svc: &FormaService,
    weight: f64,
    reps: u32,
    unit: Option<&str>,
    json: bool,
) -> Result<()> {
    if weight <= 0.0 {
        bail!("Weight must be greater than 0");
    }
    if reps == 0 {
        bail!("Reps must be at least 1");
    }
    let unit = unit_or_profile(svc, unit)?;
    let one_rm = calculate_1rm(weight, reps);
    let table = percentage_table(one_rm);

    if json {
        #[derive(Serialize)]
        struct OneRepMax<'a> {
            weight: f64,
            reps: u32,
            unit: &'static str,
            one_rep_max: f64,
            percentages: &'a [forma_core::metrics::PercentageRow],
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&OneRepMax {
                weight,
                reps,
                unit: unit.as_str(),
                one_rep_max: one_rm,
                percentages: &table,
            })?
        );
        return Ok(());
    }

    let u = unit.as_str();
    if reps > 12 {
        eprintln!("Note: estimates above 12 reps are capped at 12");
    }
    println!("Estimated 1RM: {one_rm} {u} ({weight} {u} x {reps})");
    println!("Working weight for 5 reps: {} {u}", working_weight(one_rm, 5));

    #[derive(Tabled)]
    struct PercentRow {
        #[tabled(rename = "%")]
        percentage: u32,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Reps")]
        reps: &'static str,
    }

    let rows: Vec<PercentRow> = table
        .iter()
        .map(|r| PercentRow {
            percentage: r.percentage,
            weight: format!("{} {u}", r.weight),
            reps: r.reps,
        })
        .collect();

    let out = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..3)).with(Alignment::right()))
        .to_string();
    println!("{out}");
    Ok(())
}

pub(crate) fn cmd_calc_plates(
    svc: &FormaService,
    weight: f64,
    unit: Option<&str>,
    json: bool,
) -> Result<()> {
    let unit = unit_or_profile(svc, unit)?;
    let result = calculate_plates(weight, unit);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let u = unit.as_str();
    if weight < result.bar_weight {
        println!(
            "{weight} {u} is less than the bar ({} {u})",
            result.bar_weight
        );
        return Ok(());
    }
    if result.plates.is_empty() && result.is_achievable {
        println!("Just the bar: {} {u}", result.bar_weight);
        return Ok(());
    }

    println!("Bar: {} {u}. Per side:", result.bar_weight);

    #[derive(Tabled)]
    struct PlateRow {
        #[tabled(rename = "Plate")]
        plate: String,
        #[tabled(rename = "Count")]
        count: u32,
    }

    let rows: Vec<PlateRow> = result
        .plates
        .iter()
        .map(|p| PlateRow {
            plate: format!("{} {u}", p.weight),
            count: p.count,
        })
        .collect();

    let out = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .to_string();
    println!("{out}");

    if !result.is_achievable {
        println!(
            "Closest loadable: {} {u} ({} {u} short)",
            result.total_weight,
            no_neg_zero(((weight - result.total_weight) * 100.0).round() / 100.0)
        );
    }
    Ok(())
}

pub(crate) fn cmd_calc_convert(value: f64, from: &str, json: bool) -> Result<()> {
    let from: WeightUnit = from.parse()?;
    let (converted, to) = match from {
        WeightUnit::Kg => (kg_to_lbs(value), WeightUnit::Lbs),
        WeightUnit::Lbs => (lbs_to_kg(value), WeightUnit::Kg),
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "value": value,
                "from": from.as_str(),
                "converted": converted,
                "to": to.as_str(),
            })
        );
    } else {
        println!(
            "{value} {} = {converted} {}",
            from.as_str(),
            to.as_str()
        );
    }
    Ok(())
}

/// Normalize a rest time, or list the presets when none is given.
pub(crate) fn cmd_calc_rest(time: Option<&str>, json: bool) -> Result<()> {
    match time {
        Some(t) => {
            let seconds = parse_rest_time(t);
            if json {
                println!(
                    "{}",
                    serde_json::json!({ "seconds": seconds, "display": format_rest_time(seconds) })
                );
            } else {
                println!("{} ({seconds}s)", format_rest_time(seconds));
            }
        }
        None => {
            if json {
                let presets: Vec<_> = REST_PRESETS
                    .iter()
                    .map(|&s| serde_json::json!({ "seconds": s, "display": format_rest_time(s) }))
                    .collect();
                println!("{}", serde_json::to_string_pretty(&presets)?);
            } else {
                let labels: Vec<String> = REST_PRESETS.iter().map(|&s| format_rest_time(s)).collect();
                println!("Rest presets: {}", labels.join(", "));
            }
        }
    }
    Ok(())
}
