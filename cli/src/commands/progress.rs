use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use forma_core::FormaService;
use forma_core::metrics::{calculate_1rm, calculate_volume};
use forma_core::models::{ExerciseSession, PersonalRecord};

use super::helpers::{format_local, format_weight, print_json, truncate};

pub(crate) fn cmd_stats(svc: &FormaService, json: bool) -> Result<()> {
    let stats = svc.get_workout_stats(Utc::now())?;

    if json {
        return print_json(&stats);
    }

    println!("Workouts:  {}", stats.total_workouts);
    println!("This week: {}", stats.this_week);
    println!("Sets:      {}", stats.total_sets);
    match stats.last_workout {
        Some(w) => println!(
            "Last:      {} ({})",
            w.name,
            format_local(w.completed_at.unwrap_or(w.started_at))
        ),
        None => eprintln!("No completed workouts yet"),
    }
    Ok(())
}

#[derive(Serialize)]
struct Progress<'a> {
    exercise: &'a str,
    personal_record: Option<PersonalRecord>,
    history: Vec<ExerciseSession>,
}

pub(crate) fn cmd_progress(
    svc: &FormaService,
    exercise: &str,
    limit: usize,
    json: bool,
) -> Result<()> {
    let history: Vec<ExerciseSession> = svc
        .get_exercise_history(exercise)?
        .into_iter()
        .take(limit)
        .collect();
    let pr = svc.get_exercise_pr(exercise)?;

    if json {
        return print_json(&Progress {
            exercise,
            personal_record: pr,
            history,
        });
    }

    let Some(pr) = pr else {
        eprintln!("No completed sets with weight for '{exercise}'");
        return Ok(());
    };

    let unit = svc.get_profile()?.weight_unit;
    println!(
        "PR: {} x {} on {} (est. 1RM {})",
        format_weight(pr.weight_kg, unit),
        pr.reps,
        pr.date.format("%Y-%m-%d"),
        format_weight(pr.estimated_one_rm, unit)
    );

    #[derive(Tabled)]
    struct SessionRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Workout")]
        workout: String,
        #[tabled(rename = "Sets")]
        sets: String,
        #[tabled(rename = "Top")]
        top: String,
        #[tabled(rename = "Est. 1RM")]
        one_rm: String,
        #[tabled(rename = "Volume")]
        volume: String,
    }

    let rows: Vec<SessionRow> = history
        .iter()
        .map(|s| {
            let best = s
                .sets
                .iter()
                .map(|p| calculate_1rm(p.weight_kg, p.reps))
                .fold(0.0, f64::max);
            SessionRow {
                date: s.date.format("%Y-%m-%d").to_string(),
                workout: truncate(&s.workout_name, 25),
                sets: truncate(
                    &s.sets
                        .iter()
                        .map(|p| format!("{}x{}", p.weight_kg, p.reps))
                        .collect::<Vec<_>>()
                        .join(", "),
                    30,
                ),
                top: format_weight(s.heaviest_weight(), unit),
                one_rm: format_weight(best, unit),
                volume: format_weight(
                    calculate_volume(s.sets.iter().map(|p| (p.weight_kg, p.reps))),
                    unit,
                ),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}
