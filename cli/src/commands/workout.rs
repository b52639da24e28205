use anyhow::{Result, bail};
use chrono::Duration;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use forma_core::FormaService;
use forma_core::metrics::calculate_volume;
use forma_core::models::{Workout, WorkoutSet};

use super::helpers::{
    confirm, finish_time, format_local, format_weight, json_error, parse_date, parse_set_spec,
    print_json, resolve_id, short_id, to_kg, truncate,
};

#[derive(Serialize)]
struct WorkoutDetail<'a> {
    workout: &'a Workout,
    sets: &'a [WorkoutSet],
    volume_kg: f64,
}

fn volume(sets: &[WorkoutSet]) -> f64 {
    calculate_volume(
        sets.iter()
            .filter(|s| s.completed)
            .filter_map(|s| Some((s.weight_kg?, s.reps?))),
    )
}

fn resolve_workout(svc: &FormaService, query: &str) -> Result<Workout> {
    let workouts = svc.get_workouts()?;
    let id = resolve_id(workouts.iter().map(|w| w.id.as_str()), query, "workout")?;
    svc.get_workout(&id)
}

pub(crate) fn cmd_workout_list(svc: &FormaService, limit: usize, json: bool) -> Result<()> {
    let workouts: Vec<Workout> = svc.get_workouts()?.into_iter().take(limit).collect();

    if json {
        return print_json(&workouts);
    }
    if workouts.is_empty() {
        eprintln!("No workouts yet. Use `forma workout record` to log one.");
        return Ok(());
    }

    let unit = svc.get_profile()?.weight_unit;

    #[derive(Tabled)]
    struct WorkoutRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Sets")]
        sets: usize,
        #[tabled(rename = "Volume")]
        volume: String,
        #[tabled(rename = "Min")]
        minutes: String,
        #[tabled(rename = "Sync")]
        sync: String,
    }

    let mut rows = Vec::with_capacity(workouts.len());
    for w in &workouts {
        let sets = svc.get_workout_sets(&w.id)?;
        rows.push(WorkoutRow {
            id: short_id(&w.id).to_string(),
            date: format_local(w.completed_at.unwrap_or(w.started_at)),
            name: truncate(&w.name, 30),
            sets: sets.iter().filter(|s| s.completed).count(),
            volume: format_weight(volume(&sets), unit),
            minutes: w
                .duration_minutes
                .map_or("-".into(), |m| m.to_string()),
            sync: w.sync_status.as_str().to_string(),
        });
    }

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_workout_show(svc: &FormaService, query: &str, json: bool) -> Result<()> {
    let workout = resolve_workout(svc, query)?;
    let sets = svc.get_workout_sets(&workout.id)?;
    let volume_kg = volume(&sets);

    if json {
        return print_json(&WorkoutDetail {
            workout: &workout,
            sets: &sets,
            volume_kg,
        });
    }

    let unit = svc.get_profile()?.weight_unit;
    println!("{} ({})", workout.name, workout.id);
    println!("  Started:  {}", format_local(workout.started_at));
    if let Some(done) = workout.completed_at {
        println!("  Finished: {}", format_local(done));
    }
    if let Some(m) = workout.duration_minutes {
        println!("  Duration: {m} min");
    }
    println!("  Volume:   {}", format_weight(volume_kg, unit));
    if let Some(ref n) = workout.notes {
        println!("  Notes:    {n}");
    }

    if sets.is_empty() {
        return Ok(());
    }

    #[derive(Tabled)]
    struct SetRow {
        #[tabled(rename = "Exercise")]
        exercise: String,
        #[tabled(rename = "Set")]
        set_number: u32,
        #[tabled(rename = "Weight")]
        weight: String,
        #[tabled(rename = "Reps")]
        reps: String,
        #[tabled(rename = "RPE")]
        rpe: String,
    }

    let rows: Vec<SetRow> = sets
        .iter()
        .map(|s| SetRow {
            exercise: truncate(&s.exercise_name, 30),
            set_number: s.set_number,
            weight: s
                .weight_kg
                .map_or("bodyweight".into(), |w| format_weight(w, unit)),
            reps: s.reps.map_or("-".into(), |r| r.to_string()),
            rpe: s.rpe.map_or("-".into(), |r| format!("{r:.1}")),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..5)).with(Alignment::right()))
        .to_string();
    println!("\n{table}");
    Ok(())
}

/// Record a finished workout from `Exercise=WEIGHTxREPS` set specs, in order.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_workout_record(
    svc: &FormaService,
    template: Option<&str>,
    name: Option<String>,
    set_specs: &[String],
    date: Option<String>,
    duration: u32,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    if set_specs.is_empty() {
        bail!("Log at least one set with --set 'Exercise=WEIGHTxREPS'");
    }
    let specs = set_specs
        .iter()
        .map(|s| parse_set_spec(s))
        .collect::<Result<Vec<_>>>()?;

    let unit = svc.get_profile()?.weight_unit;
    let finished_at = finish_time(parse_date(date)?)?;
    let started_at = finished_at - Duration::minutes(i64::from(duration));

    let mut session = svc.start_session(template, name, started_at)?;
    session.notes = notes;
    for spec in &specs {
        session.log_next(
            &spec.exercise,
            Some(spec.reps),
            spec.weight.map(|w| to_kg(w, unit)),
        );
    }

    let (workout, sets) = svc.finish_session(&session, finished_at)?;

    if json {
        return print_json(&WorkoutDetail {
            workout: &workout,
            sets: &sets,
            volume_kg: volume(&sets),
        });
    }

    println!(
        "Recorded '{}' with {} sets ({})",
        workout.name,
        sets.len(),
        short_id(&workout.id)
    );
    println!("  Volume: {}", format_weight(volume(&sets), unit));
    Ok(())
}

pub(crate) fn cmd_workout_delete(
    svc: &FormaService,
    query: &str,
    yes: bool,
    json: bool,
) -> Result<()> {
    let workout = resolve_workout(svc, query)?;

    if !yes && !json && !confirm(&format!("Delete '{}' and all its sets?", workout.name))? {
        eprintln!("Aborted");
        return Ok(());
    }

    let deleted = svc.delete_workout(&workout.id)?;
    if json {
        if deleted {
            println!("{}", serde_json::json!({ "deleted": workout.id }));
        } else {
            println!("{}", json_error(&format!("Workout {} not found", workout.id)));
        }
    } else {
        println!("Deleted workout '{}'", workout.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forma_core::metrics::LBS_PER_KG;
    use forma_core::models::{NewTemplate, NewTemplateExercise, ProfileUpdate, WeightUnit};

    fn specs(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_record_numbers_sets_per_exercise() {
        let svc = FormaService::new_in_memory().unwrap();
        cmd_workout_record(
            &svc,
            None,
            Some("Upper".to_string()),
            &specs(&["Bench Press=100x5", "Row=60x8", "bench press=100x4"]),
            Some("2024-03-01".to_string()),
            45,
            Some("felt strong".to_string()),
            true,
        )
        .unwrap();

        let workouts = svc.get_workouts().unwrap();
        assert_eq!(workouts.len(), 1);
        let w = &workouts[0];
        assert_eq!(w.name, "Upper");
        assert_eq!(w.duration_minutes, Some(45));
        assert_eq!(w.notes.as_deref(), Some("felt strong"));

        let sets = svc.get_workout_sets(&w.id).unwrap();
        let bench: Vec<_> = sets
            .iter()
            .filter(|s| s.exercise_name == "Bench Press")
            .collect();
        assert_eq!(bench.len(), 2);
        assert_eq!(bench[1].set_number, 2);
        assert_eq!(bench[1].reps, Some(4));
        assert!((volume(&sets) - (500.0 + 480.0 + 400.0)).abs() < 1e-9);
    }

    #[test]
    fn test_record_converts_from_lbs() {
        let svc = FormaService::new_in_memory().unwrap();
        svc.update_profile(&ProfileUpdate {
            weight_unit: Some(WeightUnit::Lbs),
            ..ProfileUpdate::default()
        })
        .unwrap();
        cmd_workout_record(&svc, None, None, &specs(&["Squat=225x5"]), None, 60, None, true)
            .unwrap();

        let w = &svc.get_workouts().unwrap()[0];
        let sets = svc.get_workout_sets(&w.id).unwrap();
        let kg = sets[0].weight_kg.unwrap();
        assert!((kg - 225.0 / LBS_PER_KG).abs() < 1e-9);
        assert_eq!(format_weight(kg, WeightUnit::Lbs), "225 lbs");
    }

    #[test]
    fn test_record_from_template_keeps_name() {
        let svc = FormaService::new_in_memory().unwrap();
        svc.create_template(&NewTemplate {
            name: "Leg Day".to_string(),
            exercises: vec![NewTemplateExercise {
                name: "Squat".to_string(),
                target_sets: 3,
                target_reps: "5".to_string(),
            }],
        })
        .unwrap();

        cmd_workout_record(
            &svc,
            Some("leg day"),
            None,
            &specs(&["Squat=140x5"]),
            None,
            60,
            None,
            true,
        )
        .unwrap();

        let w = &svc.get_workouts().unwrap()[0];
        assert_eq!(w.name, "Leg Day");
        // unlogged template sets are dropped
        assert_eq!(svc.get_workout_sets(&w.id).unwrap().len(), 1);
    }

    #[test]
    fn test_record_requires_sets() {
        let svc = FormaService::new_in_memory().unwrap();
        assert!(cmd_workout_record(&svc, None, None, &[], None, 60, None, true).is_err());
        assert!(svc.get_workouts().unwrap().is_empty());
    }

    #[test]
    fn test_record_rejects_future_date() {
        let svc = FormaService::new_in_memory().unwrap();
        let next_week = (chrono::Local::now().date_naive() + Duration::days(7))
            .format("%Y-%m-%d")
            .to_string();
        let result = cmd_workout_record(
            &svc,
            None,
            None,
            &specs(&["Squat=100x5"]),
            Some(next_week),
            60,
            None,
            true,
        );
        assert!(result.is_err());
        assert!(svc.get_workouts().unwrap().is_empty());
    }

    #[test]
    fn test_delete_by_prefix() {
        let svc = FormaService::new_in_memory().unwrap();
        cmd_workout_record(&svc, None, None, &specs(&["Curl=20x10"]), None, 30, None, true)
            .unwrap();
        let id = svc.get_workouts().unwrap()[0].id.clone();

        cmd_workout_delete(&svc, &id[..8], true, true).unwrap();
        assert!(svc.get_workouts().unwrap().is_empty());
    }
}
