use anyhow::{Context, Result};
use log::warn;
use serde::Serialize;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use forma_core::FormaService;
use forma_core::ai::{ChatCompletionProvider, DayWorkout, ScheduleDay};
use forma_core::models::{MealPlan, Program};

use super::helpers::{format_local, print_json, resolve_id, short_id, truncate};
use super::meals::print_meal_plan;

#[derive(Serialize)]
struct GeneratedView<'a> {
    program: &'a Program,
    meal_plan: &'a MealPlan,
}

fn print_schedule(program: &Program) {
    let schedule: Vec<ScheduleDay> = match serde_json::from_value(program.schedule.clone()) {
        Ok(s) => s,
        Err(e) => {
            warn!("program {} has an unreadable schedule: {e}", program.id);
            println!("{}", program.schedule);
            return;
        }
    };

    for day in &schedule {
        match &day.workout {
            DayWorkout::Rest(label) => println!("\n{}: {label}", day.day),
            DayWorkout::Session(w) => {
                println!("\n{}: {}", day.day, w.name);
                if w.exercises.is_empty() {
                    continue;
                }

                #[derive(Tabled)]
                struct ExerciseRow {
                    #[tabled(rename = "Exercise")]
                    name: String,
                    #[tabled(rename = "Sets")]
                    sets: u32,
                    #[tabled(rename = "Reps")]
                    reps: String,
                    #[tabled(rename = "Rest")]
                    rest: String,
                    #[tabled(rename = "Notes")]
                    notes: String,
                }

                let rows: Vec<ExerciseRow> = w
                    .exercises
                    .iter()
                    .map(|e| ExerciseRow {
                        name: truncate(&e.name, 30),
                        sets: e.sets,
                        reps: e.reps.clone(),
                        rest: e.rest.clone(),
                        notes: e.notes.as_deref().map(|n| truncate(n, 40)).unwrap_or_default(),
                    })
                    .collect();

                let table = Table::new(&rows)
                    .with(Style::rounded())
                    .with(Modify::new(Columns::new(1..4)).with(Alignment::right()))
                    .to_string();
                println!("{table}");
            }
        }
    }
}

fn print_program(program: &Program) {
    println!(
        "{} ({} weeks){}",
        program.name,
        program.duration_weeks,
        if program.active { " [active]" } else { "" }
    );
    if let Some(ref s) = program.summary {
        println!("{s}");
    }
    print_schedule(program);
}

/// Generate a program from the profile and store it with its meal plan.
pub(crate) async fn cmd_program_generate<P: ChatCompletionProvider>(
    svc: &FormaService,
    provider: &P,
    json: bool,
) -> Result<()> {
    if !json {
        eprintln!("Generating your program. This can take a minute...");
    }
    let generated = svc
        .generate_program(provider)
        .await
        .context("Program generation failed")?;
    let (program, meal_plan) = svc.save_generated_program(&generated)?;

    if json {
        return print_json(&GeneratedView {
            program: &program,
            meal_plan: &meal_plan,
        });
    }

    print_program(&program);
    println!();
    print_meal_plan(&meal_plan);
    Ok(())
}

fn resolve_program(svc: &FormaService, query: Option<&str>) -> Result<Program> {
    match query {
        Some(q) => {
            let programs = svc.get_programs()?;
            let id = resolve_id(programs.iter().map(|p| p.id.as_str()), q, "program")?;
            svc.get_program(&id)
        }
        None => svc
            .get_active_program()?
            .context("No active program. Run `forma program generate` first"),
    }
}

pub(crate) fn cmd_program_list(svc: &FormaService, json: bool) -> Result<()> {
    let programs = svc.get_programs()?;

    if json {
        return print_json(&programs);
    }
    if programs.is_empty() {
        eprintln!("No programs yet. Use `forma program generate` to create one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct ProgramRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Weeks")]
        weeks: u32,
        #[tabled(rename = "Active")]
        active: &'static str,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<ProgramRow> = programs
        .iter()
        .map(|p| ProgramRow {
            id: short_id(&p.id).to_string(),
            name: truncate(&p.name, 35),
            weeks: p.duration_weeks,
            active: if p.active { "*" } else { "" },
            created: format_local(p.created_at),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_program_show(svc: &FormaService, query: Option<&str>, json: bool) -> Result<()> {
    let program = resolve_program(svc, query)?;
    if json {
        print_json(&program)?;
    } else {
        print_program(&program);
    }
    Ok(())
}

pub(crate) fn cmd_program_activate(svc: &FormaService, query: &str, json: bool) -> Result<()> {
    let program = resolve_program(svc, Some(query))?;
    let program = svc.activate_program(&program.id)?;
    if json {
        print_json(&program)?;
    } else {
        println!("Activated program '{}'", program.name);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use forma_core::ai::ChatMessage;
    use forma_core::models::ProfileUpdate;

    struct CannedReply(&'static str);

    impl ChatCompletionProvider for CannedReply {
        async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
            Ok(self.0.to_string())
        }
    }

    const REPLY: &str = r#"{
        "summary": "Three full-body days",
        "calories": 2500,
        "protein": 160,
        "workoutPlan": {
            "name": "Foundations",
            "schedule": [
                {"day": "Monday", "workout": {"name": "Full Body A", "exercises": [
                    {"name": "Squat", "sets": 3, "reps": "5", "rest": "2 min"}
                ]}},
                {"day": "Tuesday", "workout": "Rest"}
            ]
        },
        "mealPlan": {"meals": [{"name": "Breakfast", "foods": [
            {"name": "Oats", "portion": "80g", "calories": 300, "protein": 10}
        ]}]}
    }"#;

    fn onboarded() -> FormaService {
        let svc = FormaService::new_in_memory().unwrap();
        svc.update_profile(&ProfileUpdate {
            age: Some(30),
            gender: Some("female".parse().unwrap()),
            height_cm: Some(168.0),
            weight_kg: Some(62.0),
            goal: Some("strength".parse().unwrap()),
            experience: Some("intermediate".parse().unwrap()),
            workout_days: Some(3),
            workout_duration: Some(60),
            equipment: Some("full_gym".parse().unwrap()),
            onboarding_complete: Some(true),
            ..ProfileUpdate::default()
        })
        .unwrap();
        svc
    }

    #[tokio::test]
    async fn test_generate_stores_active_program() {
        let svc = onboarded();
        cmd_program_generate(&svc, &CannedReply(REPLY), true)
            .await
            .unwrap();

        let program = svc.get_active_program().unwrap().unwrap();
        assert_eq!(program.name, "Foundations");
        assert_eq!(program.duration_weeks, 4);
        let plan = svc.get_active_meal_plan().unwrap().unwrap();
        assert_eq!(plan.name, "Foundations Nutrition");
        assert_eq!(plan.target_calories, 2500);
    }

    #[tokio::test]
    async fn test_generate_garbage_reply_stores_nothing() {
        let svc = onboarded();
        let err = cmd_program_generate(&svc, &CannedReply("sorry, no"), true).await;
        assert!(err.is_err());
        assert!(svc.get_programs().unwrap().is_empty());
    }

    #[test]
    fn test_activate_by_prefix() {
        let svc = onboarded();
        let first = svc
            .save_generated_program(&forma_core::ai::parse_generated_program(REPLY).unwrap())
            .unwrap()
            .0;
        svc.save_generated_program(&forma_core::ai::parse_generated_program(REPLY).unwrap())
            .unwrap();

        cmd_program_activate(&svc, &first.id[..8], true).unwrap();
        let active = svc.get_active_program().unwrap().unwrap();
        assert_eq!(active.id, first.id);
    }
}
