use anyhow::{Result, bail};
use chrono::Utc;
use log::info;
use tabled::{Table, Tabled, settings::Style};

use forma_core::FormaService;
use forma_core::exercises::{
    Exercise, ExerciseSource, fallback_exercises, filter_exercises, muscle_groups,
};

use super::helpers::{print_json, truncate};

/// Browse the exercise catalog. Without a cloud backend only the built-in
/// list is available.
pub(crate) async fn cmd_exercises<S: ExerciseSource>(
    svc: &FormaService,
    source: Option<&S>,
    muscle: Option<&str>,
    search: Option<&str>,
    json: bool,
) -> Result<()> {
    if let Some(m) = muscle {
        if !muscle_groups().iter().any(|g| g.eq_ignore_ascii_case(m)) {
            bail!(
                "Unknown muscle group '{m}'. Use one of: {}",
                muscle_groups().join(", ")
            );
        }
    }

    let catalog = match source {
        Some(s) => svc.get_exercises(s, Utc::now()).await?,
        None => {
            info!("no cloud backend configured, using the built-in exercise list");
            fallback_exercises()
        }
    };
    let matches: Vec<&Exercise> = filter_exercises(&catalog, muscle, search);

    if json {
        return print_json(&matches);
    }
    if matches.is_empty() {
        eprintln!("No exercises match");
        return Ok(());
    }

    #[derive(Tabled)]
    struct ExerciseRow {
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Muscle")]
        muscle: String,
        #[tabled(rename = "Equipment")]
        equipment: String,
        #[tabled(rename = "Instructions")]
        instructions: String,
    }

    let rows: Vec<ExerciseRow> = matches
        .iter()
        .map(|e| ExerciseRow {
            name: e.name.clone(),
            muscle: e.muscle_group.clone(),
            equipment: e.equipment.clone().unwrap_or_default(),
            instructions: e
                .instructions
                .as_deref()
                .map(|i| truncate(i, 50))
                .unwrap_or_default(),
        })
        .collect();

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");
    Ok(())
}
