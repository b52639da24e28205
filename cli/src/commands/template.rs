use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use forma_core::FormaService;
use forma_core::models::{NewTemplate, NewTemplateExercise, Template};

use super::helpers::{json_error, parse_template_exercise, print_json, short_id, truncate};

pub(crate) fn cmd_template_create(
    svc: &FormaService,
    name: &str,
    exercises: &[String],
    json: bool,
) -> Result<()> {
    let exercises = exercises
        .iter()
        .map(|s| {
            let (name, target_sets, target_reps) = parse_template_exercise(s)?;
            Ok(NewTemplateExercise {
                name,
                target_sets,
                target_reps,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let template = svc.create_template(&NewTemplate {
        name: name.to_string(),
        exercises,
    })?;

    if json {
        print_json(&template)?;
    } else {
        println!(
            "Created template '{}' with {} exercises ({})",
            template.name,
            template.exercises.len(),
            short_id(&template.id)
        );
    }
    Ok(())
}

pub(crate) fn cmd_template_list(svc: &FormaService, json: bool) -> Result<()> {
    let templates = svc.get_templates()?;

    if json {
        return print_json(&templates);
    }
    if templates.is_empty() {
        eprintln!("No templates yet. Use `forma template create` to add one.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct TemplateRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Exercises")]
        exercises: usize,
        #[tabled(rename = "Sets")]
        sets: u32,
    }

    let rows: Vec<TemplateRow> = templates
        .iter()
        .map(|t| TemplateRow {
            id: short_id(&t.id).to_string(),
            name: truncate(&t.name, 35),
            exercises: t.exercises.len(),
            sets: t.exercises.iter().map(|e| e.target_sets).sum(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

fn print_template(template: &Template) {
    println!("{} ({})", template.name, template.id);

    #[derive(Tabled)]
    struct ExerciseRow {
        #[tabled(rename = "#")]
        idx: usize,
        #[tabled(rename = "Exercise")]
        name: String,
        #[tabled(rename = "Sets")]
        sets: u32,
        #[tabled(rename = "Reps")]
        reps: String,
    }

    let rows: Vec<ExerciseRow> = template
        .exercises
        .iter()
        .enumerate()
        .map(|(i, e)| ExerciseRow {
            idx: i + 1,
            name: e.name.clone(),
            sets: e.target_sets,
            reps: e.target_reps.clone(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn cmd_template_show(svc: &FormaService, query: &str, json: bool) -> Result<()> {
    let template = svc.find_template(query)?;
    if json {
        print_json(&template)?;
    } else {
        print_template(&template);
    }
    Ok(())
}

pub(crate) fn cmd_template_delete(svc: &FormaService, query: &str, json: bool) -> Result<()> {
    let deleted = svc.delete_template(query)?;

    if json {
        if deleted {
            println!("{}", serde_json::json!({ "deleted": query }));
        } else {
            println!("{}", json_error(&format!("Template '{query}' not found")));
        }
    } else if deleted {
        println!("Deleted template '{query}'");
    } else {
        eprintln!("Template '{query}' not found");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_rejects_oversized_set_count() {
        let svc = FormaService::new_in_memory().unwrap();
        let err = cmd_template_create(&svc, "Legs", &["Squat:4294967295:5".to_string()], true)
            .unwrap_err();
        assert!(format!("{err:#}").contains("at most"), "{err:#}");
        assert!(svc.get_templates().unwrap().is_empty());
    }

    #[test]
    fn test_create_stores_template() {
        let svc = FormaService::new_in_memory().unwrap();
        cmd_template_create(&svc, "Legs", &["Squat:5:5".to_string()], true).unwrap();
        let templates = svc.get_templates().unwrap();
        assert_eq!(templates.len(), 1);
        assert_eq!(templates[0].exercises[0].target_sets, 5);
    }
}
