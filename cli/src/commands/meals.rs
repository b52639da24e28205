use anyhow::{Context, Result};
use log::warn;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use forma_core::FormaService;
use forma_core::ai::PlannedMeal;
use forma_core::models::MealPlan;

use super::helpers::{format_local, print_json, resolve_id, short_id, truncate};

pub(crate) fn print_meal_plan(plan: &MealPlan) {
    println!(
        "{}{}",
        plan.name,
        if plan.active { " [active]" } else { "" }
    );
    println!(
        "Targets: {} kcal | P: {}g | C: {}g | F: {}g",
        plan.target_calories, plan.target_protein, plan.target_carbs, plan.target_fat
    );

    let meals: Vec<PlannedMeal> = match serde_json::from_value(plan.meals.clone()) {
        Ok(m) => m,
        Err(e) => {
            warn!("meal plan {} has unreadable meals: {e}", plan.id);
            println!("{}", plan.meals);
            return;
        }
    };

    #[derive(Tabled)]
    struct FoodRow {
        #[tabled(rename = "Meal")]
        meal: String,
        #[tabled(rename = "Food")]
        food: String,
        #[tabled(rename = "Portion")]
        portion: String,
        #[tabled(rename = "Cal")]
        calories: u32,
        #[tabled(rename = "Protein")]
        protein: String,
    }

    let rows: Vec<FoodRow> = meals
        .iter()
        .flat_map(|m| {
            m.foods.iter().map(move |f| FoodRow {
                meal: m.name.clone(),
                food: truncate(&f.name, 35),
                portion: f.portion.clone(),
                calories: f.calories,
                protein: format!("{}g", f.protein),
            })
        })
        .collect();

    if rows.is_empty() {
        return;
    }
    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..5)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

fn resolve_meal_plan(svc: &FormaService, query: Option<&str>) -> Result<MealPlan> {
    match query {
        Some(q) => {
            let plans = svc.get_meal_plans()?;
            let id = resolve_id(plans.iter().map(|p| p.id.as_str()), q, "meal plan")?;
            svc.get_meal_plan(&id)
        }
        None => svc
            .get_active_meal_plan()?
            .context("No active meal plan. Run `forma program generate` first"),
    }
}

pub(crate) fn cmd_meals_list(svc: &FormaService, json: bool) -> Result<()> {
    let plans = svc.get_meal_plans()?;

    if json {
        return print_json(&plans);
    }
    if plans.is_empty() {
        eprintln!("No meal plans yet. They are created by `forma program generate`.");
        return Ok(());
    }

    #[derive(Tabled)]
    struct PlanRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Calories")]
        calories: u32,
        #[tabled(rename = "P")]
        protein: u32,
        #[tabled(rename = "C")]
        carbs: u32,
        #[tabled(rename = "F")]
        fat: u32,
        #[tabled(rename = "Active")]
        active: &'static str,
        #[tabled(rename = "Created")]
        created: String,
    }

    let rows: Vec<PlanRow> = plans
        .iter()
        .map(|p| PlanRow {
            id: short_id(&p.id).to_string(),
            name: truncate(&p.name, 35),
            calories: p.target_calories,
            protein: p.target_protein,
            carbs: p.target_carbs,
            fat: p.target_fat,
            active: if p.active { "*" } else { "" },
            created: format_local(p.created_at),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..6)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_meals_show(svc: &FormaService, query: Option<&str>, json: bool) -> Result<()> {
    let plan = resolve_meal_plan(svc, query)?;
    if json {
        print_json(&plan)?;
    } else {
        print_meal_plan(&plan);
    }
    Ok(())
}

pub(crate) fn cmd_meals_activate(svc: &FormaService, query: &str, json: bool) -> Result<()> {
    let plan = resolve_meal_plan(svc, Some(query))?;
    let plan = svc.activate_meal_plan(&plan.id)?;
    if json {
        print_json(&plan)?;
    } else {
        println!("Activated meal plan '{}'", plan.name);
    }
    Ok(())
}
