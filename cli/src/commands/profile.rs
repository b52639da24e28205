use anyhow::Result;
use clap::Args;
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use forma_core::FormaService;
use forma_core::ai::UserProfile;
use forma_core::models::{Profile, ProfileUpdate, WeightUnit};
use forma_core::nutrition::{BmrFormula, NutritionTargets};

use super::helpers::{format_weight, print_json, to_kg};

#[derive(Args, Debug, Default)]
pub(crate) struct ProfileSetArgs {
    /// Age in years
    #[arg(long)]
    pub age: Option<u32>,
    /// male, female, or other
    #[arg(long)]
    pub gender: Option<String>,
    /// Height in cm
    #[arg(long)]
    pub height: Option<f64>,
    /// Body weight, in --unit or the current display unit
    #[arg(long)]
    pub weight: Option<f64>,
    /// Display unit for weights: kg or lbs
    #[arg(long)]
    pub unit: Option<String>,
    /// lose_fat, build_muscle, maintain, or strength
    #[arg(long)]
    pub goal: Option<String>,
    /// beginner, intermediate, or advanced
    #[arg(long)]
    pub experience: Option<String>,
    /// Training days per week (1-7)
    #[arg(long)]
    pub days: Option<u32>,
    /// Session length in minutes
    #[arg(long)]
    pub duration: Option<u32>,
    /// full_gym, home, or bodyweight
    #[arg(long)]
    pub equipment: Option<String>,
    /// Injuries or limitations (empty string clears)
    #[arg(long)]
    pub injuries: Option<String>,
    /// Dietary restrictions, comma separated (e.g. "vegetarian,no dairy")
    #[arg(long, value_delimiter = ',')]
    pub diet: Option<Vec<String>>,
}

impl ProfileSetArgs {
    fn into_update(self, current_unit: WeightUnit) -> Result<ProfileUpdate> {
        let weight_unit = self.unit.as_deref().map(str::parse).transpose()?;
        let entry_unit = weight_unit.unwrap_or(current_unit);
        Ok(ProfileUpdate {
            age: self.age,
            gender: self.gender.as_deref().map(str::parse).transpose()?,
            height_cm: self.height,
            weight_kg: self.weight.map(|w| to_kg(w, entry_unit)),
            weight_unit,
            goal: self.goal.as_deref().map(str::parse).transpose()?,
            experience: self.experience.as_deref().map(str::parse).transpose()?,
            workout_days: self.days,
            workout_duration: self.duration,
            equipment: self.equipment.as_deref().map(str::parse).transpose()?,
            injuries: self.injuries,
            dietary_restrictions: self.diet.map(|d| {
                d.into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            onboarding_complete: None,
        })
    }
}

#[derive(Serialize)]
struct ProfileView<'a> {
    profile: &'a Profile,
    targets: Option<NutritionTargets>,
}

fn print_profile(profile: &Profile, targets: Option<&NutritionTargets>) {
    #[derive(Tabled)]
    struct FieldRow {
        #[tabled(rename = "Field")]
        field: &'static str,
        #[tabled(rename = "Value")]
        value: String,
    }

    let unset = || "-".to_string();
    let unit = profile.weight_unit;
    let rows = vec![
        FieldRow {
            field: "Age",
            value: profile.age.map_or_else(unset, |a| a.to_string()),
        },
        FieldRow {
            field: "Gender",
            value: profile.gender.map_or_else(unset, |g| g.as_str().to_string()),
        },
        FieldRow {
            field: "Height",
            value: profile.height_cm.map_or_else(unset, |h| format!("{h} cm")),
        },
        FieldRow {
            field: "Weight",
            value: profile.weight_kg.map_or_else(unset, |w| format_weight(w, unit)),
        },
        FieldRow {
            field: "Unit",
            value: unit.as_str().to_string(),
        },
        FieldRow {
            field: "Goal",
            value: profile.goal.map_or_else(unset, |g| g.label()),
        },
        FieldRow {
            field: "Experience",
            value: profile
                .experience
                .map_or_else(unset, |e| e.as_str().to_string()),
        },
        FieldRow {
            field: "Days/week",
            value: profile.workout_days.map_or_else(unset, |d| d.to_string()),
        },
        FieldRow {
            field: "Session",
            value: profile
                .workout_duration
                .map_or_else(unset, |m| format!("{m} min")),
        },
        FieldRow {
            field: "Equipment",
            value: profile
                .equipment
                .map_or_else(unset, |e| e.as_str().replace('_', " ")),
        },
        FieldRow {
            field: "Injuries",
            value: profile.injuries.clone().unwrap_or_else(unset),
        },
        FieldRow {
            field: "Diet",
            value: if profile.dietary_restrictions.is_empty() {
                unset()
            } else {
                profile.dietary_restrictions.join(", ")
            },
        },
    ];

    let table = Table::new(&rows).with(Style::rounded()).to_string();
    println!("{table}");

    if let Some(t) = targets {
        println!(
            "\nDaily targets: {:.0} kcal | P: {:.0}g | C: {:.0}g | F: {:.0}g",
            t.calories, t.protein_g, t.carbs_g, t.fat_g
        );
        println!(
            "  BMR {:.0} kcal ({}), TDEE {:.0} kcal, macros add up to {:.0} kcal",
            t.bmr,
            t.formula.as_str().replace('_', " "),
            t.tdee,
            t.macro_calories()
        );
    } else if !profile.onboarding_complete {
        eprintln!("\nProfile incomplete. Fill it in with `forma profile set`.");
    }
}

fn targets_for(profile: &Profile) -> Option<NutritionTargets> {
    UserProfile::try_from(profile).ok().map(|p| p.targets())
}

/// `formula` picks the BMR equation behind the daily targets.
pub(crate) fn cmd_profile_show(svc: &FormaService, formula: &str, json: bool) -> Result<()> {
    let formula: BmrFormula = formula.parse()?;
    let profile = svc.get_profile()?;
    let targets = svc.nutrition_targets(formula).ok();

    if json {
        print_json(&ProfileView {
            profile: &profile,
            targets,
        })?;
    } else {
        print_profile(&profile, targets.as_ref());
    }
    Ok(())
}

pub(crate) fn cmd_profile_set(svc: &FormaService, args: ProfileSetArgs, json: bool) -> Result<()> {
    let current = svc.get_profile()?;
    let update = args.into_update(current.weight_unit)?;
    let mut profile = svc.update_profile(&update)?;

    // the first complete profile finishes onboarding
    if !profile.onboarding_complete && UserProfile::try_from(&profile).is_ok() {
        profile = svc.update_profile(&ProfileUpdate {
            onboarding_complete: Some(true),
            ..ProfileUpdate::default()
        })?;
    }

    let targets = targets_for(&profile);
    if json {
        print_json(&ProfileView {
            profile: &profile,
            targets,
        })?;
    } else {
        println!("Profile updated");
        print_profile(&profile, targets.as_ref());
    }
    Ok(())
}
