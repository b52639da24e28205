//! Energy budget arithmetic used to anchor generated programs.

use std::str::FromStr;

use anyhow::{Result, bail};
use serde::Serialize;

use crate::models::{Gender, Goal};

const KCAL_PER_G_PROTEIN: f64 = 4.0;
const KCAL_PER_G_CARBS: f64 = 4.0;
const KCAL_PER_G_FAT: f64 = 9.0;

/// Share of calories assigned to fat when the split is derived locally.
const FAT_SHARE: f64 = 0.25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BmrFormula {
    #[default]
    MifflinStJeor,
    /// Roza & Shizgal revision.
    HarrisBenedict,
}

impl BmrFormula {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MifflinStJeor => "mifflin_st_jeor",
            Self::HarrisBenedict => "harris_benedict",
        }
    }
}

impl FromStr for BmrFormula {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "mifflin_st_jeor" | "mifflin" => Ok(Self::MifflinStJeor),
            "harris_benedict" | "harris" => Ok(Self::HarrisBenedict),
            _ => bail!("Invalid formula '{s}'. Use mifflin or harris-benedict"),
        }
    }
}

/// The body measurements the BMR formulas need.
#[derive(Debug, Clone, Copy)]
pub struct BodyMetrics {
    pub gender: Gender,
    pub age: u32,
    pub height_cm: f64,
    pub weight_kg: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NutritionTargets {
    pub formula: BmrFormula,
    pub bmr: f64,
    pub tdee: f64,
    pub calories: f64,
    pub protein_g: f64,
    pub protein_per_kg: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

#[must_use]
pub fn bmr(body: &BodyMetrics, formula: BmrFormula) -> f64 {
    let w = body.weight_kg;
    let h = body.height_cm;
    let a = f64::from(body.age);
    match formula {
        BmrFormula::MifflinStJeor => {
            let base = 10.0 * w + 6.25 * h - 5.0 * a;
            match body.gender {
                Gender::Male => base + 5.0,
                Gender::Female | Gender::Other => base - 161.0,
            }
        }
        BmrFormula::HarrisBenedict => match body.gender {
            Gender::Male => 88.362 + 13.397 * w + 4.799 * h - 5.677 * a,
            Gender::Female | Gender::Other => 447.593 + 9.247 * w + 3.098 * h - 4.330 * a,
        },
    }
}

#[must_use]
pub fn activity_multiplier(training_days: u32) -> f64 {
    match training_days {
        0..=2 => 1.375,
        3..=4 => 1.55,
        _ => 1.725,
    }
}

/// Calorie offset from TDEE and protein grams per kg bodyweight for a goal.
#[must_use]
pub fn goal_adjustment(goal: Goal) -> (f64, f64) {
    match goal {
        Goal::LoseFat => (-500.0, 2.2),
        Goal::BuildMuscle => (250.0, 2.0),
        Goal::Strength => (100.0, 1.8),
        Goal::Maintain => (0.0, 1.6),
    }
}

#[must_use]
pub fn calculate_targets(
    body: &BodyMetrics,
    training_days: u32,
    goal: Goal,
    formula: BmrFormula,
) -> NutritionTargets {
    let bmr = bmr(body, formula);
    let tdee = (bmr * activity_multiplier(training_days)).round();
    let (offset, protein_per_kg) = goal_adjustment(goal);
    let calories = tdee + offset;
    let protein_g = (body.weight_kg * protein_per_kg).round();
    let (carbs_g, fat_g) = split_remaining(calories, protein_g);

    NutritionTargets {
        formula,
        bmr,
        tdee,
        calories,
        protein_g,
        protein_per_kg,
        carbs_g,
        fat_g,
    }
}

/// Carbs and fat grams for a calorie budget once protein is fixed. Fat takes a
/// quarter of the calories and carbs the rest, never below zero.
#[must_use]
pub fn split_remaining(calories: f64, protein_g: f64) -> (f64, f64) {
    let fat_g = (calories * FAT_SHARE / KCAL_PER_G_FAT).round();
    let carbs_g = ((calories - protein_g * KCAL_PER_G_PROTEIN - fat_g * KCAL_PER_G_FAT)
        / KCAL_PER_G_CARBS)
        .round()
        .max(0.0);
    (carbs_g, fat_g)
}

/// Calories implied by a macro split.
#[must_use]
pub fn macro_calories(protein_g: f64, carbs_g: f64, fat_g: f64) -> f64 {
    protein_g * KCAL_PER_G_PROTEIN + carbs_g * KCAL_PER_G_CARBS + fat_g * KCAL_PER_G_FAT
}

impl NutritionTargets {
    /// Calories the rounded macro grams actually add up to.
    #[must_use]
    pub fn macro_calories(&self) -> f64 {
        macro_calories(self.protein_g, self.carbs_g, self.fat_g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn male_80kg() -> BodyMetrics {
        BodyMetrics {
            gender: Gender::Male,
            age: 30,
            height_cm: 180.0,
            weight_kg: 80.0,
        }
    }

    #[test]
    fn test_mifflin_st_jeor() {
        // 800 + 1125 - 150 + 5
        assert!((bmr(&male_80kg(), BmrFormula::MifflinStJeor) - 1780.0).abs() < 1e-9);

        let female = BodyMetrics {
            gender: Gender::Female,
            ..male_80kg()
        };
        assert!((bmr(&female, BmrFormula::MifflinStJeor) - 1614.0).abs() < 1e-9);
    }

    #[test]
    fn test_harris_benedict() {
        let v = bmr(&male_80kg(), BmrFormula::HarrisBenedict);
        // 88.362 + 1071.76 + 863.82 - 170.31
        assert!((v - 1853.632).abs() < 0.01);
    }

    #[test]
    fn test_formula_parse() {
        assert_eq!("mifflin".parse::<BmrFormula>().unwrap(), BmrFormula::MifflinStJeor);
        assert_eq!(
            "Harris-Benedict".parse::<BmrFormula>().unwrap(),
            BmrFormula::HarrisBenedict
        );
        assert!("katch".parse::<BmrFormula>().is_err());
    }

    #[test]
    fn test_targets_follow_formula() {
        let t = calculate_targets(&male_80kg(), 4, Goal::Maintain, BmrFormula::HarrisBenedict);
        assert_eq!(t.formula, BmrFormula::HarrisBenedict);
        // 1853.632 * 1.55
        assert!((t.tdee - 2873.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_activity_multiplier_bands() {
        assert!((activity_multiplier(2) - 1.375).abs() < f64::EPSILON);
        assert!((activity_multiplier(3) - 1.55).abs() < f64::EPSILON);
        assert!((activity_multiplier(4) - 1.55).abs() < f64::EPSILON);
        assert!((activity_multiplier(6) - 1.725).abs() < f64::EPSILON);
    }

    #[test]
    fn test_targets_lose_fat() {
        let t = calculate_targets(&male_80kg(), 4, Goal::LoseFat, BmrFormula::MifflinStJeor);
        // 1780 * 1.55 = 2759
        assert!((t.tdee - 2759.0).abs() < f64::EPSILON);
        assert!((t.calories - 2259.0).abs() < f64::EPSILON);
        assert!((t.protein_g - 176.0).abs() < f64::EPSILON);
        assert!((t.protein_per_kg - 2.2).abs() < f64::EPSILON);
    }

    #[test]
    fn test_targets_macros_add_up() {
        for goal in [Goal::LoseFat, Goal::BuildMuscle, Goal::Strength, Goal::Maintain] {
            let t = calculate_targets(&male_80kg(), 5, goal, BmrFormula::MifflinStJeor);
            let implied = t.macro_calories();
            // rounding each macro to whole grams leaves a small gap
            assert!((implied - t.calories).abs() < 15.0, "{goal:?}: {implied} vs {}", t.calories);
        }
    }

    #[test]
    fn test_split_remaining_never_negative() {
        let (carbs, fat) = split_remaining(1200.0, 250.0);
        assert!((carbs - 0.0).abs() < f64::EPSILON);
        assert!((fat - 33.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_targets_build_muscle_surplus() {
        let t = calculate_targets(&male_80kg(), 4, Goal::BuildMuscle, BmrFormula::MifflinStJeor);
        assert!((t.calories - (t.tdee + 250.0)).abs() < f64::EPSILON);
        assert!((t.protein_g - 160.0).abs() < f64::EPSILON);
    }
}
