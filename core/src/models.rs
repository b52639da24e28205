use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Sync marker ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    #[default]
    Pending,
    Synced,
}

impl SyncStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
        }
    }
}

// --- Workouts ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workout {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub program_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_minutes: Option<u32>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
}

impl Workout {
    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[derive(Debug, Clone, Default)]
pub struct NewWorkout {
    pub name: Option<String>,
    pub notes: Option<String>,
    pub template_id: Option<String>,
    pub program_id: Option<String>,
    pub duration_minutes: Option<u32>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
#[allow(clippy::option_option)]
pub struct UpdateWorkout {
    pub name: Option<String>,
    pub notes: Option<Option<String>>,
    pub duration_minutes: Option<Option<u32>>,
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSet {
    pub id: String,
    pub workout_id: String,
    pub exercise_name: String,
    pub set_number: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reps: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpe: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWorkoutSet {
    pub workout_id: String,
    pub exercise_name: String,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f64>,
    pub notes: Option<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateWorkoutSet {
    pub exercise_name: Option<String>,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f64>,
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

// --- Templates ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub exercises: Vec<TemplateExercise>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateExercise {
    pub id: String,
    pub name: String,
    pub target_sets: u32,
    pub target_reps: String,
}

impl TemplateExercise {
    pub fn rep_range(&self) -> Result<RepRange> {
        self.target_reps.parse()
    }
}

#[derive(Debug, Clone)]
pub struct NewTemplate {
    pub name: String,
    pub exercises: Vec<NewTemplateExercise>,
}

#[derive(Debug, Clone)]
pub struct NewTemplateExercise {
    pub name: String,
    pub target_sets: u32,
    pub target_reps: String,
}

/// Inclusive rep target such as `8-12`, or a single count like `5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepRange {
    pub min: u32,
    pub max: u32,
}

impl FromStr for RepRange {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (min, max) = match s.split_once('-') {
            Some((lo, hi)) => (lo.trim(), hi.trim()),
            None => (s, s),
        };
        let min: u32 = min
            .parse()
            .with_context(|| format!("Invalid rep target '{s}'. Use '8' or '8-12'"))?;
        let max: u32 = max
            .parse()
            .with_context(|| format!("Invalid rep target '{s}'. Use '8' or '8-12'"))?;
        if min == 0 || min > max {
            bail!("Invalid rep target '{s}': range must be ascending and start at 1 or more");
        }
        Ok(Self { min, max })
    }
}

impl fmt::Display for RepRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else {
            write!(f, "{}-{}", self.min, self.max)
        }
    }
}

/// Upper bound on planned sets for one exercise in a template.
pub const MAX_TARGET_SETS: u32 = 20;

pub fn validate_template(template: &NewTemplate) -> Result<()> {
    if template.name.trim().is_empty() {
        bail!("Template name must not be empty");
    }
    if template.exercises.is_empty() {
        bail!("Add at least one exercise");
    }
    for ex in &template.exercises {
        if ex.name.trim().is_empty() {
            bail!("Exercise name must not be empty");
        }
        if ex.target_sets == 0 {
            bail!("'{}' needs at least one target set", ex.name);
        }
        if ex.target_sets > MAX_TARGET_SETS {
            bail!(
                "'{}' has {} target sets, at most {MAX_TARGET_SETS} are allowed",
                ex.name,
                ex.target_sets
            );
        }
        ex.target_reps.parse::<RepRange>()?;
    }
    Ok(())
}

// --- Profile ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    LoseFat,
    BuildMuscle,
    Maintain,
    Strength,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    Beginner,
    Intermediate,
    Advanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Equipment {
    FullGym,
    Home,
    Bodyweight,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Kg,
    Lbs,
}

impl Gender {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl Goal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::LoseFat => "lose_fat",
            Self::BuildMuscle => "build_muscle",
            Self::Maintain => "maintain",
            Self::Strength => "strength",
        }
    }

    /// Human wording, e.g. "lose fat".
    #[must_use]
    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl Experience {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

impl Equipment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FullGym => "full_gym",
            Self::Home => "home",
            Self::Bodyweight => "bodyweight",
        }
    }
}

impl WeightUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Lbs => "lbs",
        }
    }
}

impl FromStr for Gender {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            _ => bail!("Invalid gender '{s}'. Use male, female, or other"),
        }
    }
}

impl FromStr for Goal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "lose_fat" | "fat_loss" => Ok(Self::LoseFat),
            "build_muscle" | "muscle" => Ok(Self::BuildMuscle),
            "maintain" | "maintenance" => Ok(Self::Maintain),
            "strength" => Ok(Self::Strength),
            _ => bail!("Invalid goal '{s}'. Use lose_fat, build_muscle, maintain, or strength"),
        }
    }
}

impl FromStr for Experience {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => bail!("Invalid experience '{s}'. Use beginner, intermediate, or advanced"),
        }
    }
}

impl FromStr for Equipment {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "full_gym" | "gym" => Ok(Self::FullGym),
            "home" => Ok(Self::Home),
            "bodyweight" => Ok(Self::Bodyweight),
            _ => bail!("Invalid equipment '{s}'. Use full_gym, home, or bodyweight"),
        }
    }
}

impl FromStr for WeightUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(Self::Kg),
            "lbs" | "lb" => Ok(Self::Lbs),
            _ => bail!("Invalid unit '{s}'. Use 'kg' or 'lbs'"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height_cm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<Goal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experience: Option<Experience>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment: Option<Equipment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub injuries: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dietary_restrictions: Vec<String>,
    #[serde(default)]
    pub onboarding_complete: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub weight_unit: Option<WeightUnit>,
    pub goal: Option<Goal>,
    pub experience: Option<Experience>,
    pub workout_days: Option<u32>,
    pub workout_duration: Option<u32>,
    pub equipment: Option<Equipment>,
    pub injuries: Option<String>,
    pub dietary_restrictions: Option<Vec<String>>,
    pub onboarding_complete: Option<bool>,
}

impl Profile {
    /// Overlay the fields present in `update`.
    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(v) = update.age {
            self.age = Some(v);
        }
        if let Some(v) = update.gender {
            self.gender = Some(v);
        }
        if let Some(v) = update.height_cm {
            self.height_cm = Some(v);
        }
        if let Some(v) = update.weight_kg {
            self.weight_kg = Some(v);
        }
        if let Some(v) = update.weight_unit {
            self.weight_unit = v;
        }
        if let Some(v) = update.goal {
            self.goal = Some(v);
        }
        if let Some(v) = update.experience {
            self.experience = Some(v);
        }
        if let Some(v) = update.workout_days {
            self.workout_days = Some(v);
        }
        if let Some(v) = update.workout_duration {
            self.workout_duration = Some(v);
        }
        if let Some(v) = update.equipment {
            self.equipment = Some(v);
        }
        if let Some(v) = &update.injuries {
            self.injuries = Some(v.clone()).filter(|s| !s.trim().is_empty());
        }
        if let Some(v) = &update.dietary_restrictions {
            self.dietary_restrictions.clone_from(v);
        }
        if let Some(v) = update.onboarding_complete {
            self.onboarding_complete = v;
        }
    }
}

pub fn validate_profile_update(update: &ProfileUpdate) -> Result<()> {
    if let Some(age) = update.age {
        if !(10..=120).contains(&age) {
            bail!("Age must be between 10 and 120");
        }
    }
    if let Some(h) = update.height_cm {
        if !(50.0..=272.0).contains(&h) {
            bail!("Height must be between 50 and 272 cm");
        }
    }
    if let Some(w) = update.weight_kg {
        if w <= 0.0 || w > 500.0 {
            bail!("Weight must be between 0 and 500 kg");
        }
    }
    if let Some(d) = update.workout_days {
        if !(1..=7).contains(&d) {
            bail!("Training days must be between 1 and 7");
        }
    }
    if let Some(m) = update.workout_duration {
        if !(15..=180).contains(&m) {
            bail!("Session duration must be between 15 and 180 minutes");
        }
    }
    Ok(())
}

// --- AI-generated plans ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub schedule: serde_json::Value,
    pub duration_weeks: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewProgram {
    pub name: String,
    pub summary: Option<String>,
    pub schedule: serde_json::Value,
    pub duration_weeks: u32,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MealPlan {
    pub id: String,
    pub name: String,
    pub target_calories: u32,
    pub target_protein: u32,
    pub target_carbs: u32,
    pub target_fat: u32,
    pub meals: serde_json::Value,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMealPlan {
    pub name: String,
    pub target_calories: u32,
    pub target_protein: u32,
    pub target_carbs: u32,
    pub target_fat: u32,
    pub meals: serde_json::Value,
    pub active: bool,
}

// --- Summary / progress types ---

#[derive(Debug, Clone, Serialize)]
pub struct WorkoutStats {
    pub total_workouts: usize,
    pub this_week: usize,
    pub total_sets: usize,
    pub last_workout: Option<Workout>,
}

/// One completed workout's sets for a single exercise.
#[derive(Debug, Clone, Serialize)]
pub struct ExerciseSession {
    pub workout_id: String,
    pub workout_name: String,
    pub date: DateTime<Utc>,
    pub sets: Vec<SetPerformance>,
}

impl ExerciseSession {
    #[must_use]
    pub fn heaviest_weight(&self) -> f64 {
        self.sets.iter().map(|s| s.weight_kg).fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetPerformance {
    pub weight_kg: f64,
    pub reps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersonalRecord {
    pub weight_kg: f64,
    pub reps: u32,
    pub date: DateTime<Utc>,
    pub estimated_one_rm: f64,
}

// --- Auth ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|t| t <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rep_range_parse() {
        assert_eq!(
            "8-12".parse::<RepRange>().unwrap(),
            RepRange { min: 8, max: 12 }
        );
        assert_eq!(
            " 5 ".parse::<RepRange>().unwrap(),
            RepRange { min: 5, max: 5 }
        );
        assert_eq!(
            "10 - 15".parse::<RepRange>().unwrap(),
            RepRange { min: 10, max: 15 }
        );
    }

    #[test]
    fn test_rep_range_rejects_bad_input() {
        assert!("12-8".parse::<RepRange>().is_err());
        assert!("0".parse::<RepRange>().is_err());
        assert!("amrap".parse::<RepRange>().is_err());
        assert!("".parse::<RepRange>().is_err());
    }

    #[test]
    fn test_rep_range_display() {
        assert_eq!(RepRange { min: 8, max: 12 }.to_string(), "8-12");
        assert_eq!(RepRange { min: 5, max: 5 }.to_string(), "5");
    }

    fn push_day() -> NewTemplate {
        NewTemplate {
            name: "Push Day".to_string(),
            exercises: vec![NewTemplateExercise {
                name: "Bench Press".to_string(),
                target_sets: 3,
                target_reps: "8-12".to_string(),
            }],
        }
    }

    #[test]
    fn test_validate_template_valid() {
        assert!(validate_template(&push_day()).is_ok());
    }

    #[test]
    fn test_validate_template_requires_name_and_exercises() {
        let mut t = push_day();
        t.name = "   ".to_string();
        assert!(validate_template(&t).is_err());

        let mut t = push_day();
        t.exercises.clear();
        assert!(validate_template(&t).is_err());
    }

    #[test]
    fn test_validate_template_rejects_zero_sets() {
        let mut t = push_day();
        t.exercises[0].target_sets = 0;
        assert!(validate_template(&t).is_err());
    }

    #[test]
    fn test_validate_template_caps_sets() {
        let mut t = push_day();
        t.exercises[0].target_sets = MAX_TARGET_SETS;
        assert!(validate_template(&t).is_ok());

        t.exercises[0].target_sets = MAX_TARGET_SETS + 1;
        assert!(validate_template(&t).is_err());

        t.exercises[0].target_sets = u32::MAX;
        let err = validate_template(&t).unwrap_err();
        assert!(err.to_string().contains("at most 20"), "{err}");
    }

    #[test]
    fn test_goal_parse_and_label() {
        assert_eq!("lose fat".parse::<Goal>().unwrap(), Goal::LoseFat);
        assert_eq!("BUILD-MUSCLE".parse::<Goal>().unwrap(), Goal::BuildMuscle);
        assert!("bulk".parse::<Goal>().is_err());
        assert_eq!(Goal::BuildMuscle.label(), "build muscle");
    }

    #[test]
    fn test_weight_unit_parse() {
        assert_eq!("KG".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
        assert_eq!("lb".parse::<WeightUnit>().unwrap(), WeightUnit::Lbs);
        assert!("stone".parse::<WeightUnit>().is_err());
    }

    #[test]
    fn test_profile_apply_merges_fields() {
        let mut profile = Profile {
            age: Some(30),
            weight_kg: Some(80.0),
            ..Profile::default()
        };
        profile.apply(&ProfileUpdate {
            weight_kg: Some(78.5),
            goal: Some(Goal::Strength),
            ..ProfileUpdate::default()
        });
        assert_eq!(profile.age, Some(30));
        assert_eq!(profile.weight_kg, Some(78.5));
        assert_eq!(profile.goal, Some(Goal::Strength));
        assert!(!profile.onboarding_complete);
    }

    #[test]
    fn test_profile_apply_blank_injuries_clears() {
        let mut profile = Profile {
            injuries: Some("knee".to_string()),
            ..Profile::default()
        };
        profile.apply(&ProfileUpdate {
            injuries: Some(String::new()),
            ..ProfileUpdate::default()
        });
        assert!(profile.injuries.is_none());
    }

    #[test]
    fn test_validate_profile_update_ranges() {
        assert!(validate_profile_update(&ProfileUpdate::default()).is_ok());
        assert!(
            validate_profile_update(&ProfileUpdate {
                workout_days: Some(8),
                ..ProfileUpdate::default()
            })
            .is_err()
        );
        assert!(
            validate_profile_update(&ProfileUpdate {
                weight_kg: Some(0.0),
                ..ProfileUpdate::default()
            })
            .is_err()
        );
        assert!(
            validate_profile_update(&ProfileUpdate {
                age: Some(31),
                height_cm: Some(180.0),
                workout_duration: Some(60),
                ..ProfileUpdate::default()
            })
            .is_ok()
        );
    }

    #[test]
    fn test_profile_deserializes_from_empty_object() {
        let profile: Profile = serde_json::from_str("{}").unwrap();
        assert_eq!(profile, Profile::default());
        assert_eq!(profile.weight_unit, WeightUnit::Kg);
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let session = Session {
            user_id: "u1".to_string(),
            email: None,
            access_token: "t".to_string(),
            refresh_token: None,
            expires_at: Some(now - chrono::Duration::seconds(1)),
        };
        assert!(session.is_expired(now));
        let open_ended = Session {
            expires_at: None,
            ..session
        };
        assert!(!open_ended.is_expired(now));
    }
}
