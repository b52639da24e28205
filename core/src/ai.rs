//! Program generation through an OpenAI-compatible chat-completion endpoint.
//!
//! Core owns the wire types, the prompt and the response decoding. The HTTP
//! transport lives behind [`ChatCompletionProvider`] so the CLI (or a test
//! double) can supply it.

use anyhow::{Result, bail};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::FormaError;
use crate::models::{
    Equipment, Experience, Gender, Goal, NewMealPlan, NewProgram, Profile,
};
use crate::nutrition::{self, BmrFormula, BodyMetrics, NutritionTargets};

pub const DEFAULT_MODEL: &str = "llama-3.3-70b-versatile";
pub const TEMPERATURE: f64 = 0.7;
pub const MAX_TOKENS: u32 = 4000;

/// Program length when the model does not state one.
pub const DEFAULT_DURATION_WEEKS: u32 = 4;

// --- Wire types ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub temperature: f64,
    pub max_tokens: u32,
}

impl<'a> ChatCompletionRequest<'a> {
    #[must_use]
    pub fn new(model: &'a str, messages: &'a [ChatMessage]) -> Self {
        Self {
            model,
            messages,
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionResponse {
    /// Text of the first choice.
    pub fn into_content(self) -> Result<String> {
        let Some(choice) = self.choices.into_iter().next() else {
            bail!("Chat completion returned no choices");
        };
        Ok(choice.message.content.unwrap_or_default())
    }
}

/// Transport for chat completions. Implementations return the assistant text.
#[allow(async_fn_in_trait)]
pub trait ChatCompletionProvider {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

// --- Prompt ---

/// A profile with every field program generation needs.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub age: u32,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub goal: Goal,
    pub experience: Experience,
    pub workout_days: u32,
    pub workout_duration: u32,
    pub equipment: Equipment,
    pub injuries: Option<String>,
    pub dietary_restrictions: Vec<String>,
}

impl TryFrom<&Profile> for UserProfile {
    type Error = FormaError;

    fn try_from(p: &Profile) -> Result<Self, Self::Error> {
        Ok(Self {
            age: p.age.ok_or(FormaError::IncompleteProfile("age"))?,
            gender: p.gender.ok_or(FormaError::IncompleteProfile("gender"))?,
            height_cm: p.height_cm.ok_or(FormaError::IncompleteProfile("height"))?,
            weight_kg: p.weight_kg.ok_or(FormaError::IncompleteProfile("weight"))?,
            goal: p.goal.ok_or(FormaError::IncompleteProfile("goal"))?,
            experience: p
                .experience
                .ok_or(FormaError::IncompleteProfile("experience"))?,
            workout_days: p
                .workout_days
                .ok_or(FormaError::IncompleteProfile("training days"))?,
            workout_duration: p
                .workout_duration
                .ok_or(FormaError::IncompleteProfile("session duration"))?,
            equipment: p.equipment.ok_or(FormaError::IncompleteProfile("equipment"))?,
            injuries: p.injuries.clone().filter(|s| !s.trim().is_empty()),
            dietary_restrictions: p.dietary_restrictions.clone(),
        })
    }
}

impl UserProfile {
    #[must_use]
    pub fn body(&self) -> BodyMetrics {
        BodyMetrics {
            gender: self.gender,
            age: self.age,
            height_cm: self.height_cm,
            weight_kg: self.weight_kg,
        }
    }

    #[must_use]
    pub fn targets(&self) -> NutritionTargets {
        self.targets_with(BmrFormula::default())
    }

    #[must_use]
    pub fn targets_with(&self, formula: BmrFormula) -> NutritionTargets {
        nutrition::calculate_targets(&self.body(), self.workout_days, self.goal, formula)
    }
}

fn goal_protocol(goal: Goal) -> &'static str {
    match goal {
        Goal::BuildMuscle => {
            "**HYPERTROPHY PROTOCOL:**
- 8-12 reps for most exercises, 3-4 sets each, 10-20 weekly sets per muscle group
- Rest 60-90 seconds between sets
- Compound lifts plus isolation work, progressive overload every week
- Protein 1.6-2.2 g/kg, surplus of roughly 250 kcal"
        }
        Goal::LoseFat => {
            "**FAT LOSS PROTOCOL:**
- Supersets and circuits pairing opposing muscle groups
- 12-15 reps, 30-45 seconds rest, a metabolic finisher each session
- Compound movements first
- Protein 2.0-2.4 g/kg, deficit of roughly 500 kcal"
        }
        Goal::Strength => {
            "**STRENGTH PROTOCOL:**
- Main lifts at 3-6 reps for 4-6 sets, rest 3-5 minutes
- Build around squat, bench press and deadlift variations
- Accessories at 8-12 reps
- Protein 1.6-2.0 g/kg, maintenance or a slight surplus"
        }
        Goal::Maintain => {
            "**GENERAL FITNESS PROTOCOL:**
- Resistance training plus 2-3 moderate cardio sessions
- 8-15 reps, 60-90 seconds rest
- Full body or upper/lower splits, balance every muscle group
- Protein 1.4-1.6 g/kg at maintenance calories"
        }
    }
}

/// Exercise count band for a session length.
#[must_use]
pub fn exercise_count(goal: Goal, duration_minutes: u32) -> &'static str {
    if goal == Goal::Strength {
        return if duration_minutes <= 45 { "3-4" } else { "4-6" };
    }
    match duration_minutes {
        0..=30 => "4-5",
        31..=45 => "5-6",
        46..=60 => "6-8",
        _ => "8-10",
    }
}

fn exercise_guidelines(goal: Goal, duration_minutes: u32) -> String {
    let count = exercise_count(goal, duration_minutes);
    match goal {
        Goal::LoseFat => format!(
            "- {count} exercises per workout\n\
             - Structure as 2-3 supersets (A1/A2)\n\
             - Finish with a circuit or metabolic finisher"
        ),
        Goal::Strength => format!(
            "- {count} exercises per workout\n\
             - 1-2 main compound lifts with long rest\n\
             - 2-3 accessory exercises with moderate rest"
        ),
        Goal::BuildMuscle | Goal::Maintain => format!(
            "- {count} exercises per workout\n\
             - Mix compound and isolation movements"
        ),
    }
}

#[must_use]
pub fn build_prompt(profile: &UserProfile, targets: &NutritionTargets) -> String {
    let goal = profile.goal.label();
    let mut client = vec![
        format!("- Age: {}", profile.age),
        format!("- Gender: {}", profile.gender.as_str()),
        format!("- Height: {}cm", profile.height_cm),
        format!("- Weight: {}kg", profile.weight_kg),
        format!("- Goal: {}", goal.to_uppercase()),
        format!("- Experience: {}", profile.experience.as_str()),
        format!("- Training days: {} per week", profile.workout_days),
        format!(
            "- Session duration: {} minutes (strict limit)",
            profile.workout_duration
        ),
        format!("- Equipment: {}", profile.equipment.as_str().replace('_', " ")),
    ];
    if let Some(injuries) = &profile.injuries {
        client.push(format!("- Injuries/limitations: {injuries}"));
    }
    if !profile.dietary_restrictions.is_empty() {
        client.push(format!(
            "- Dietary restrictions: {}",
            profile.dietary_restrictions.join(", ")
        ));
    }

    let mut prompt = String::from(
        "You are an evidence-based strength coach and sports nutritionist. \
         Create a training program and meal plan for this client.\n\n**Client Profile:**\n",
    );
    prompt.push_str(&client.join("\n"));

    prompt.push_str(&format!(
        "\n\n**Calculated Targets:**\n\
         - BMR: {bmr:.0} kcal | TDEE: {tdee:.0} kcal\n\
         - Target: {cal:.0} kcal\n\
         - Protein: {protein:.0}g ({per_kg}g/kg)\n\n\
         {protocol}\n\n\
         **Exercise Count:**\n{guidelines}\n\n",
        bmr = targets.bmr,
        tdee = targets.tdee,
        cal = targets.calories,
        protein = targets.protein_g,
        per_kg = targets.protein_per_kg,
        protocol = goal_protocol(profile.goal),
        guidelines = exercise_guidelines(profile.goal, profile.workout_duration),
    ));

    prompt.push_str(&format!(
        r#"Return ONLY valid JSON in this shape:

{{
  "summary": "2-3 sentence overview for a {goal} goal",
  "calories": {cal:.0},
  "protein": {protein:.0},
  "carbs": <grams>,
  "fat": <grams>,
  "durationWeeks": 4,
  "workoutPlan": {{
    "name": "Program name",
    "schedule": [
      {{"day": "Monday", "workout": {{"name": "Workout name", "exercises": [
        {{"name": "Exercise", "sets": 4, "reps": "8-12", "rest": "90s", "notes": "form cue"}}
      ]}}}},
      {{"day": "Tuesday", "workout": "Rest"}}
    ]
  }},
  "mealPlan": {{
    "meals": [
      {{"name": "Breakfast", "foods": [
        {{"name": "Food", "portion": "amount", "calories": 300, "protein": 25}}
      ]}}
    ]
  }}
}}

Requirements:
- All 7 days ({days} training days, the rest marked "Rest")
- Each workout fits in {duration} minutes including rest periods
- Macros add up to the calorie target (protein 4 kcal/g, carbs 4 kcal/g, fat 9 kcal/g)"#,
        cal = targets.calories,
        protein = targets.protein_g,
        days = profile.workout_days,
        duration = profile.workout_duration,
    ));

    prompt
}

// --- Response decoding ---

/// First balanced `{...}` object in `text`, skipping braces inside string
/// literals.
#[must_use]
pub fn extract_json_object(text: &str) -> Option<&str> {
    text.match_indices('{')
        .find_map(|(start, _)| balanced_end(&text[start..]).map(|end| &text[start..start + end]))
}

fn balanced_end(s: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in s.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn lenient_u32<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    lenient_opt_u32(deserializer)?
        .ok_or_else(|| serde::de::Error::custom("expected a number, found null"))
}

fn lenient_opt_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Int(u64),
        Float(f64),
        Text(String),
    }

    let value = match Option::<Number>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(Number::Int(i)) => return u32::try_from(i).map(Some).map_err(Error::custom),
        Some(Number::Float(f)) => f,
        Some(Number::Text(s)) => {
            let digits = s.trim().trim_end_matches(|c: char| c.is_alphabetic()).trim();
            digits
                .parse::<f64>()
                .map_err(|_| Error::custom(format!("invalid number: {s:?}")))?
        }
    };
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        #[allow(clippy::cast_sign_loss)]
        let rounded = value.round() as u32;
        Ok(Some(rounded))
    } else {
        Err(Error::custom(format!("invalid number: {value}")))
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::Text(s) => s,
        StringOrNumber::Int(i) => i.to_string(),
        StringOrNumber::Float(f) => f.to_string(),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedProgram {
    #[serde(default)]
    pub summary: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub calories: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub protein: u32,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub carbs: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub fat: Option<u32>,
    #[serde(default, deserialize_with = "lenient_opt_u32")]
    pub duration_weeks: Option<u32>,
    pub workout_plan: WorkoutPlan,
    #[serde(default)]
    pub meal_plan: GeneratedMealPlan,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub name: String,
    pub schedule: Vec<ScheduleDay>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDay {
    pub day: String,
    pub workout: DayWorkout,
}

/// A training session, or a bare label such as `"Rest"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DayWorkout {
    Session(PlannedWorkout),
    Rest(String),
}

impl DayWorkout {
    #[must_use]
    pub fn is_rest(&self) -> bool {
        matches!(self, Self::Rest(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedWorkout {
    pub name: String,
    #[serde(default)]
    pub exercises: Vec<PlannedExercise>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub name: String,
    #[serde(deserialize_with = "lenient_u32")]
    pub sets: u32,
    #[serde(deserialize_with = "lenient_string")]
    pub reps: String,
    #[serde(default)]
    pub rest: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedMealPlan {
    #[serde(default)]
    pub meals: Vec<PlannedMeal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedMeal {
    pub name: String,
    #[serde(default)]
    pub foods: Vec<PlannedFood>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlannedFood {
    pub name: String,
    #[serde(default)]
    pub portion: String,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub calories: u32,
    #[serde(default, deserialize_with = "lenient_u32")]
    pub protein: u32,
}

/// Decode the program object embedded in a model reply.
pub fn parse_generated_program(text: &str) -> Result<GeneratedProgram> {
    let json = extract_json_object(text).ok_or(FormaError::NoJsonObject)?;
    debug!("decoding {} bytes of program JSON", json.len());
    let program = serde_json::from_str(json).map_err(FormaError::MalformedProgram)?;
    Ok(program)
}

impl GeneratedProgram {
    /// Carbs and fat as returned, or derived from calories and protein.
    #[must_use]
    pub fn carbs_and_fat(&self) -> (u32, u32) {
        let (carbs, fat) =
            nutrition::split_remaining(f64::from(self.calories), f64::from(self.protein));
        #[allow(clippy::cast_sign_loss)]
        let derived = (carbs as u32, fat as u32);
        (
            self.carbs.unwrap_or(derived.0),
            self.fat.unwrap_or(derived.1),
        )
    }

    pub fn to_new_program(&self) -> Result<NewProgram> {
        let summary = Some(self.summary.trim().to_string()).filter(|s| !s.is_empty());
        Ok(NewProgram {
            name: self.workout_plan.name.clone(),
            summary,
            schedule: serde_json::to_value(&self.workout_plan.schedule)?,
            duration_weeks: self
                .duration_weeks
                .filter(|w| *w > 0)
                .unwrap_or(DEFAULT_DURATION_WEEKS),
            active: true,
        })
    }

    pub fn to_new_meal_plan(&self) -> Result<NewMealPlan> {
        let (carbs, fat) = self.carbs_and_fat();
        Ok(NewMealPlan {
            name: format!("{} Nutrition", self.workout_plan.name),
            target_calories: self.calories,
            target_protein: self.protein,
            target_carbs: carbs,
            target_fat: fat,
            meals: serde_json::to_value(&self.meal_plan.meals)?,
            active: true,
        })
    }

    #[must_use]
    pub fn training_days(&self) -> usize {
        self.workout_plan
            .schedule
            .iter()
            .filter(|d| !d.workout.is_rest())
            .count()
    }
}
