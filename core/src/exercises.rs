use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Catalog entries older than this are refetched.
pub const CACHE_TTL_HOURS: i64 = 24;

const MUSCLE_GROUPS: &[&str] = &["chest", "back", "legs", "shoulders", "arms", "core"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    pub name: String,
    pub muscle_group: String,
    #[serde(default)]
    pub equipment: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedExercises {
    pub data: Vec<Exercise>,
    pub fetched_at: DateTime<Utc>,
}

impl CachedExercises {
    #[must_use]
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < Duration::hours(CACHE_TTL_HOURS)
    }
}

/// Remote exercise catalog.
#[allow(async_fn_in_trait)]
pub trait ExerciseSource {
    async fn fetch_exercises(&self) -> Result<Vec<Exercise>>;
}

#[must_use]
pub fn muscle_groups() -> &'static [&'static str] {
    MUSCLE_GROUPS
}

/// Built-in list used when neither the remote catalog nor a cache is available.
#[must_use]
pub fn fallback_exercises() -> Vec<Exercise> {
    const LIST: &[(&str, &str, &str)] = &[
        ("Barbell Squat", "legs", "barbell"),
        ("Bench Press", "chest", "barbell"),
        ("Deadlift", "back", "barbell"),
        ("Overhead Press", "shoulders", "barbell"),
        ("Barbell Row", "back", "barbell"),
        ("Pull-ups", "back", "bodyweight"),
        ("Push-ups", "chest", "bodyweight"),
        ("Dumbbell Curl", "arms", "dumbbell"),
        ("Tricep Pushdown", "arms", "cable"),
        ("Leg Press", "legs", "machine"),
        ("Lat Pulldown", "back", "cable"),
        ("Dumbbell Shoulder Press", "shoulders", "dumbbell"),
        ("Romanian Deadlift", "legs", "barbell"),
        ("Incline Bench Press", "chest", "barbell"),
        ("Cable Fly", "chest", "cable"),
        ("Leg Curl", "legs", "machine"),
        ("Leg Extension", "legs", "machine"),
        ("Face Pull", "shoulders", "cable"),
        ("Lateral Raise", "shoulders", "dumbbell"),
        ("Plank", "core", "bodyweight"),
        ("Lunges", "legs", "bodyweight"),
        ("Dips", "chest", "bodyweight"),
        ("Hip Thrust", "legs", "barbell"),
        ("Calf Raises", "legs", "machine"),
    ];

    LIST.iter()
        .enumerate()
        .map(|(i, (name, muscle, equipment))| Exercise {
            id: (i + 1).to_string(),
            name: (*name).to_string(),
            muscle_group: (*muscle).to_string(),
            equipment: Some((*equipment).to_string()),
            instructions: None,
        })
        .collect()
}

/// Narrow by muscle group (exact, case-insensitive) and name substring.
#[must_use]
pub fn filter_exercises<'a>(
    exercises: &'a [Exercise],
    muscle_group: Option<&str>,
    search: Option<&str>,
) -> Vec<&'a Exercise> {
    let search = search
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());
    exercises
        .iter()
        .filter(|e| muscle_group.is_none_or(|m| e.muscle_group.eq_ignore_ascii_case(m.trim())))
        .filter(|e| {
            search
                .as_ref()
                .is_none_or(|q| e.name.to_lowercase().contains(q.as_str()))
        })
        .collect()
}
