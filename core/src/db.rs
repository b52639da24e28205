use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, Utc};
use log::{debug, warn};
use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::error::FormaError;
use crate::exercises::CachedExercises;
use crate::metrics;
use crate::models::{
    ExerciseSession, MealPlan, NewMealPlan, NewProgram, NewTemplate, NewWorkout, NewWorkoutSet,
    PersonalRecord, Profile, ProfileUpdate, Program, Session, SetPerformance, SyncStatus,
    Template, TemplateExercise, UpdateWorkout, UpdateWorkoutSet, Workout, WorkoutSet,
    WorkoutStats, validate_profile_update, validate_template,
};

/// Fixed names of the serialized collections.
pub mod keys {
    pub const WORKOUTS: &str = "forma_workouts";
    pub const WORKOUT_SETS: &str = "forma_workout_sets";
    pub const TEMPLATES: &str = "forma_templates";
    pub const PROGRAMS: &str = "forma_programs";
    pub const MEAL_PLANS: &str = "forma_meal_plans";
    pub const PROFILE: &str = "forma_profile";
    pub const EXERCISES_CACHE: &str = "forma_exercises_cache";
    pub const SESSION: &str = "forma_session";

    pub const ALL: &[&str] = &[
        WORKOUTS,
        WORKOUT_SETS,
        TEMPLATES,
        PROGRAMS,
        MEAL_PLANS,
        PROFILE,
        EXERCISES_CACHE,
        SESSION,
    ];
}

const CORRUPT_SUFFIX: &str = ".corrupt";

/// Key-value store of JSON blobs. Every mutation rewrites the whole blob.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS kv_store (
                    key TEXT PRIMARY KEY NOT NULL,
                    value TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    /// Run `f` inside one SQLite transaction. `f` must not open another.
    pub fn in_transaction<T>(&self, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let tx = self.conn.unchecked_transaction()?;
        let value = f(self)?;
        tx.commit()?;
        Ok(value)
    }

    // --- Raw blob access ---

    pub fn read_raw(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        let mut rows = stmt.query(params![key])?;
        if let Some(row) = rows.next()? {
            Ok(Some(row.get(0)?))
        } else {
            Ok(None)
        }
    }

    pub fn write_raw(&self, key: &str, value: &str) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now],
            )
            .with_context(|| format!("Failed to write '{key}'"))?;
        Ok(())
    }

    pub fn remove_key(&self, key: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(rows > 0)
    }

    // --- Typed blob access ---

    /// Missing key reads as empty; an undecodable blob is `FormaError::CorruptData`.
    pub fn get_collection<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        Ok(self.get_object(key)?.unwrap_or_default())
    }

    pub fn put_collection<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = serde_json::to_string(items)?;
        self.write_raw(key, &raw)
    }

    pub fn get_object<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.read_raw(key)? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(source) => {
                warn!("stored blob '{key}' failed to decode: {source}");
                Err(FormaError::CorruptData {
                    key: key.to_string(),
                    source,
                }
                .into())
            }
        }
    }

    pub fn put_object<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.write_raw(key, &raw)
    }

    /// Move a blob aside to `<key>.corrupt` so the key reads as empty again.
    pub fn quarantine_key(&self, key: &str) -> Result<bool> {
        let Some(raw) = self.read_raw(key)? else {
            return Ok(false);
        };
        let tx = self.conn.unchecked_transaction()?;
        self.write_raw(&format!("{key}{CORRUPT_SUFFIX}"), &raw)?;
        self.remove_key(key)?;
        tx.commit()?;
        warn!("moved '{key}' aside to '{key}{CORRUPT_SUFFIX}'");
        Ok(true)
    }

    pub fn clear_all_data(&self) -> Result<()> {
        self.conn.execute("DELETE FROM kv_store", [])?;
        debug!("cleared all local data");
        Ok(())
    }

    // --- Workouts ---

    pub fn create_workout(&self, new: &NewWorkout) -> Result<Workout> {
        let now = Utc::now();
        let workout = Workout {
            id: Uuid::new_v4().to_string(),
            name: new
                .name
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .unwrap_or("Workout")
                .to_string(),
            notes: new.notes.clone(),
            template_id: new.template_id.clone(),
            program_id: new.program_id.clone(),
            duration_minutes: new.duration_minutes,
            started_at: new.started_at.unwrap_or(now),
            completed_at: new.completed_at,
            sync_status: SyncStatus::Pending,
            created_at: now,
        };

        let mut workouts: Vec<Workout> = self.get_collection(keys::WORKOUTS)?;
        workouts.push(workout.clone());
        self.put_collection(keys::WORKOUTS, &workouts)?;
        Ok(workout)
    }

    /// Newest first by start time.
    pub fn get_workouts(&self) -> Result<Vec<Workout>> {
        let mut workouts: Vec<Workout> = self.get_collection(keys::WORKOUTS)?;
        workouts.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(workouts)
    }

    pub fn get_workout(&self, id: &str) -> Result<Option<Workout>> {
        let workouts: Vec<Workout> = self.get_collection(keys::WORKOUTS)?;
        Ok(workouts.into_iter().find(|w| w.id == id))
    }

    /// Any edit puts the workout back to pending.
    pub fn update_workout(&self, id: &str, update: &UpdateWorkout) -> Result<Option<Workout>> {
        let mut workouts: Vec<Workout> = self.get_collection(keys::WORKOUTS)?;
        let Some(workout) = workouts.iter_mut().find(|w| w.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                bail!("Workout name must not be empty");
            }
            workout.name = name.trim().to_string();
        }
        if let Some(notes) = &update.notes {
            workout.notes.clone_from(notes);
        }
        if let Some(duration) = update.duration_minutes {
            workout.duration_minutes = duration;
        }
        if let Some(completed_at) = update.completed_at {
            workout.completed_at = completed_at;
        }
        workout.sync_status = SyncStatus::Pending;

        let updated = workout.clone();
        self.put_collection(keys::WORKOUTS, &workouts)?;
        Ok(Some(updated))
    }

    pub fn mark_workout_synced(&self, id: &str) -> Result<bool> {
        self.mark_synced(id, &[])
    }

    /// Flip a workout and the given sets to synced in one transaction.
    pub fn mark_synced(&self, workout_id: &str, set_ids: &[String]) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let mut workouts: Vec<Workout> = self.get_collection(keys::WORKOUTS)?;
        let Some(workout) = workouts.iter_mut().find(|w| w.id == workout_id) else {
            return Ok(false);
        };
        workout.sync_status = SyncStatus::Synced;
        self.put_collection(keys::WORKOUTS, &workouts)?;

        if !set_ids.is_empty() {
            let mut sets: Vec<WorkoutSet> = self.get_collection(keys::WORKOUT_SETS)?;
            for set in sets.iter_mut().filter(|s| set_ids.contains(&s.id)) {
                set.sync_status = SyncStatus::Synced;
            }
            self.put_collection(keys::WORKOUT_SETS, &sets)?;
        }

        tx.commit()?;
        Ok(true)
    }

    /// Removes the workout and sweeps its sets.
    pub fn delete_workout(&self, id: &str) -> Result<bool> {
        let tx = self.conn.unchecked_transaction()?;

        let workouts: Vec<Workout> = self.get_collection(keys::WORKOUTS)?;
        let before = workouts.len();
        let workouts: Vec<Workout> = workouts.into_iter().filter(|w| w.id != id).collect();
        let existed = workouts.len() != before;
        self.put_collection(keys::WORKOUTS, &workouts)?;

        let sets: Vec<WorkoutSet> = self.get_collection(keys::WORKOUT_SETS)?;
        let sets: Vec<WorkoutSet> = sets.into_iter().filter(|s| s.workout_id != id).collect();
        self.put_collection(keys::WORKOUT_SETS, &sets)?;

        tx.commit()?;
        Ok(existed)
    }

    // --- Workout sets ---

    pub fn add_workout_set(&self, new: &NewWorkoutSet) -> Result<WorkoutSet> {
        if new.exercise_name.trim().is_empty() {
            bail!("Exercise name must not be empty");
        }
        if new.set_number == 0 {
            bail!("Set numbers start at 1");
        }
        if self.get_workout(&new.workout_id)?.is_none() {
            return Err(FormaError::not_found("workout", &new.workout_id).into());
        }

        let set = WorkoutSet {
            id: Uuid::new_v4().to_string(),
            workout_id: new.workout_id.clone(),
            exercise_name: new.exercise_name.trim().to_string(),
            set_number: new.set_number,
            reps: new.reps,
            weight_kg: new.weight_kg,
            rpe: new.rpe,
            notes: new.notes.clone(),
            completed: new.completed,
            sync_status: SyncStatus::Pending,
            created_at: Utc::now(),
        };

        let mut sets: Vec<WorkoutSet> = self.get_collection(keys::WORKOUT_SETS)?;
        sets.push(set.clone());
        self.put_collection(keys::WORKOUT_SETS, &sets)?;
        Ok(set)
    }

    /// Sets of one workout in set-number order.
    pub fn get_workout_sets(&self, workout_id: &str) -> Result<Vec<WorkoutSet>> {
        let sets: Vec<WorkoutSet> = self.get_collection(keys::WORKOUT_SETS)?;
        let mut sets: Vec<WorkoutSet> = sets
            .into_iter()
            .filter(|s| s.workout_id == workout_id)
            .collect();
        sets.sort_by_key(|s| s.set_number);
        Ok(sets)
    }

    pub fn get_all_workout_sets(&self) -> Result<Vec<WorkoutSet>> {
        self.get_collection(keys::WORKOUT_SETS)
    }

    pub fn update_workout_set(
        &self,
        id: &str,
        update: &UpdateWorkoutSet,
    ) -> Result<Option<WorkoutSet>> {
        let mut sets: Vec<WorkoutSet> = self.get_collection(keys::WORKOUT_SETS)?;
        let Some(set) = sets.iter_mut().find(|s| s.id == id) else {
            return Ok(None);
        };

        if let Some(name) = &update.exercise_name {
            set.exercise_name = name.trim().to_string();
        }
        if let Some(reps) = update.reps {
            set.reps = Some(reps);
        }
        if let Some(weight) = update.weight_kg {
            set.weight_kg = Some(weight);
        }
        if let Some(rpe) = update.rpe {
            set.rpe = Some(rpe);
        }
        if let Some(notes) = &update.notes {
            set.notes = Some(notes.clone());
        }
        if let Some(completed) = update.completed {
            set.completed = completed;
        }
        set.sync_status = SyncStatus::Pending;

        let updated = set.clone();
        self.put_collection(keys::WORKOUT_SETS, &sets)?;
        Ok(Some(updated))
    }

    pub fn delete_workout_set(&self, id: &str) -> Result<bool> {
        let sets: Vec<WorkoutSet> = self.get_collection(keys::WORKOUT_SETS)?;
        let before = sets.len();
        let sets: Vec<WorkoutSet> = sets.into_iter().filter(|s| s.id != id).collect();
        let existed = sets.len() != before;
        self.put_collection(keys::WORKOUT_SETS, &sets)?;
        Ok(existed)
    }

    // --- Templates ---

    pub fn create_template(&self, new: &NewTemplate) -> Result<Template> {
        validate_template(new)?;

        let template = Template {
            id: Uuid::new_v4().to_string(),
            name: new.name.trim().to_string(),
            exercises: new
                .exercises
                .iter()
                .map(|ex| TemplateExercise {
                    id: Uuid::new_v4().to_string(),
                    name: ex.name.trim().to_string(),
                    target_sets: ex.target_sets,
                    target_reps: ex.target_reps.trim().to_string(),
                })
                .collect(),
            created_at: Utc::now(),
        };

        let mut templates: Vec<Template> = self.get_collection(keys::TEMPLATES)?;
        templates.push(template.clone());
        self.put_collection(keys::TEMPLATES, &templates)?;
        Ok(template)
    }

    pub fn get_templates(&self) -> Result<Vec<Template>> {
        self.get_collection(keys::TEMPLATES)
    }

    pub fn get_template(&self, id: &str) -> Result<Option<Template>> {
        let templates: Vec<Template> = self.get_collection(keys::TEMPLATES)?;
        Ok(templates.into_iter().find(|t| t.id == id))
    }

    /// Match by id first, then by case-insensitive name.
    pub fn find_template(&self, id_or_name: &str) -> Result<Option<Template>> {
        let templates: Vec<Template> = self.get_collection(keys::TEMPLATES)?;
        let needle = id_or_name.trim();
        if let Some(t) = templates.iter().find(|t| t.id == needle) {
            return Ok(Some(t.clone()));
        }
        Ok(templates
            .into_iter()
            .find(|t| t.name.eq_ignore_ascii_case(needle)))
    }

    /// Workouts keep their template reference after the template is gone.
    pub fn delete_template(&self, id: &str) -> Result<bool> {
        let templates: Vec<Template> = self.get_collection(keys::TEMPLATES)?;
        let before = templates.len();
        let templates: Vec<Template> = templates.into_iter().filter(|t| t.id != id).collect();
        let existed = templates.len() != before;
        self.put_collection(keys::TEMPLATES, &templates)?;
        Ok(existed)
    }

    // --- Profile ---

    pub fn get_profile(&self) -> Result<Profile> {
        Ok(self.get_object(keys::PROFILE)?.unwrap_or_default())
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        validate_profile_update(update)?;
        let mut profile = self.get_profile()?;
        profile.apply(update);
        self.put_object(keys::PROFILE, &profile)?;
        Ok(profile)
    }

    // --- Programs ---

    pub fn get_programs(&self) -> Result<Vec<Program>> {
        self.get_collection(keys::PROGRAMS)
    }

    pub fn get_active_program(&self) -> Result<Option<Program>> {
        let programs: Vec<Program> = self.get_collection(keys::PROGRAMS)?;
        Ok(programs.into_iter().find(|p| p.active))
    }

    /// An active program deactivates every other one in the same write.
    pub fn save_program(&self, new: &NewProgram) -> Result<Program> {
        let program = Program {
            id: Uuid::new_v4().to_string(),
            name: new.name.clone(),
            summary: new.summary.clone(),
            schedule: new.schedule.clone(),
            duration_weeks: new.duration_weeks,
            active: new.active,
            created_at: Utc::now(),
        };

        let mut programs: Vec<Program> = self.get_collection(keys::PROGRAMS)?;
        if program.active {
            for p in &mut programs {
                p.active = false;
            }
        }
        programs.push(program.clone());
        self.put_collection(keys::PROGRAMS, &programs)?;
        Ok(program)
    }

    pub fn activate_program(&self, id: &str) -> Result<Program> {
        let mut programs: Vec<Program> = self.get_collection(keys::PROGRAMS)?;
        if !programs.iter().any(|p| p.id == id) {
            return Err(FormaError::not_found("program", id).into());
        }
        for p in &mut programs {
            p.active = p.id == id;
        }
        self.put_collection(keys::PROGRAMS, &programs)?;
        programs
            .into_iter()
            .find(|p| p.id == id)
            .context("Program not found")
    }

    // --- Meal plans ---

    pub fn get_meal_plans(&self) -> Result<Vec<MealPlan>> {
        self.get_collection(keys::MEAL_PLANS)
    }

    pub fn get_active_meal_plan(&self) -> Result<Option<MealPlan>> {
        let plans: Vec<MealPlan> = self.get_collection(keys::MEAL_PLANS)?;
        Ok(plans.into_iter().find(|p| p.active))
    }

    pub fn save_meal_plan(&self, new: &NewMealPlan) -> Result<MealPlan> {
        let plan = MealPlan {
            id: Uuid::new_v4().to_string(),
            name: new.name.clone(),
            target_calories: new.target_calories,
            target_protein: new.target_protein,
            target_carbs: new.target_carbs,
            target_fat: new.target_fat,
            meals: new.meals.clone(),
            active: new.active,
            created_at: Utc::now(),
        };

        let mut plans: Vec<MealPlan> = self.get_collection(keys::MEAL_PLANS)?;
        if plan.active {
            for p in &mut plans {
                p.active = false;
            }
        }
        plans.push(plan.clone());
        self.put_collection(keys::MEAL_PLANS, &plans)?;
        Ok(plan)
    }

    pub fn activate_meal_plan(&self, id: &str) -> Result<MealPlan> {
        let mut plans: Vec<MealPlan> = self.get_collection(keys::MEAL_PLANS)?;
        if !plans.iter().any(|p| p.id == id) {
            return Err(FormaError::not_found("meal plan", id).into());
        }
        for p in &mut plans {
            p.active = p.id == id;
        }
        self.put_collection(keys::MEAL_PLANS, &plans)?;
        plans
            .into_iter()
            .find(|p| p.id == id)
            .context("Meal plan not found")
    }

    // --- Stats / progress ---

    pub fn get_workout_stats(&self, now: DateTime<Utc>) -> Result<WorkoutStats> {
        let workouts = self.get_workouts()?;
        let total_sets = self.get_all_workout_sets()?.len();
        let week_ago = now - Duration::days(7);

        let completed: Vec<Workout> = workouts.into_iter().filter(Workout::is_completed).collect();
        let this_week = completed
            .iter()
            .filter(|w| w.completed_at.is_some_and(|t| t > week_ago))
            .count();

        Ok(WorkoutStats {
            total_workouts: completed.len(),
            this_week,
            total_sets,
            last_workout: completed.into_iter().next(),
        })
    }

    /// Completed workouts containing `exercise`, newest first. Only sets with
    /// both weight and reps count.
    pub fn get_exercise_history(&self, exercise: &str) -> Result<Vec<ExerciseSession>> {
        let needle = exercise.trim().to_lowercase();
        let workouts = self.get_workouts()?;
        let sets = self.get_all_workout_sets()?;

        let mut by_workout: HashMap<&str, Vec<&WorkoutSet>> = HashMap::new();
        for set in &sets {
            if set.exercise_name.trim().to_lowercase() == needle {
                by_workout.entry(set.workout_id.as_str()).or_default().push(set);
            }
        }

        let mut history: Vec<ExerciseSession> = workouts
            .iter()
            .filter_map(|w| {
                let date = w.completed_at?;
                let mut matched = by_workout.get(w.id.as_str())?.clone();
                matched.sort_by_key(|s| s.set_number);
                let performed: Vec<SetPerformance> = matched
                    .iter()
                    .filter_map(|s| match (s.weight_kg, s.reps) {
                        (Some(weight_kg), Some(reps)) if reps > 0 => {
                            Some(SetPerformance { weight_kg, reps })
                        }
                        _ => None,
                    })
                    .collect();
                if performed.is_empty() {
                    return None;
                }
                Some(ExerciseSession {
                    workout_id: w.id.clone(),
                    workout_name: w.name.clone(),
                    date,
                    sets: performed,
                })
            })
            .collect();

        history.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(history)
    }

    pub fn get_exercise_pr(&self, exercise: &str) -> Result<Option<PersonalRecord>> {
        let history = self.get_exercise_history(exercise)?;
        // oldest first so the earliest lift keeps a tie
        let flat: Vec<(f64, u32, DateTime<Utc>)> = history
            .iter()
            .rev()
            .flat_map(|h| h.sets.iter().map(move |s| (s.weight_kg, s.reps, h.date)))
            .collect();
        Ok(metrics::personal_record(&flat))
    }

    // --- Exercise catalog cache ---

    pub fn get_exercise_cache(&self) -> Result<Option<CachedExercises>> {
        self.get_object(keys::EXERCISES_CACHE)
    }

    pub fn put_exercise_cache(&self, cache: &CachedExercises) -> Result<()> {
        self.put_object(keys::EXERCISES_CACHE, cache)
    }

    // --- Auth session ---

    pub fn get_session(&self) -> Result<Option<Session>> {
        self.get_object(keys::SESSION)
    }

    pub fn save_session(&self, session: &Session) -> Result<()> {
        self.put_object(keys::SESSION, session)
    }

    pub fn clear_session(&self) -> Result<bool> {
        self.remove_key(keys::SESSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Goal, NewTemplateExercise};

    fn completed_workout(db: &Database, name: &str, days_ago: i64) -> Workout {
        let at = Utc::now() - Duration::days(days_ago);
        db.create_workout(&NewWorkout {
            name: Some(name.to_string()),
            started_at: Some(at - Duration::hours(1)),
            completed_at: Some(at),
            ..NewWorkout::default()
        })
        .unwrap()
    }

    fn add_set(db: &Database, workout_id: &str, exercise: &str, n: u32, weight: f64, reps: u32) {
        db.add_workout_set(&NewWorkoutSet {
            workout_id: workout_id.to_string(),
            exercise_name: exercise.to_string(),
            set_number: n,
            reps: Some(reps),
            weight_kg: Some(weight),
            rpe: None,
            notes: None,
            completed: true,
        })
        .unwrap();
    }

    fn sample_program(name: &str, active: bool) -> NewProgram {
        NewProgram {
            name: name.to_string(),
            summary: Some("three day split".to_string()),
            schedule: serde_json::json!([{"day": "Monday", "workout": "Rest"}]),
            duration_weeks: 4,
            active,
        }
    }

    #[test]
    fn test_missing_collection_is_empty() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_workouts().unwrap().is_empty());
        assert!(db.get_templates().unwrap().is_empty());
        assert!(db.get_session().unwrap().is_none());
        assert_eq!(db.get_profile().unwrap(), Profile::default());
    }

    #[test]
    fn test_corrupt_collection_is_an_error() {
        let db = Database::open_in_memory().unwrap();
        db.write_raw(keys::WORKOUTS, "{not json").unwrap();

        let err = db.get_workouts().unwrap_err();
        match err.downcast_ref::<FormaError>() {
            Some(FormaError::CorruptData { key, .. }) => assert_eq!(key, keys::WORKOUTS),
            other => panic!("expected CorruptData, got {other:?}"),
        }
    }

    #[test]
    fn test_quarantine_recovers_corrupt_key() {
        let db = Database::open_in_memory().unwrap();
        db.write_raw(keys::WORKOUTS, "[{\"id\": 1").unwrap();

        assert!(db.quarantine_key(keys::WORKOUTS).unwrap());
        assert!(db.get_workouts().unwrap().is_empty());
        assert_eq!(
            db.read_raw("forma_workouts.corrupt").unwrap().as_deref(),
            Some("[{\"id\": 1")
        );
        assert!(!db.quarantine_key(keys::WORKOUTS).unwrap());
    }

    #[test]
    fn test_create_and_read_workout_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_workout(&NewWorkout {
                name: Some("Leg Day".to_string()),
                notes: Some("felt strong".to_string()),
                duration_minutes: Some(55),
                ..NewWorkout::default()
            })
            .unwrap();

        let read = db.get_workout(&created.id).unwrap().unwrap();
        assert_eq!(read, created);
        assert_eq!(read.sync_status, SyncStatus::Pending);
        assert_eq!(read.name, "Leg Day");
    }

    #[test]
    fn test_create_workout_default_name() {
        let db = Database::open_in_memory().unwrap();
        let w = db
            .create_workout(&NewWorkout {
                name: Some("  ".to_string()),
                ..NewWorkout::default()
            })
            .unwrap();
        assert_eq!(w.name, "Workout");
    }

    #[test]
    fn test_workouts_sorted_newest_first() {
        let db = Database::open_in_memory().unwrap();
        completed_workout(&db, "old", 5);
        completed_workout(&db, "new", 0);
        completed_workout(&db, "mid", 2);

        let names: Vec<String> = db.get_workouts().unwrap().into_iter().map(|w| w.name).collect();
        assert_eq!(names, vec!["new", "mid", "old"]);
    }

    #[test]
    fn test_update_workout_forces_pending() {
        let db = Database::open_in_memory().unwrap();
        let w = completed_workout(&db, "Push", 0);
        assert!(db.mark_workout_synced(&w.id).unwrap());
        assert_eq!(
            db.get_workout(&w.id).unwrap().unwrap().sync_status,
            SyncStatus::Synced
        );

        let updated = db
            .update_workout(
                &w.id,
                &UpdateWorkout {
                    notes: Some(Some("added later".to_string())),
                    ..UpdateWorkout::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.sync_status, SyncStatus::Pending);
        assert_eq!(updated.notes.as_deref(), Some("added later"));
    }

    #[test]
    fn test_update_missing_workout_returns_none() {
        let db = Database::open_in_memory().unwrap();
        let result = db
            .update_workout("nope", &UpdateWorkout::default())
            .unwrap();
        assert!(result.is_none());
        assert!(!db.mark_workout_synced("nope").unwrap());
    }

    #[test]
    fn test_delete_workout_sweeps_sets() {
        let db = Database::open_in_memory().unwrap();
        let keep = completed_workout(&db, "keep", 1);
        let doomed = completed_workout(&db, "doomed", 0);
        add_set(&db, &keep.id, "Squat", 1, 100.0, 5);
        add_set(&db, &doomed.id, "Bench Press", 1, 80.0, 8);
        add_set(&db, &doomed.id, "Bench Press", 2, 80.0, 7);

        assert!(db.delete_workout(&doomed.id).unwrap());
        assert!(db.get_workout(&doomed.id).unwrap().is_none());

        let remaining = db.get_all_workout_sets().unwrap();
        assert_eq!(remaining.len(), 1);
        assert!(remaining.iter().all(|s| s.workout_id != doomed.id));

        assert!(!db.delete_workout(&doomed.id).unwrap());
    }

    #[test]
    fn test_sets_sorted_by_number() {
        let db = Database::open_in_memory().unwrap();
        let w = completed_workout(&db, "Pull", 0);
        add_set(&db, &w.id, "Row", 3, 60.0, 10);
        add_set(&db, &w.id, "Row", 1, 60.0, 12);
        add_set(&db, &w.id, "Row", 2, 60.0, 11);

        let numbers: Vec<u32> = db
            .get_workout_sets(&w.id)
            .unwrap()
            .iter()
            .map(|s| s.set_number)
            .collect();
        assert_eq!(numbers, vec![1, 2, 3]);
    }

    #[test]
    fn test_add_set_requires_workout() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .add_workout_set(&NewWorkoutSet {
                workout_id: "missing".to_string(),
                exercise_name: "Squat".to_string(),
                set_number: 1,
                reps: Some(5),
                weight_kg: Some(100.0),
                rpe: None,
                notes: None,
                completed: true,
            })
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormaError>(),
            Some(FormaError::NotFound { .. })
        ));
    }

    #[test]
    fn test_update_and_delete_set() {
        let db = Database::open_in_memory().unwrap();
        let w = completed_workout(&db, "Arms", 0);
        add_set(&db, &w.id, "Curl", 1, 15.0, 10);
        let set = db.get_workout_sets(&w.id).unwrap().remove(0);

        let updated = db
            .update_workout_set(
                &set.id,
                &UpdateWorkoutSet {
                    weight_kg: Some(17.5),
                    ..UpdateWorkoutSet::default()
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.weight_kg, Some(17.5));
        assert_eq!(updated.reps, Some(10));
        assert_eq!(updated.sync_status, SyncStatus::Pending);

        assert!(db.delete_workout_set(&set.id).unwrap());
        assert!(db.get_workout_sets(&w.id).unwrap().is_empty());
        assert!(!db.delete_workout_set(&set.id).unwrap());
    }

    #[test]
    fn test_mark_synced_flips_workout_and_sets() {
        let db = Database::open_in_memory().unwrap();
        let w = completed_workout(&db, "Full Body", 0);
        add_set(&db, &w.id, "Deadlift", 1, 140.0, 5);
        let ids: Vec<String> = db
            .get_workout_sets(&w.id)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();

        assert!(db.mark_synced(&w.id, &ids).unwrap());
        assert_eq!(
            db.get_workout(&w.id).unwrap().unwrap().sync_status,
            SyncStatus::Synced
        );
        assert!(
            db.get_workout_sets(&w.id)
                .unwrap()
                .iter()
                .all(|s| s.sync_status == SyncStatus::Synced)
        );
    }

    #[test]
    fn test_template_create_find_delete() {
        let db = Database::open_in_memory().unwrap();
        let t = db
            .create_template(&NewTemplate {
                name: " Upper A ".to_string(),
                exercises: vec![
                    NewTemplateExercise {
                        name: "Bench Press".to_string(),
                        target_sets: 4,
                        target_reps: "6-8".to_string(),
                    },
                    NewTemplateExercise {
                        name: "Barbell Row".to_string(),
                        target_sets: 3,
                        target_reps: "8-10".to_string(),
                    },
                ],
            })
            .unwrap();
        assert_eq!(t.name, "Upper A");
        assert_eq!(t.exercises.len(), 2);
        assert_ne!(t.exercises[0].id, t.exercises[1].id);

        assert_eq!(db.find_template("upper a").unwrap().unwrap().id, t.id);
        assert_eq!(db.find_template(&t.id).unwrap().unwrap().id, t.id);
        assert!(db.find_template("lower").unwrap().is_none());

        assert!(db.delete_template(&t.id).unwrap());
        assert!(db.get_template(&t.id).unwrap().is_none());
    }

    #[test]
    fn test_template_validation_rejected() {
        let db = Database::open_in_memory().unwrap();
        let result = db.create_template(&NewTemplate {
            name: "Empty".to_string(),
            exercises: vec![],
        });
        assert!(result.is_err());
        assert!(db.get_templates().unwrap().is_empty());
    }

    #[test]
    fn test_profile_update_merges() {
        let db = Database::open_in_memory().unwrap();
        db.update_profile(&ProfileUpdate {
            age: Some(28),
            weight_kg: Some(72.0),
            ..ProfileUpdate::default()
        })
        .unwrap();
        let profile = db
            .update_profile(&ProfileUpdate {
                goal: Some(Goal::BuildMuscle),
                ..ProfileUpdate::default()
            })
            .unwrap();

        assert_eq!(profile.age, Some(28));
        assert_eq!(profile.weight_kg, Some(72.0));
        assert_eq!(profile.goal, Some(Goal::BuildMuscle));
        assert_eq!(db.get_profile().unwrap(), profile);
    }

    #[test]
    fn test_profile_update_validates() {
        let db = Database::open_in_memory().unwrap();
        let result = db.update_profile(&ProfileUpdate {
            workout_days: Some(0),
            ..ProfileUpdate::default()
        });
        assert!(result.is_err());
        assert_eq!(db.get_profile().unwrap(), Profile::default());
    }

    #[test]
    fn test_saving_active_program_deactivates_others() {
        let db = Database::open_in_memory().unwrap();
        let first = db.save_program(&sample_program("First", true)).unwrap();
        let inactive = db.save_program(&sample_program("Draft", false)).unwrap();
        assert_eq!(db.get_active_program().unwrap().unwrap().id, first.id);

        let second = db.save_program(&sample_program("Second", true)).unwrap();
        let programs = db.get_programs().unwrap();
        assert_eq!(programs.len(), 3);
        assert_eq!(programs.iter().filter(|p| p.active).count(), 1);
        assert_eq!(db.get_active_program().unwrap().unwrap().id, second.id);

        db.activate_program(&inactive.id).unwrap();
        let programs = db.get_programs().unwrap();
        assert_eq!(programs.iter().filter(|p| p.active).count(), 1);
        assert_eq!(db.get_active_program().unwrap().unwrap().id, inactive.id);
    }

    #[test]
    fn test_activate_missing_program() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.activate_program("nope").is_err());
        assert!(db.activate_meal_plan("nope").is_err());
    }

    #[test]
    fn test_single_active_meal_plan() {
        let db = Database::open_in_memory().unwrap();
        let plan = |name: &str| NewMealPlan {
            name: name.to_string(),
            target_calories: 2400,
            target_protein: 180,
            target_carbs: 250,
            target_fat: 70,
            meals: serde_json::json!([]),
            active: true,
        };
        db.save_meal_plan(&plan("A")).unwrap();
        let b = db.save_meal_plan(&plan("B")).unwrap();

        let plans = db.get_meal_plans().unwrap();
        assert_eq!(plans.iter().filter(|p| p.active).count(), 1);
        assert_eq!(db.get_active_meal_plan().unwrap().unwrap().id, b.id);
    }

    #[test]
    fn test_workout_stats() {
        let db = Database::open_in_memory().unwrap();
        let recent = completed_workout(&db, "recent", 1);
        completed_workout(&db, "older", 10);
        db.create_workout(&NewWorkout::default()).unwrap(); // not completed
        add_set(&db, &recent.id, "Squat", 1, 100.0, 5);
        add_set(&db, &recent.id, "Squat", 2, 100.0, 5);

        let stats = db.get_workout_stats(Utc::now()).unwrap();
        assert_eq!(stats.total_workouts, 2);
        assert_eq!(stats.this_week, 1);
        assert_eq!(stats.total_sets, 2);
        assert_eq!(stats.last_workout.unwrap().id, recent.id);
    }

    #[test]
    fn test_exercise_history_and_pr() {
        let db = Database::open_in_memory().unwrap();
        let older = completed_workout(&db, "A", 7);
        let newer = completed_workout(&db, "B", 1);
        add_set(&db, &older.id, "Bench Press", 1, 80.0, 10);
        add_set(&db, &newer.id, "bench press", 1, 100.0, 5);
        add_set(&db, &newer.id, "Bench Press", 2, 105.0, 2);
        add_set(&db, &newer.id, "Squat", 1, 140.0, 5);

        let history = db.get_exercise_history("Bench Press").unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].workout_id, newer.id);
        assert_eq!(history[0].sets.len(), 2);
        assert!((history[0].heaviest_weight() - 105.0).abs() < f64::EPSILON);

        // 80x10 -> 107, 100x5 -> 117, 105x2 -> 112
        let pr = db.get_exercise_pr("Bench Press").unwrap().unwrap();
        assert_eq!(pr.weight_kg, 100.0);
        assert_eq!(pr.reps, 5);
        assert_eq!(pr.estimated_one_rm, 117.0);

        assert!(db.get_exercise_pr("Overhead Press").unwrap().is_none());
    }

    #[test]
    fn test_history_skips_unfinished_workouts() {
        let db = Database::open_in_memory().unwrap();
        let open = db.create_workout(&NewWorkout::default()).unwrap();
        add_set(&db, &open.id, "Squat", 1, 100.0, 5);
        assert!(db.get_exercise_history("Squat").unwrap().is_empty());
    }

    #[test]
    fn test_session_save_and_clear() {
        let db = Database::open_in_memory().unwrap();
        let session = Session {
            user_id: "user-1".to_string(),
            email: Some("a@b.c".to_string()),
            access_token: "token".to_string(),
            refresh_token: None,
            expires_at: None,
        };
        db.save_session(&session).unwrap();
        assert_eq!(db.get_session().unwrap().unwrap(), session);
        assert!(db.clear_session().unwrap());
        assert!(db.get_session().unwrap().is_none());
    }

    #[test]
    fn test_clear_all_data() {
        let db = Database::open_in_memory().unwrap();
        completed_workout(&db, "w", 0);
        db.save_program(&sample_program("p", true)).unwrap();
        db.clear_all_data().unwrap();
        assert!(db.get_workouts().unwrap().is_empty());
        assert!(db.get_programs().unwrap().is_empty());
    }

    #[test]
    fn test_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("forma.db");
        let id = {
            let db = Database::open(&path).unwrap();
            completed_workout(&db, "persisted", 0).id
        };
        let db = Database::open(&path).unwrap();
        assert_eq!(db.get_workout(&id).unwrap().unwrap().name, "persisted");
    }
}
