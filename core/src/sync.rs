//! One-way push of local data to the cloud backend.
//!
//! Every remote row carries the local id, and the backend upserts on
//! `(user_id, local_id)`, so a retried or repeated sync overwrites rows
//! instead of duplicating them.

use std::collections::HashSet;
use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::Database;
use crate::models::{
    Equipment, Experience, Gender, Goal, MealPlan, Profile, Program, Session, SyncStatus, Workout,
    WorkoutSet,
};

/// Primary key the backend assigned to a row. Accepts string or numeric ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RemoteId(pub String);

impl<'de> Deserialize<'de> for RemoteId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(i64),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Text(s) => RemoteId(s),
            Raw::Int(i) => RemoteId(i.to_string()),
        })
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// --- Remote rows ---

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteProfile {
    pub id: String,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub age: Option<u32>,
    pub gender: Option<Gender>,
    pub goal: Option<Goal>,
    pub experience: Option<Experience>,
    pub workout_days: Option<u32>,
    pub workout_duration: Option<u32>,
    pub equipment: Option<Equipment>,
    pub injuries: Option<String>,
    pub onboarding_complete: bool,
}

impl RemoteProfile {
    #[must_use]
    pub fn from_local(user_id: &str, p: &Profile) -> Self {
        Self {
            id: user_id.to_string(),
            height_cm: p.height_cm,
            weight_kg: p.weight_kg,
            age: p.age,
            gender: p.gender,
            goal: p.goal,
            experience: p.experience,
            workout_days: p.workout_days,
            workout_duration: p.workout_duration,
            equipment: p.equipment,
            injuries: p.injuries.clone(),
            onboarding_complete: p.onboarding_complete,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteWorkout {
    pub user_id: String,
    pub local_id: String,
    pub name: String,
    pub notes: Option<String>,
    pub duration_minutes: Option<u32>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub sync_status: SyncStatus,
}

impl RemoteWorkout {
    #[must_use]
    pub fn from_local(user_id: &str, w: &Workout) -> Self {
        Self {
            user_id: user_id.to_string(),
            local_id: w.id.clone(),
            name: w.name.clone(),
            notes: w.notes.clone(),
            duration_minutes: w.duration_minutes,
            started_at: w.started_at,
            completed_at: w.completed_at,
            sync_status: SyncStatus::Synced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteWorkoutSet {
    pub user_id: String,
    pub workout_id: RemoteId,
    pub local_id: String,
    pub exercise_name: String,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f64>,
    pub notes: Option<String>,
    pub sync_status: SyncStatus,
}

impl RemoteWorkoutSet {
    #[must_use]
    pub fn from_local(user_id: &str, workout_id: &RemoteId, s: &WorkoutSet) -> Self {
        Self {
            user_id: user_id.to_string(),
            workout_id: workout_id.clone(),
            local_id: s.id.clone(),
            exercise_name: s.exercise_name.clone(),
            set_number: s.set_number,
            reps: s.reps,
            weight_kg: s.weight_kg,
            rpe: s.rpe,
            notes: s.notes.clone(),
            sync_status: SyncStatus::Synced,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteProgram {
    pub user_id: String,
    pub local_id: String,
    pub name: String,
    pub summary: Option<String>,
    pub duration_weeks: u32,
    pub schedule: serde_json::Value,
    pub active: bool,
    pub ai_generated: bool,
}

impl RemoteProgram {
    #[must_use]
    pub fn from_local(user_id: &str, p: &Program) -> Self {
        Self {
            user_id: user_id.to_string(),
            local_id: p.id.clone(),
            name: p.name.clone(),
            summary: p.summary.clone(),
            duration_weeks: p.duration_weeks,
            schedule: p.schedule.clone(),
            active: p.active,
            ai_generated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RemoteMealPlan {
    pub user_id: String,
    pub local_id: String,
    pub name: String,
    pub target_calories: u32,
    pub target_protein_g: u32,
    pub target_carbs_g: u32,
    pub target_fat_g: u32,
    pub meals: serde_json::Value,
    pub active: bool,
    pub ai_generated: bool,
}

impl RemoteMealPlan {
    #[must_use]
    pub fn from_local(user_id: &str, m: &MealPlan) -> Self {
        Self {
            user_id: user_id.to_string(),
            local_id: m.id.clone(),
            name: m.name.clone(),
            target_calories: m.target_calories,
            target_protein_g: m.target_protein,
            target_carbs_g: m.target_carbs,
            target_fat_g: m.target_fat,
            meals: m.meals.clone(),
            active: m.active,
            ai_generated: true,
        }
    }
}

// --- Seams ---

/// Cloud tables. Every upsert is keyed by `(user_id, local_id)` (the profile
/// by user id).
#[allow(async_fn_in_trait)]
pub trait RemoteStore {
    async fn upsert_profile(&self, session: &Session, row: &RemoteProfile) -> Result<()>;
    async fn upsert_workout(&self, session: &Session, row: &RemoteWorkout) -> Result<RemoteId>;
    async fn upsert_workout_sets(&self, session: &Session, rows: &[RemoteWorkoutSet])
    -> Result<()>;
    async fn upsert_program(&self, session: &Session, row: &RemoteProgram) -> Result<()>;
    async fn upsert_meal_plan(&self, session: &Session, row: &RemoteMealPlan) -> Result<()>;
}

#[allow(async_fn_in_trait)]
pub trait AuthProvider {
    /// `None` when the account still needs email confirmation.
    async fn sign_up(&self, email: &str, password: &str) -> Result<Option<Session>>;
    async fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    async fn sign_out(&self, session: &Session) -> Result<()>;
}

// --- Sync ---

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    pub profile_synced: bool,
    pub profile_failed: bool,
    pub workouts_synced: usize,
    pub workouts_failed: usize,
    pub sets_synced: usize,
    pub programs_synced: usize,
    pub programs_failed: usize,
    pub meal_plans_synced: usize,
    pub meal_plans_failed: usize,
}

impl SyncReport {
    #[must_use]
    pub fn failures(&self) -> usize {
        usize::from(self.profile_failed)
            + self.workouts_failed
            + self.programs_failed
            + self.meal_plans_failed
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures() == 0
    }
}

/// Workouts that are pending or own a pending set.
fn workouts_to_push<'a>(workouts: &'a [Workout], sets: &[WorkoutSet]) -> Vec<&'a Workout> {
    let dirty: HashSet<&str> = sets
        .iter()
        .filter(|s| s.sync_status == SyncStatus::Pending)
        .map(|s| s.workout_id.as_str())
        .collect();
    workouts
        .iter()
        .filter(|w| w.sync_status == SyncStatus::Pending || dirty.contains(w.id.as_str()))
        .collect()
}

/// Push pending local rows to `remote`.
///
/// Remote failures are logged and counted per row; local read or write
/// failures abort the run.
pub async fn sync_local_to_remote<R: RemoteStore>(
    db: &Database,
    remote: &R,
    session: &Session,
) -> Result<SyncReport> {
    let user_id = session.user_id.as_str();
    let mut report = SyncReport::default();

    let profile = db.get_profile()?;
    if profile.onboarding_complete {
        match remote
            .upsert_profile(session, &RemoteProfile::from_local(user_id, &profile))
            .await
        {
            Ok(()) => report.profile_synced = true,
            Err(e) => {
                warn!("profile sync failed: {e:#}");
                report.profile_failed = true;
            }
        }
    }

    let workouts = db.get_workouts()?;
    let all_sets = db.get_all_workout_sets()?;
    for workout in workouts_to_push(&workouts, &all_sets) {
        let remote_id = match remote
            .upsert_workout(session, &RemoteWorkout::from_local(user_id, workout))
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!("workout {} sync failed, skipping its sets: {e:#}", workout.id);
                report.workouts_failed += 1;
                continue;
            }
        };

        let sets = db.get_workout_sets(&workout.id)?;
        if !sets.is_empty() {
            let rows: Vec<RemoteWorkoutSet> = sets
                .iter()
                .map(|s| RemoteWorkoutSet::from_local(user_id, &remote_id, s))
                .collect();
            if let Err(e) = remote.upsert_workout_sets(session, &rows).await {
                warn!("sets for workout {} failed to sync: {e:#}", workout.id);
                report.workouts_failed += 1;
                continue;
            }
        }

        let set_ids: Vec<String> = sets.iter().map(|s| s.id.clone()).collect();
        db.mark_synced(&workout.id, &set_ids)?;
        debug!("workout {} synced as {remote_id}", workout.id);
        report.workouts_synced += 1;
        report.sets_synced += sets.len();
    }

    for program in db.get_programs()? {
        match remote
            .upsert_program(session, &RemoteProgram::from_local(user_id, &program))
            .await
        {
            Ok(()) => report.programs_synced += 1,
            Err(e) => {
                warn!("program {} sync failed: {e:#}", program.id);
                report.programs_failed += 1;
            }
        }
    }

    for plan in db.get_meal_plans()? {
        match remote
            .upsert_meal_plan(session, &RemoteMealPlan::from_local(user_id, &plan))
            .await
        {
            Ok(()) => report.meal_plans_synced += 1,
            Err(e) => {
                warn!("meal plan {} sync failed: {e:#}", plan.id);
                report.meal_plans_failed += 1;
            }
        }
    }

    info!(
        "sync finished: {} workouts, {} sets, {} failures",
        report.workouts_synced,
        report.sets_synced,
        report.failures()
    );
    Ok(report)
}
