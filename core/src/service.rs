use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;

use crate::ai::{self, ChatCompletionProvider, ChatMessage, GeneratedProgram, UserProfile};
use crate::db::Database;
use crate::error::FormaError;
use crate::exercises::{self, CachedExercises, Exercise, ExerciseSource};
use crate::models::{
    ExerciseSession, MealPlan, NewTemplate, NewWorkout, NewWorkoutSet, PersonalRecord, Profile,
    ProfileUpdate, Program, Session, Template, UpdateWorkout, UpdateWorkoutSet, Workout,
    WorkoutSet, WorkoutStats,
};
use crate::nutrition::{BmrFormula, NutritionTargets};
use crate::sync::{self, AuthProvider, RemoteStore, SyncReport};
use crate::workout_session::WorkoutSession;

/// Result of signing in or up. A failed automatic sync is reported here and
/// never fails the sign-in itself.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub session: Option<Session>,
    pub sync: Option<SyncReport>,
    pub sync_error: Option<String>,
}

pub struct FormaService {
    db: Database,
    syncing: AtomicBool,
}

/// Clears the in-progress flag when the sync ends, however it ends.
struct SyncGuard<'a>(&'a AtomicBool);

impl Drop for SyncGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl FormaService {
    pub fn new(db_path: &Path) -> Result<Self> {
        Ok(Self::from_database(Database::open(db_path)?))
    }

    pub fn new_in_memory() -> Result<Self> {
        Ok(Self::from_database(Database::open_in_memory()?))
    }

    #[must_use]
    pub fn from_database(db: Database) -> Self {
        Self {
            db,
            syncing: AtomicBool::new(false),
        }
    }

    // --- Workouts ---

    pub fn create_workout(&self, new: &NewWorkout) -> Result<Workout> {
        self.db.create_workout(new)
    }

    pub fn get_workouts(&self) -> Result<Vec<Workout>> {
        self.db.get_workouts()
    }

    pub fn get_workout(&self, id: &str) -> Result<Workout> {
        self.db
            .get_workout(id)?
            .ok_or_else(|| FormaError::not_found("workout", id).into())
    }

    pub fn update_workout(&self, id: &str, update: &UpdateWorkout) -> Result<Workout> {
        self.db
            .update_workout(id, update)?
            .ok_or_else(|| FormaError::not_found("workout", id).into())
    }

    pub fn delete_workout(&self, id: &str) -> Result<bool> {
        self.db.delete_workout(id)
    }

    pub fn get_workout_sets(&self, workout_id: &str) -> Result<Vec<WorkoutSet>> {
        self.db.get_workout_sets(workout_id)
    }

    pub fn add_workout_set(&self, new: &NewWorkoutSet) -> Result<WorkoutSet> {
        self.db.add_workout_set(new)
    }

    pub fn update_workout_set(&self, id: &str, update: &UpdateWorkoutSet) -> Result<WorkoutSet> {
        self.db
            .update_workout_set(id, update)?
            .ok_or_else(|| FormaError::not_found("set", id).into())
    }

    pub fn delete_workout_set(&self, id: &str) -> Result<bool> {
        self.db.delete_workout_set(id)
    }

    // --- Live sessions ---

    /// Start from a template (matched by id or name) or empty.
    pub fn start_session(
        &self,
        template: Option<&str>,
        name: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<WorkoutSession> {
        let Some(query) = template else {
            return Ok(WorkoutSession::new(name, now));
        };
        let template = self.find_template(query)?;
        let mut session = WorkoutSession::from_template(&template, now);
        if let Some(name) = name.filter(|n| !n.trim().is_empty()) {
            session.name = Some(name);
        }
        Ok(session)
    }

    /// Store a finished session as a completed workout with its sets.
    pub fn finish_session(
        &self,
        session: &WorkoutSession,
        now: DateTime<Utc>,
    ) -> Result<(Workout, Vec<WorkoutSet>)> {
        let finished = session.finish(now)?;
        self.db.in_transaction(|db| {
            let workout = db.create_workout(&finished.workout)?;
            let sets = finished
                .sets
                .iter()
                .map(|s| {
                    db.add_workout_set(&NewWorkoutSet {
                        workout_id: workout.id.clone(),
                        exercise_name: s.exercise_name.clone(),
                        set_number: s.set_number,
                        reps: s.reps,
                        weight_kg: s.weight_kg,
                        rpe: s.rpe,
                        notes: None,
                        completed: true,
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            info!("saved workout {} with {} sets", workout.id, sets.len());
            Ok((workout, sets))
        })
    }

    // --- Templates ---

    pub fn create_template(&self, new: &NewTemplate) -> Result<Template> {
        self.db.create_template(new)
    }

    pub fn get_templates(&self) -> Result<Vec<Template>> {
        self.db.get_templates()
    }

    pub fn find_template(&self, id_or_name: &str) -> Result<Template> {
        self.db
            .find_template(id_or_name)?
            .ok_or_else(|| FormaError::not_found("template", id_or_name).into())
    }

    pub fn delete_template(&self, id_or_name: &str) -> Result<bool> {
        match self.db.find_template(id_or_name)? {
            Some(t) => self.db.delete_template(&t.id),
            None => Ok(false),
        }
    }

    // --- Profile ---

    pub fn get_profile(&self) -> Result<Profile> {
        self.db.get_profile()
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<Profile> {
        self.db.update_profile(update)
    }

    pub fn nutrition_targets(&self, formula: BmrFormula) -> Result<NutritionTargets> {
        let profile = self.db.get_profile()?;
        Ok(UserProfile::try_from(&profile)?.targets_with(formula))
    }

    // --- Stats / progress ---

    pub fn get_workout_stats(&self, now: DateTime<Utc>) -> Result<WorkoutStats> {
        self.db.get_workout_stats(now)
    }

    pub fn get_exercise_history(&self, exercise: &str) -> Result<Vec<ExerciseSession>> {
        self.db.get_exercise_history(exercise)
    }

    pub fn get_exercise_pr(&self, exercise: &str) -> Result<Option<PersonalRecord>> {
        self.db.get_exercise_pr(exercise)
    }

    // --- Programs and meal plans ---

    pub fn get_programs(&self) -> Result<Vec<Program>> {
        self.db.get_programs()
    }

    pub fn get_active_program(&self) -> Result<Option<Program>> {
        self.db.get_active_program()
    }

    pub fn get_program(&self, id: &str) -> Result<Program> {
        self.db
            .get_programs()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| FormaError::not_found("program", id).into())
    }

    pub fn activate_program(&self, id: &str) -> Result<Program> {
        self.db.activate_program(id)
    }

    pub fn get_meal_plans(&self) -> Result<Vec<MealPlan>> {
        self.db.get_meal_plans()
    }

    pub fn get_active_meal_plan(&self) -> Result<Option<MealPlan>> {
        self.db.get_active_meal_plan()
    }

    pub fn get_meal_plan(&self, id: &str) -> Result<MealPlan> {
        self.db
            .get_meal_plans()?
            .into_iter()
            .find(|p| p.id == id)
            .ok_or_else(|| FormaError::not_found("meal plan", id).into())
    }

    pub fn activate_meal_plan(&self, id: &str) -> Result<MealPlan> {
        self.db.activate_meal_plan(id)
    }

    // --- AI programs ---

    /// Ask the model for a program built around the stored profile.
    pub async fn generate_program<P: ChatCompletionProvider>(
        &self,
        provider: &P,
    ) -> Result<GeneratedProgram> {
        let profile = UserProfile::try_from(&self.db.get_profile()?)?;
        let targets = profile.targets();
        let messages = [ChatMessage::user(ai::build_prompt(&profile, &targets))];

        info!("requesting program for goal {}", profile.goal.as_str());
        let reply = provider.complete(&messages).await?;
        ai::parse_generated_program(&reply)
    }

    /// Store a generated program and its meal plan, both active.
    pub fn save_generated_program(
        &self,
        generated: &GeneratedProgram,
    ) -> Result<(Program, MealPlan)> {
        let new_program = generated.to_new_program()?;
        let new_plan = generated.to_new_meal_plan()?;
        self.db.in_transaction(|db| {
            let program = db.save_program(&new_program)?;
            let plan = db.save_meal_plan(&new_plan)?;
            Ok((program, plan))
        })
    }

    // --- Account and sync ---

    pub fn current_session(&self) -> Result<Option<Session>> {
        self.db.get_session()
    }

    #[must_use]
    pub fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::Acquire)
    }

    /// Push pending local data. Only one sync runs at a time.
    pub async fn sync<R: RemoteStore>(&self, remote: &R) -> Result<SyncReport> {
        let session = match self.db.get_session()? {
            Some(s) if !s.is_expired(Utc::now()) => s,
            Some(_) => {
                warn!("stored session has expired");
                return Err(FormaError::NotSignedIn.into());
            }
            None => return Err(FormaError::NotSignedIn.into()),
        };

        if self
            .syncing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FormaError::SyncInProgress.into());
        }
        let _guard = SyncGuard(&self.syncing);

        sync::sync_local_to_remote(&self.db, remote, &session).await
    }

    async fn auto_sync<R: RemoteStore>(&self, remote: &R) -> (Option<SyncReport>, Option<String>) {
        match self.sync(remote).await {
            Ok(report) => (Some(report), None),
            Err(e) => {
                warn!("sync after sign-in failed: {e:#}");
                (None, Some(format!("{e:#}")))
            }
        }
    }

    pub async fn sign_in<A: AuthProvider, R: RemoteStore>(
        &self,
        auth: &A,
        remote: &R,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome> {
        let session = auth.sign_in(email, password).await?;
        self.db.save_session(&session)?;
        info!("signed in as {}", session.user_id);

        let (sync, sync_error) = self.auto_sync(remote).await;
        Ok(AuthOutcome {
            session: Some(session),
            sync,
            sync_error,
        })
    }

    pub async fn sign_up<A: AuthProvider, R: RemoteStore>(
        &self,
        auth: &A,
        remote: &R,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome> {
        let Some(session) = auth.sign_up(email, password).await? else {
            info!("account created, waiting for email confirmation");
            return Ok(AuthOutcome {
                session: None,
                sync: None,
                sync_error: None,
            });
        };
        self.db.save_session(&session)?;

        let (sync, sync_error) = self.auto_sync(remote).await;
        Ok(AuthOutcome {
            session: Some(session),
            sync,
            sync_error,
        })
    }

    /// Forget the local session. A failed remote sign-out is only logged.
    pub async fn sign_out<A: AuthProvider>(&self, auth: &A) -> Result<bool> {
        let Some(session) = self.db.get_session()? else {
            return Ok(false);
        };
        if let Err(e) = auth.sign_out(&session).await {
            warn!("remote sign-out failed: {e:#}");
        }
        self.db.clear_session()
    }

    // --- Exercise catalog ---

    /// Fresh cache, then remote, then stale cache, then the built-in list.
    pub async fn get_exercises<S: ExerciseSource>(
        &self,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<Vec<Exercise>> {
        // an unreadable cache is treated as absent
        let cached = match self.db.get_exercise_cache() {
            Ok(c) => c,
            Err(e) => {
                warn!("ignoring exercise cache: {e:#}");
                None
            }
        };
        if let Some(cache) = cached.as_ref().filter(|c| c.is_fresh(now)) {
            return Ok(cache.data.clone());
        }

        match source.fetch_exercises().await {
            Ok(list) if !list.is_empty() => {
                self.db.put_exercise_cache(&CachedExercises {
                    data: list.clone(),
                    fetched_at: now,
                })?;
                Ok(list)
            }
            Ok(_) => {
                warn!("remote exercise catalog is empty");
                Ok(Self::stale_or_fallback(cached))
            }
            Err(e) => {
                warn!("exercise fetch failed: {e:#}");
                Ok(Self::stale_or_fallback(cached))
            }
        }
    }

    fn stale_or_fallback(cached: Option<CachedExercises>) -> Vec<Exercise> {
        cached
            .map(|c| c.data)
            .filter(|d| !d.is_empty())
            .unwrap_or_else(exercises::fallback_exercises)
    }

    // --- Data management ---

    pub fn clear_all_data(&self) -> Result<()> {
        self.db.clear_all_data()
    }

    /// Move a corrupt blob aside so the key reads as empty again.
    pub fn repair_key(&self, key: &str) -> Result<bool> {
        self.db.quarantine_key(key)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use anyhow::bail;
    use chrono::Duration;

    use super::*;
    use crate::db::keys;
    use crate::models::{Equipment, Experience, Gender, Goal, NewTemplateExercise, SyncStatus};
    use crate::sync::tests::{MockRemote, session};

    struct MockChat {
        reply: String,
        prompts: RefCell<Vec<String>>,
    }

    impl ChatCompletionProvider for MockChat {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.prompts.borrow_mut().push(messages[0].content.clone());
            Ok(self.reply.clone())
        }
    }

    struct MockAuth {
        confirm_email: bool,
    }

    impl AuthProvider for MockAuth {
        async fn sign_up(&self, _email: &str, _password: &str) -> Result<Option<Session>> {
            Ok((!self.confirm_email).then(session))
        }

        async fn sign_in(&self, _email: &str, password: &str) -> Result<Session> {
            if password == "wrong" {
                bail!("Invalid login credentials");
            }
            Ok(session())
        }

        async fn sign_out(&self, _session: &Session) -> Result<()> {
            bail!("offline")
        }
    }

    struct MockSource {
        result: Option<Vec<Exercise>>,
        calls: Cell<usize>,
    }

    impl ExerciseSource for MockSource {
        async fn fetch_exercises(&self) -> Result<Vec<Exercise>> {
            self.calls.set(self.calls.get() + 1);
            match &self.result {
                Some(list) => Ok(list.clone()),
                None => bail!("offline"),
            }
        }
    }

    fn one_exercise() -> Vec<Exercise> {
        vec![Exercise {
            id: "abc".to_string(),
            name: "Zercher Squat".to_string(),
            muscle_group: "legs".to_string(),
            equipment: Some("barbell".to_string()),
            instructions: None,
        }]
    }

    fn onboarded(svc: &FormaService) {
        svc.update_profile(&ProfileUpdate {
            age: Some(30),
            gender: Some(Gender::Female),
            height_cm: Some(168.0),
            weight_kg: Some(62.0),
            goal: Some(Goal::Strength),
            experience: Some(Experience::Beginner),
            workout_days: Some(3),
            workout_duration: Some(45),
            equipment: Some(Equipment::FullGym),
            onboarding_complete: Some(true),
            ..ProfileUpdate::default()
        })
        .unwrap();
    }

    #[test]
    fn test_finish_session_from_template() {
        let svc = FormaService::new_in_memory().unwrap();
        svc.create_template(&NewTemplate {
            name: "Lower".to_string(),
            exercises: vec![NewTemplateExercise {
                name: "Barbell Squat".to_string(),
                target_sets: 3,
                target_reps: "5".to_string(),
            }],
        })
        .unwrap();

        let start = Utc::now() - Duration::minutes(40);
        let mut session = svc.start_session(Some("lower"), None, start).unwrap();
        session.log_set(0, 0, Some(5), Some(100.0)).unwrap();
        session.log_set(0, 1, Some(5), Some(100.0)).unwrap();

        let (workout, sets) = svc.finish_session(&session, Utc::now()).unwrap();
        assert_eq!(workout.name, "Lower");
        assert!(workout.is_completed());
        assert_eq!(workout.duration_minutes, Some(40));
        assert_eq!(sets.len(), 2);
        assert_eq!(svc.get_workout_sets(&workout.id).unwrap().len(), 2);
    }

    #[test]
    fn test_finish_session_stores_notes_with_workout() {
        let svc = FormaService::new_in_memory().unwrap();
        let mut session = svc.start_session(None, None, Utc::now()).unwrap();
        session.notes = Some("left knee tight".to_string());
        let i = session.add_exercise("Leg Press");
        session.log_set(i, 0, Some(12), Some(140.0)).unwrap();

        let (workout, _) = svc.finish_session(&session, Utc::now()).unwrap();
        assert_eq!(workout.notes.as_deref(), Some("left knee tight"));
        let stored = svc.get_workout(&workout.id).unwrap();
        assert_eq!(stored.notes.as_deref(), Some("left knee tight"));
    }

    #[test]
    fn test_finish_empty_session_writes_nothing() {
        let svc = FormaService::new_in_memory().unwrap();
        let session = svc.start_session(None, None, Utc::now()).unwrap();
        assert!(svc.finish_session(&session, Utc::now()).is_err());
        assert!(svc.get_workouts().unwrap().is_empty());
    }

    #[test]
    fn test_start_session_unknown_template() {
        let svc = FormaService::new_in_memory().unwrap();
        let err = svc.start_session(Some("ghost"), None, Utc::now()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormaError>(),
            Some(FormaError::NotFound { kind: "template", .. })
        ));
    }

    #[tokio::test]
    async fn test_generate_and_save_program() {
        let svc = FormaService::new_in_memory().unwrap();
        onboarded(&svc);
        let chat = MockChat {
            reply: r#"{"summary": "Get strong", "calories": 2100, "protein": 112, "fat": 60,
                "workoutPlan": {"name": "Novice Strength", "schedule": [
                    {"day": "Monday", "workout": {"name": "A", "exercises": [
                        {"name": "Barbell Squat", "sets": 5, "reps": "5", "rest": "3 min"}]}},
                    {"day": "Tuesday", "workout": "Rest"}]},
                "mealPlan": {"meals": []}}"#
                .to_string(),
            prompts: RefCell::new(Vec::new()),
        };

        let generated = svc.generate_program(&chat).await.unwrap();
        assert!(chat.prompts.borrow()[0].contains("STRENGTH PROTOCOL"));
        assert_eq!(generated.workout_plan.name, "Novice Strength");

        let (program, plan) = svc.save_generated_program(&generated).unwrap();
        assert!(program.active);
        assert_eq!(program.duration_weeks, 4);
        assert_eq!(plan.target_fat, 60);
        assert_eq!(svc.get_active_program().unwrap().unwrap().id, program.id);
        assert_eq!(svc.get_active_meal_plan().unwrap().unwrap().id, plan.id);
    }

    #[tokio::test]
    async fn test_generate_requires_complete_profile() {
        let svc = FormaService::new_in_memory().unwrap();
        let chat = MockChat {
            reply: String::new(),
            prompts: RefCell::new(Vec::new()),
        };
        let err = svc.generate_program(&chat).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormaError>(),
            Some(FormaError::IncompleteProfile(_))
        ));
        assert!(chat.prompts.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_sync_requires_session() {
        let svc = FormaService::new_in_memory().unwrap();
        let err = svc.sync(&MockRemote::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormaError>(),
            Some(FormaError::NotSignedIn)
        ));
    }

    #[tokio::test]
    async fn test_sync_rejected_while_running() {
        let svc = FormaService::new_in_memory().unwrap();
        svc.db.save_session(&session()).unwrap();
        svc.syncing.store(true, Ordering::Release);

        let err = svc.sync(&MockRemote::default()).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FormaError>(),
            Some(FormaError::SyncInProgress)
        ));

        svc.syncing.store(false, Ordering::Release);
        assert!(svc.sync(&MockRemote::default()).await.is_ok());
        assert!(!svc.is_syncing());
    }

    #[tokio::test]
    async fn test_sign_in_auto_syncs() {
        let svc = FormaService::new_in_memory().unwrap();
        onboarded(&svc);
        let w = svc
            .create_workout(&NewWorkout {
                completed_at: Some(Utc::now()),
                ..NewWorkout::default()
            })
            .unwrap();
        let remote = MockRemote::default();

        let outcome = svc
            .sign_in(&MockAuth { confirm_email: false }, &remote, "a@b.c", "pw")
            .await
            .unwrap();
        assert!(outcome.sync_error.is_none());
        assert_eq!(outcome.sync.unwrap().workouts_synced, 1);
        assert!(remote.profile.borrow().is_some());
        assert_eq!(svc.get_workout(&w.id).unwrap().sync_status, SyncStatus::Synced);
        assert!(svc.current_session().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_sign_in_failure_stores_nothing() {
        let svc = FormaService::new_in_memory().unwrap();
        let result = svc
            .sign_in(&MockAuth { confirm_email: false }, &MockRemote::default(), "a@b.c", "wrong")
            .await;
        assert!(result.is_err());
        assert!(svc.current_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_up_pending_confirmation() {
        let svc = FormaService::new_in_memory().unwrap();
        let outcome = svc
            .sign_up(&MockAuth { confirm_email: true }, &MockRemote::default(), "a@b.c", "pw")
            .await
            .unwrap();
        assert!(outcome.session.is_none());
        assert!(outcome.sync.is_none());
        assert!(svc.current_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_even_when_remote_fails() {
        let svc = FormaService::new_in_memory().unwrap();
        svc.db.save_session(&session()).unwrap();
        assert!(svc.sign_out(&MockAuth { confirm_email: false }).await.unwrap());
        assert!(svc.current_session().unwrap().is_none());
        assert!(!svc.sign_out(&MockAuth { confirm_email: false }).await.unwrap());
    }

    #[tokio::test]
    async fn test_exercises_fresh_cache_skips_fetch() {
        let svc = FormaService::new_in_memory().unwrap();
        let now = Utc::now();
        let source = MockSource {
            result: Some(one_exercise()),
            calls: Cell::new(0),
        };

        assert_eq!(svc.get_exercises(&source, now).await.unwrap().len(), 1);
        assert_eq!(svc.get_exercises(&source, now + Duration::hours(1)).await.unwrap().len(), 1);
        assert_eq!(source.calls.get(), 1);

        svc.get_exercises(&source, now + Duration::hours(25)).await.unwrap();
        assert_eq!(source.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_exercises_fallbacks() {
        let svc = FormaService::new_in_memory().unwrap();
        let now = Utc::now();
        let offline = MockSource {
            result: None,
            calls: Cell::new(0),
        };
        assert_eq!(svc.get_exercises(&offline, now).await.unwrap().len(), 24);

        let empty = MockSource {
            result: Some(vec![]),
            calls: Cell::new(0),
        };
        assert_eq!(svc.get_exercises(&empty, now).await.unwrap().len(), 24);

        // stale cache beats the built-in list when offline
        svc.db
            .put_exercise_cache(&CachedExercises {
                data: one_exercise(),
                fetched_at: now - Duration::days(3),
            })
            .unwrap();
        let list = svc.get_exercises(&offline, now).await.unwrap();
        assert_eq!(list[0].name, "Zercher Squat");
    }

    #[test]
    fn test_repair_corrupt_key() {
        let svc = FormaService::new_in_memory().unwrap();
        svc.db.write_raw(keys::TEMPLATES, "garbage").unwrap();
        assert!(svc.get_templates().is_err());
        assert!(svc.repair_key(keys::TEMPLATES).unwrap());
        assert!(svc.get_templates().unwrap().is_empty());
    }

    #[test]
    fn test_nutrition_targets_from_profile() {
        let svc = FormaService::new_in_memory().unwrap();
        assert!(svc.nutrition_targets(BmrFormula::MifflinStJeor).is_err());
        onboarded(&svc);
        let targets = svc.nutrition_targets(BmrFormula::MifflinStJeor).unwrap();
        // 620 + 1050 - 150 - 161 = 1359
        assert!((targets.bmr - 1359.0).abs() < 1e-9);
        assert!((targets.protein_g - 112.0).abs() < f64::EPSILON);

        let hb = svc.nutrition_targets(BmrFormula::HarrisBenedict).unwrap();
        assert_eq!(hb.formula, BmrFormula::HarrisBenedict);
        assert!((hb.bmr - targets.bmr).abs() > 1.0);
    }
}
