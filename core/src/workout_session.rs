//! An in-progress workout, held in memory until it is finished and written to
//! the store.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FormaError;
use crate::models::{MAX_TARGET_SETS, NewWorkout, Template};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetLog {
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f64>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionExercise {
    pub name: String,
    /// Rep target carried over from a template, e.g. `8-12`.
    pub target_reps: Option<String>,
    pub sets: Vec<SetLog>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub name: Option<String>,
    pub template_id: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub exercises: Vec<SessionExercise>,
}

/// A set ready to be stored, numbered within its exercise.
#[derive(Debug, Clone, PartialEq)]
pub struct FinishedSet {
    pub exercise_name: String,
    pub set_number: u32,
    pub reps: Option<u32>,
    pub weight_kg: Option<f64>,
    pub rpe: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct FinishedWorkout {
    pub workout: NewWorkout,
    pub sets: Vec<FinishedSet>,
}

impl WorkoutSession {
    #[must_use]
    pub fn new(name: Option<String>, started_at: DateTime<Utc>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            template_id: None,
            started_at,
            notes: None,
            exercises: Vec::new(),
        }
    }

    /// One exercise per template entry, each with `target_sets` empty sets
    /// (clamped to `MAX_TARGET_SETS` for templates stored before the limit).
    #[must_use]
    pub fn from_template(template: &Template, started_at: DateTime<Utc>) -> Self {
        Self {
            name: Some(template.name.clone()),
            template_id: Some(template.id.clone()),
            started_at,
            notes: None,
            exercises: template
                .exercises
                .iter()
                .map(|ex| SessionExercise {
                    name: ex.name.clone(),
                    target_reps: Some(ex.target_reps.clone()),
                    sets: vec![
                        SetLog::default();
                        ex.target_sets.clamp(1, MAX_TARGET_SETS) as usize
                    ],
                })
                .collect(),
        }
    }

    /// Returns the index of the new exercise.
    pub fn add_exercise(&mut self, name: &str) -> usize {
        self.exercises.push(SessionExercise {
            name: name.trim().to_string(),
            target_reps: None,
            sets: vec![SetLog::default()],
        });
        self.exercises.len() - 1
    }

    pub fn add_set(&mut self, exercise: usize) -> Result<usize> {
        let ex = self.exercise_mut(exercise)?;
        ex.sets.push(SetLog::default());
        Ok(ex.sets.len() - 1)
    }

    pub fn remove_set(&mut self, exercise: usize, set: usize) -> Result<()> {
        let ex = self.exercise_mut(exercise)?;
        if set >= ex.sets.len() {
            bail!("No set {} for {}", set + 1, ex.name);
        }
        ex.sets.remove(set);
        Ok(())
    }

    /// Record reps and weight for a set and mark it completed.
    pub fn log_set(
        &mut self,
        exercise: usize,
        set: usize,
        reps: Option<u32>,
        weight_kg: Option<f64>,
    ) -> Result<()> {
        let ex = self.exercise_mut(exercise)?;
        let name = ex.name.clone();
        let Some(slot) = ex.sets.get_mut(set) else {
            bail!("No set {} for {name}", set + 1);
        };
        slot.reps = reps;
        slot.weight_kg = weight_kg;
        slot.completed = true;
        Ok(())
    }

    /// Fill the next open set of `exercise_name`, adding the exercise or a set
    /// when none is open.
    pub fn log_next(&mut self, exercise_name: &str, reps: Option<u32>, weight_kg: Option<f64>) {
        let idx = match self
            .exercises
            .iter()
            .position(|e| e.name.eq_ignore_ascii_case(exercise_name.trim()))
        {
            Some(i) => i,
            None => self.add_exercise(exercise_name),
        };
        let ex = &mut self.exercises[idx];
        let slot = match ex.sets.iter().position(|s| !s.completed) {
            Some(i) => i,
            None => {
                ex.sets.push(SetLog::default());
                ex.sets.len() - 1
            }
        };
        ex.sets[slot] = SetLog {
            reps,
            weight_kg,
            rpe: None,
            completed: true,
        };
    }

    #[must_use]
    pub fn completed_set_count(&self) -> usize {
        self.exercises
            .iter()
            .map(|e| e.sets.iter().filter(|s| s.completed).count())
            .sum()
    }

    #[must_use]
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> u32 {
        u32::try_from((now - self.started_at).num_minutes().max(0)).unwrap_or(u32::MAX)
    }

    /// Keep named exercises with completed sets and turn them into records.
    pub fn finish(&self, now: DateTime<Utc>) -> Result<FinishedWorkout> {
        let mut sets = Vec::new();
        for ex in self.exercises.iter().filter(|e| !e.name.trim().is_empty()) {
            let done = ex.sets.iter().filter(|s| s.completed);
            for (number, set) in (1u32..).zip(done) {
                sets.push(FinishedSet {
                    exercise_name: ex.name.trim().to_string(),
                    set_number: number,
                    reps: set.reps,
                    weight_kg: set.weight_kg,
                    rpe: set.rpe,
                });
            }
        }
        if sets.is_empty() {
            return Err(FormaError::NoCompletedSets.into());
        }

        let name = self
            .name
            .clone()
            .unwrap_or_else(|| format!("Workout {}", now.format("%Y-%m-%d")));

        Ok(FinishedWorkout {
            workout: NewWorkout {
                name: Some(name),
                notes: self.notes.clone().filter(|n| !n.trim().is_empty()),
                template_id: self.template_id.clone(),
                duration_minutes: Some(self.elapsed_minutes(now)),
                started_at: Some(self.started_at),
                completed_at: Some(now),
                ..NewWorkout::default()
            },
            sets,
        })
    }

    fn exercise_mut(&mut self, index: usize) -> Result<&mut SessionExercise> {
        match self.exercises.get_mut(index) {
            Some(ex) => Ok(ex),
            None => bail!("No exercise at position {}", index + 1),
        }
    }
}
