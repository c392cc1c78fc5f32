use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{exercise, FitnessError};

pub const DEFAULT_SETS: u32 = 3;
pub const DEFAULT_REPS: u32 = 10;
pub const DEFAULT_WEIGHT: f64 = 0.0;
pub const MAX_SETS: u32 = 20;
pub const MAX_REPS: u32 = 1000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitnessLevel {
    Beginner,
    Intermediate,
    Advanced,
    #[default]
    Unspecified,
}

impl FitnessLevel {
    pub const ALL: [FitnessLevel; 4] = [
        FitnessLevel::Beginner,
        FitnessLevel::Intermediate,
        FitnessLevel::Advanced,
        FitnessLevel::Unspecified,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FitnessLevel::Beginner => "beginner",
            FitnessLevel::Intermediate => "intermediate",
            FitnessLevel::Advanced => "advanced",
            FitnessLevel::Unspecified => "unspecified",
        }
    }
}

impl fmt::Display for FitnessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitnessLevel {
    type Err = FitnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        FitnessLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == normalized)
            .ok_or_else(|| FitnessError::InvalidLevel(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlannedExercise {
    pub exercise_key: String,
    pub sets: u32,
    pub reps: u32,
    pub weight: f64,
}

impl PlannedExercise {
    pub fn new(exercise_key: &str) -> Self {
        Self {
            exercise_key: exercise_key.to_string(),
            sets: DEFAULT_SETS,
            reps: DEFAULT_REPS,
            weight: DEFAULT_WEIGHT,
        }
    }

    pub fn with_targets(mut self, sets: u32, reps: u32, weight: f64) -> Self {
        self.sets = sets;
        self.reps = reps;
        self.weight = weight;
        self
    }

    fn targets_in_range(&self) -> bool {
        self.sets <= MAX_SETS && self.reps <= MAX_REPS && self.weight.is_finite()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutPlan {
    pub id: String,
    pub name: String,
    pub user_id: String,
    pub exercises: Vec<PlannedExercise>,
    #[serde(default)]
    pub level: FitnessLevel,
    pub created_at: DateTime<Utc>,
}

impl WorkoutPlan {
    pub fn new(
        name: &str,
        user_id: &str,
        exercises: Vec<PlannedExercise>,
        level: FitnessLevel,
    ) -> Result<Self, FitnessError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FitnessError::EmptyPlanName);
        }
        if let Some(unknown) = exercises
            .iter()
            .find(|e| exercise::find(&e.exercise_key).is_none())
        {
            return Err(FitnessError::UnknownExercise(unknown.exercise_key.clone()));
        }
        if let Some(oversized) = exercises.iter().find(|e| !e.targets_in_range()) {
            return Err(FitnessError::TargetOutOfRange(oversized.exercise_key.clone()));
        }
        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            user_id: user_id.to_string(),
            exercises,
            level,
            created_at: Utc::now(),
        })
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

/// Filters applied when listing a user's plans.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PlanFilter {
    pub level: Option<FitnessLevel>,
}

impl PlanFilter {
    pub fn matches(&self, plan: &WorkoutPlan) -> bool {
        self.level.map_or(true, |level| plan.level == level)
    }
}
