use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetRecord {
    pub reps: u32,
    pub weight: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletedExercise {
    pub exercise_key: String,
    pub sets: Vec<SetRecord>,
}

impl CompletedExercise {
    /// Builds an exercise record from the tracker's parallel set rows.
    ///
    /// Only rows flagged `"true"` are kept. Blank or malformed reps and
    /// weights count as zero, and so do non-finite weights.
    pub fn from_set_rows<S: AsRef<str>>(
        exercise_key: &str,
        completed: &[S],
        reps: &[S],
        weights: &[S],
    ) -> Self {
        let sets = completed
            .iter()
            .enumerate()
            .filter(|(_, flag)| flag.as_ref() == "true")
            .map(|(i, _)| SetRecord {
                reps: parse_or_zero(reps.get(i)),
                weight: finite_or_zero(parse_or_zero(weights.get(i))),
            })
            .collect();
        Self {
            exercise_key: exercise_key.to_string(),
            sets,
        }
    }

    /// Training volume: sum of reps times weight over all sets.
    pub fn volume(&self) -> f64 {
        self.sets.iter().map(|s| s.reps as f64 * s.weight).sum()
    }
}

fn parse_or_zero<S: AsRef<str>, T: std::str::FromStr + Default>(raw: Option<&S>) -> T {
    raw.and_then(|v| v.as_ref().trim().parse().ok())
        .unwrap_or_default()
}

/// NaN and infinities serialize to JSON `null` and cannot be read back.
pub fn finite_or_zero(weight: f64) -> f64 {
    if weight.is_finite() {
        weight
    } else {
        0.0
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub plan_id: String,
    pub user_id: String,
    pub start_time: DateTime<Utc>,
    #[serde(default)]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercises_completed: Vec<CompletedExercise>,
    #[serde(default)]
    pub notes: String,
}

impl WorkoutSession {
    pub fn start(plan_id: &str, user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            plan_id: plan_id.to_string(),
            user_id: user_id.to_string(),
            start_time: now,
            end_time: None,
            exercises_completed: Vec::new(),
            notes: String::new(),
        }
    }

    pub fn record_exercise(&mut self, exercise: CompletedExercise) {
        self.exercises_completed.push(exercise);
    }

    pub fn complete(&mut self, notes: &str, now: DateTime<Utc>) {
        self.end_time = Some(now);
        self.notes = notes.to_string();
    }

    pub fn is_completed(&self) -> bool {
        self.end_time.is_some()
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}
