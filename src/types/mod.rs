pub mod exercise;
mod fitness_error;
pub mod plan;
mod session;
mod user;

pub use exercise::Exercise;
pub use fitness_error::FitnessError;
pub use plan::{FitnessLevel, PlanFilter, PlannedExercise, WorkoutPlan};
pub use session::{finite_or_zero, CompletedExercise, SetRecord, WorkoutSession};
pub use user::{normalize_email, User};
