use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum FitnessError {
    #[error("workout plan name is required")]
    EmptyPlanName,
    #[error("unknown exercise: {0}")]
    UnknownExercise(String),
    #[error("targets out of range for {0}: at most 20 sets of 1000 reps with a finite weight")]
    TargetOutOfRange(String),
    #[error("invalid fitness level: {0}")]
    InvalidLevel(String),
    #[error("workout plan not found: {0}")]
    PlanNotFound(String),
    #[error("workout session not found: {0}")]
    SessionNotFound(String),
    #[error("password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("email already registered: {0}")]
    EmailTaken(String),
    #[error("invalid email or password")]
    InvalidCredentials,
}
