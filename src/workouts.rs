use anyhow::Result;
use chrono::{DateTime, Utc};

use crate::{
    stats::{self, DashboardStats, Progress},
    storage::Storage,
    types::{
        CompletedExercise, FitnessError, FitnessLevel, PlanFilter, PlannedExercise, WorkoutPlan,
        WorkoutSession,
    },
};

pub struct Dashboard {
    pub plans: Vec<WorkoutPlan>,
    pub stats: DashboardStats,
    pub recent_sessions: Vec<WorkoutSession>,
}

pub fn create_plan<S: Storage + ?Sized>(
    storage: &S,
    user_id: &str,
    name: &str,
    exercises: Vec<PlannedExercise>,
    level: FitnessLevel,
) -> Result<WorkoutPlan> {
    let plan = WorkoutPlan::new(name, user_id, exercises, level)?;
    storage.save_plan(&plan)?;
    log::info!(
        "📋 Plan {} created for user {} ({} exercises)",
        plan.id,
        user_id,
        plan.exercises.len()
    );
    Ok(plan)
}

/// Loads a plan the user owns; someone else's plan is reported as missing.
pub fn owned_plan<S: Storage + ?Sized>(
    storage: &S,
    user_id: &str,
    plan_id: &str,
) -> Result<WorkoutPlan> {
    match storage.load_plan(plan_id)? {
        Some(plan) if plan.is_owned_by(user_id) => Ok(plan),
        _ => Err(FitnessError::PlanNotFound(plan_id.to_string()).into()),
    }
}

fn owned_session<S: Storage + ?Sized>(
    storage: &S,
    user_id: &str,
    session_id: &str,
) -> Result<WorkoutSession> {
    match storage.load_session(session_id)? {
        Some(session) if session.is_owned_by(user_id) => Ok(session),
        _ => Err(FitnessError::SessionNotFound(session_id.to_string()).into()),
    }
}

/// Opens a session on an owned plan.
///
/// `present` runs before anything is stored; when it fails no session is
/// saved, so a page that cannot be rendered leaves no open session behind.
pub fn start_workout<S, T, F>(
    storage: &S,
    user_id: &str,
    plan_id: &str,
    now: DateTime<Utc>,
    present: F,
) -> Result<T>
where
    S: Storage + ?Sized,
    F: FnOnce(&WorkoutPlan, &WorkoutSession) -> Result<T>,
{
    let plan = owned_plan(storage, user_id, plan_id)?;
    let session = WorkoutSession::start(&plan.id, user_id, now);
    let presented = present(&plan, &session)?;
    storage.save_session(&session)?;
    log::info!("🏋️ Session {} started from plan {}", session.id, plan.id);
    Ok(presented)
}

pub fn complete_exercise<S: Storage + ?Sized>(
    storage: &S,
    user_id: &str,
    session_id: &str,
    exercise: CompletedExercise,
) -> Result<WorkoutSession> {
    let mut session = owned_session(storage, user_id, session_id)?;
    log::debug!(
        "Session {} recorded {} with {} sets",
        session.id,
        exercise.exercise_key,
        exercise.sets.len()
    );
    session.record_exercise(exercise);
    storage.save_session(&session)?;
    Ok(session)
}

pub fn finish_workout<S: Storage + ?Sized>(
    storage: &S,
    user_id: &str,
    session_id: &str,
    notes: &str,
    now: DateTime<Utc>,
) -> Result<WorkoutSession> {
    let mut session = owned_session(storage, user_id, session_id)?;
    session.complete(notes, now);
    storage.save_session(&session)?;
    log::info!("✅ Session {} finished", session.id);
    Ok(session)
}

pub fn dashboard<S: Storage + ?Sized>(
    storage: &S,
    user_id: &str,
    filter: &PlanFilter,
    now: DateTime<Utc>,
) -> Result<Dashboard> {
    let all_plans = storage.list_plans(user_id, &PlanFilter::default())?;
    let sessions = storage.list_sessions(user_id)?;

    let stats = stats::dashboard_stats(&all_plans, &sessions, now);
    let recent_sessions = stats::recent_sessions(&sessions, now, stats::RECENT_SESSIONS_LIMIT)
        .into_iter()
        .cloned()
        .collect();
    let plans = if filter.level.is_some() {
        storage.list_plans(user_id, filter)?
    } else {
        all_plans
    };

    Ok(Dashboard {
        plans,
        stats,
        recent_sessions,
    })
}

pub fn progress<S: Storage + ?Sized>(storage: &S, user_id: &str) -> Result<Progress> {
    let sessions = storage.list_sessions(user_id)?;
    Ok(stats::progress(&sessions))
}
