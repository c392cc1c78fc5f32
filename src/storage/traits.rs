use std::sync::Arc;

use crate::types::{PlanFilter, User, WorkoutPlan, WorkoutSession};

/// Persistence for users, workout plans and workout sessions.
///
/// Every `save_*` is an upsert keyed on the entity id: the last write wins.
pub trait Storage {
    fn save_user(&self, user: &User) -> anyhow::Result<()>;
    fn load_user(&self, id: &str) -> anyhow::Result<Option<User>>;
    fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    fn find_user_by_google_id(&self, google_id: &str) -> anyhow::Result<Option<User>>;

    fn save_plan(&self, plan: &WorkoutPlan) -> anyhow::Result<()>;
    fn load_plan(&self, id: &str) -> anyhow::Result<Option<WorkoutPlan>>;
    /// Plans owned by `user_id`, newest first.
    fn list_plans(&self, user_id: &str, filter: &PlanFilter) -> anyhow::Result<Vec<WorkoutPlan>>;

    fn save_session(&self, session: &WorkoutSession) -> anyhow::Result<()>;
    fn load_session(&self, id: &str) -> anyhow::Result<Option<WorkoutSession>>;
    /// Sessions owned by `user_id`, most recently started first.
    fn list_sessions(&self, user_id: &str) -> anyhow::Result<Vec<WorkoutSession>>;
}

impl<T: Storage + ?Sized> Storage for Arc<T> {
    fn save_user(&self, user: &User) -> anyhow::Result<()> {
        (**self).save_user(user)
    }

    fn load_user(&self, id: &str) -> anyhow::Result<Option<User>> {
        (**self).load_user(id)
    }

    fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        (**self).find_user_by_email(email)
    }

    fn find_user_by_google_id(&self, google_id: &str) -> anyhow::Result<Option<User>> {
        (**self).find_user_by_google_id(google_id)
    }

    fn save_plan(&self, plan: &WorkoutPlan) -> anyhow::Result<()> {
        (**self).save_plan(plan)
    }

    fn load_plan(&self, id: &str) -> anyhow::Result<Option<WorkoutPlan>> {
        (**self).load_plan(id)
    }

    fn list_plans(&self, user_id: &str, filter: &PlanFilter) -> anyhow::Result<Vec<WorkoutPlan>> {
        (**self).list_plans(user_id, filter)
    }

    fn save_session(&self, session: &WorkoutSession) -> anyhow::Result<()> {
        (**self).save_session(session)
    }

    fn load_session(&self, id: &str) -> anyhow::Result<Option<WorkoutSession>> {
        (**self).load_session(id)
    }

    fn list_sessions(&self, user_id: &str) -> anyhow::Result<Vec<WorkoutSession>> {
        (**self).list_sessions(user_id)
    }
}

/// Sorts plans newest first.
pub(crate) fn sort_plans(plans: &mut [WorkoutPlan]) {
    plans.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

/// Sorts sessions by start time, newest first.
pub(crate) fn sort_sessions(sessions: &mut [WorkoutSession]) {
    sessions.sort_by(|a, b| b.start_time.cmp(&a.start_time));
}
