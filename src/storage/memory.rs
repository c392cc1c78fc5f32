use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};

use super::traits::{sort_plans, sort_sessions, Storage};
use crate::types::{PlanFilter, User, WorkoutPlan, WorkoutSession};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    plans: HashMap<String, WorkoutPlan>,
    sessions: HashMap<String, WorkoutSession>,
}

/// Process-local storage. Clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tables>> {
        self.inner
            .read()
            .map_err(|_| anyhow!("memory storage lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tables>> {
        self.inner
            .write()
            .map_err(|_| anyhow!("memory storage lock poisoned"))
    }
}

impl Storage for MemoryStorage {
    fn save_user(&self, user: &User) -> Result<()> {
        let mut tables = self.write()?;
        for other in tables.users.values().filter(|u| u.id != user.id) {
            if other.email == user.email {
                bail!("duplicate key: users.email {}", user.email);
            }
            if user.google_id.is_some() && other.google_id == user.google_id {
                bail!("duplicate key: users.google_id");
            }
        }
        tables.users.insert(user.id.clone(), user.clone());
        Ok(())
    }

    fn load_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.read()?.users.get(id).cloned())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        Ok(self
            .read()?
            .users
            .values()
            .find(|u| u.google_id.as_deref() == Some(google_id))
            .cloned())
    }

    fn save_plan(&self, plan: &WorkoutPlan) -> Result<()> {
        self.write()?.plans.insert(plan.id.clone(), plan.clone());
        Ok(())
    }

    fn load_plan(&self, id: &str) -> Result<Option<WorkoutPlan>> {
        Ok(self.read()?.plans.get(id).cloned())
    }

    fn list_plans(&self, user_id: &str, filter: &PlanFilter) -> Result<Vec<WorkoutPlan>> {
        let mut plans: Vec<_> = self
            .read()?
            .plans
            .values()
            .filter(|p| p.is_owned_by(user_id) && filter.matches(p))
            .cloned()
            .collect();
        sort_plans(&mut plans);
        Ok(plans)
    }

    fn save_session(&self, session: &WorkoutSession) -> Result<()> {
        self.write()?
            .sessions
            .insert(session.id.clone(), session.clone());
        Ok(())
    }

    fn load_session(&self, id: &str) -> Result<Option<WorkoutSession>> {
        Ok(self.read()?.sessions.get(id).cloned())
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        let mut sessions: Vec<_> = self
            .read()?
            .sessions
            .values()
            .filter(|s| s.is_owned_by(user_id))
            .cloned()
            .collect();
        sort_sessions(&mut sessions);
        Ok(sessions)
    }
}
