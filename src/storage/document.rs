use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, bail, Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use super::{
    traits::{sort_plans, sort_sessions, Storage},
    SetupReport,
};
use crate::types::{FitnessLevel, PlanFilter, User, WorkoutPlan, WorkoutSession};

const USERS: &str = "users";
const PLANS: &str = "workout_plans";
const SESSIONS: &str = "workout_sessions";

/// Document store: one JSON array file per collection inside `dir`.
#[derive(Clone, Debug)]
pub struct DocumentStorage {
    dir: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl DocumentStorage {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating document dir {}", self.dir.display()))
    }

    pub fn reset_all(&self) -> Result<()> {
        for name in [USERS, PLANS, SESSIONS] {
            match fs::remove_file(self.collection_path(name)) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// Gives every plan document without a level an explicit `unspecified`.
    pub fn backfill_levels(&self) -> Result<usize> {
        let _guard = self.guard()?;
        let mut docs: Vec<Value> = self.read_collection(PLANS)?;
        let mut backfilled = 0;
        for doc in docs.iter_mut() {
            let Some(obj) = doc.as_object_mut() else {
                continue;
            };
            if !obj.contains_key("level") {
                obj.insert(
                    "level".to_string(),
                    Value::String(FitnessLevel::Unspecified.to_string()),
                );
                backfilled += 1;
            }
        }
        if backfilled > 0 {
            self.write_collection(PLANS, &docs)?;
        }
        Ok(backfilled)
    }

    pub fn setup(&self) -> Result<SetupReport> {
        self.init()?;
        let backfilled = self.backfill_levels()?;
        let plans = {
            let _guard = self.guard()?;
            self.read_collection::<Value>(PLANS)?.len()
        };
        Ok(SetupReport {
            plans,
            backfilled,
            indexes: vec![
                "users.email (unique)".to_string(),
                "users.google_id (unique, sparse)".to_string(),
            ],
        })
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>> {
        self.lock
            .lock()
            .map_err(|_| anyhow!("document storage lock poisoned"))
    }

    fn collection_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    fn read_collection<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>> {
        let path = self.collection_path(name);
        match fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Vec::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("decoding {}", path.display())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e).with_context(|| format!("reading {}", path.display())),
        }
    }

    fn write_collection<T: Serialize>(&self, name: &str, docs: &[T]) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.collection_path(name);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(docs)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        fs::rename(&tmp, &path).with_context(|| format!("replacing {}", path.display()))?;
        Ok(())
    }

    fn upsert<T, F>(&self, name: &str, doc: &T, same_id: F) -> Result<()>
    where
        T: Serialize + DeserializeOwned + Clone,
        F: Fn(&T) -> bool,
    {
        let mut docs: Vec<T> = self.read_collection(name)?;
        match docs.iter_mut().find(|d| same_id(d)) {
            Some(existing) => *existing = doc.clone(),
            None => docs.push(doc.clone()),
        }
        self.write_collection(name, &docs)
    }

    fn find<T, F>(&self, name: &str, pred: F) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let _guard = self.guard()?;
        Ok(self
            .read_collection::<T>(name)?
            .into_iter()
            .find(|d| pred(d)))
    }

    fn filter<T, F>(&self, name: &str, pred: F) -> Result<Vec<T>>
    where
        T: DeserializeOwned,
        F: Fn(&T) -> bool,
    {
        let _guard = self.guard()?;
        Ok(self
            .read_collection::<T>(name)?
            .into_iter()
            .filter(|d| pred(d))
            .collect())
    }
}

impl Storage for DocumentStorage {
    fn save_user(&self, user: &User) -> Result<()> {
        let _guard = self.guard()?;
        let users: Vec<User> = self.read_collection(USERS)?;
        for other in users.iter().filter(|u| u.id != user.id) {
            if other.email == user.email {
                bail!("duplicate key: users.email {}", user.email);
            }
            if user.google_id.is_some() && other.google_id == user.google_id {
                bail!("duplicate key: users.google_id");
            }
        }
        self.upsert(USERS, user, |u: &User| u.id == user.id)
    }

    fn load_user(&self, id: &str) -> Result<Option<User>> {
        self.find(USERS, |u: &User| u.id == id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find(USERS, |u: &User| u.email == email)
    }

    fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        self.find(USERS, |u: &User| u.google_id.as_deref() == Some(google_id))
    }

    fn save_plan(&self, plan: &WorkoutPlan) -> Result<()> {
        let _guard = self.guard()?;
        self.upsert(PLANS, plan, |p: &WorkoutPlan| p.id == plan.id)
    }

    fn load_plan(&self, id: &str) -> Result<Option<WorkoutPlan>> {
        self.find(PLANS, |p: &WorkoutPlan| p.id == id)
    }

    fn list_plans(&self, user_id: &str, filter: &PlanFilter) -> Result<Vec<WorkoutPlan>> {
        let mut plans = self.filter(PLANS, |p: &WorkoutPlan| {
            p.is_owned_by(user_id) && filter.matches(p)
        })?;
        sort_plans(&mut plans);
        Ok(plans)
    }

    fn save_session(&self, session: &WorkoutSession) -> Result<()> {
        let _guard = self.guard()?;
        self.upsert(SESSIONS, session, |s: &WorkoutSession| s.id == session.id)
    }

    fn load_session(&self, id: &str) -> Result<Option<WorkoutSession>> {
        self.find(SESSIONS, |s: &WorkoutSession| s.id == id)
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        let mut sessions = self.filter(SESSIONS, |s: &WorkoutSession| s.is_owned_by(user_id))?;
        sort_sessions(&mut sessions);
        Ok(sessions)
    }
}
