use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use rand::{rngs::OsRng, RngCore};

pub const LOGIN_TTL: Duration = Duration::from_secs(24 * 60 * 60);
pub const OAUTH_STATE_TTL: Duration = Duration::from_secs(10 * 60);

fn random_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

struct Login {
    user_id: String,
    issued_at: Instant,
}

#[derive(Default)]
struct Inner {
    logins: HashMap<String, Login>,
    oauth_states: HashMap<String, Instant>,
}

/// Login sessions and pending OAuth states, held in memory.
///
/// Entries expire after their TTL. Expired entries are dropped whenever a new
/// one is issued, so abandoned logins and OAuth round trips do not accumulate.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<Inner>>,
    login_ttl: Duration,
    oauth_state_ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttls(LOGIN_TTL, OAUTH_STATE_TTL)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttls(login_ttl: Duration, oauth_state_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
            login_ttl,
            oauth_state_ttl,
        }
    }

    /// Starts a login session and returns its cookie token.
    pub fn login(&self, user_id: &str) -> Result<String> {
        let token = random_token();
        let now = Instant::now();
        let mut inner = self
            .inner
            .write()
            .map_err(|_| anyhow!("session store lock poisoned"))?;
        let ttl = self.login_ttl;
        inner
            .logins
            .retain(|_, login| now.duration_since(login.issued_at) < ttl);
        inner.logins.insert(
            token.clone(),
            Login {
                user_id: user_id.to_string(),
                issued_at: now,
            },
        );
        Ok(token)
    }

    pub fn user_id(&self, token: &str) -> Option<String> {
        let inner = self.inner.read().ok()?;
        inner
            .logins
            .get(token)
            .filter(|login| login.issued_at.elapsed() < self.login_ttl)
            .map(|login| login.user_id.clone())
    }

    pub fn logout(&self, token: &str) {
        if let Ok(mut inner) = self.inner.write() {
            inner.logins.remove(token);
        }
    }

    pub fn issue_oauth_state(&self) -> String {
        let state = random_token();
        let now = Instant::now();
        if let Ok(mut inner) = self.inner.write() {
            let ttl = self.oauth_state_ttl;
            inner
                .oauth_states
                .retain(|_, issued_at| now.duration_since(*issued_at) < ttl);
            inner.oauth_states.insert(state.clone(), now);
        }
        state
    }

    /// Consumes an OAuth state; a state is only valid once and only before it expires.
    pub fn take_oauth_state(&self, state: &str) -> bool {
        self.inner
            .write()
            .ok()
            .and_then(|mut inner| inner.oauth_states.remove(state))
            .is_some_and(|issued_at| issued_at.elapsed() < self.oauth_state_ttl)
    }

    #[cfg(test)]
    fn len(&self) -> (usize, usize) {
        self.inner
            .read()
            .map(|inner| (inner.logins.len(), inner.oauth_states.len()))
            .unwrap_or_default()
    }
}
