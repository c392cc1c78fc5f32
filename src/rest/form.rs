use std::str::FromStr;

use crate::types::finite_or_zero;

/// An `application/x-www-form-urlencoded` body that keeps repeated keys.
#[derive(Clone, Debug, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(body: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(body).into_owned().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Parsed value, or `default` when the field is missing or malformed.
    pub fn get_or<T: FromStr>(&self, name: &str, default: T) -> T {
        self.get(name)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(default)
    }

    /// Like [`FormData::get_or`] for weights; NaN and infinities become zero.
    pub fn get_weight(&self, name: &str, default: f64) -> f64 {
        finite_or_zero(self.get_or(name, default))
    }
}
