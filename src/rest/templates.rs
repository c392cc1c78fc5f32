use anyhow::{Context, Result};
use axum::response::Html;
use minijinja::Environment;
use serde::Serialize;

use crate::types::exercise;

const TEMPLATES: [(&str, &str); 7] = [
    ("base.html", include_str!("../../templates/base.html")),
    ("index.html", include_str!("../../templates/index.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("workout_plan.html", include_str!("../../templates/workout_plan.html")),
    (
        "exercise_library.html",
        include_str!("../../templates/exercise_library.html"),
    ),
    (
        "track_workout.html",
        include_str!("../../templates/track_workout.html"),
    ),
    ("progress.html", include_str!("../../templates/progress.html")),
];

fn exercise_name(key: String) -> String {
    exercise::display_name(&key).to_string()
}

/// Date part of an RFC 3339 timestamp.
fn day(value: Option<String>) -> String {
    value
        .map(|v| v.chars().take(10).collect())
        .unwrap_or_default()
}

pub struct Templates {
    env: Environment<'static>,
}

impl Templates {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (name, source) in TEMPLATES {
            env.add_template(name, source)
                .with_context(|| format!("compiling template {name}"))?;
        }
        env.add_filter("exercise_name", exercise_name);
        env.add_filter("day", day);
        Ok(Self { env })
    }

    pub fn render<C: Serialize>(&self, name: &str, ctx: C) -> Result<Html<String>> {
        let html = self
            .env
            .get_template(name)
            .with_context(|| format!("loading template {name}"))?
            .render(ctx)
            .with_context(|| format!("rendering template {name}"))?;
        Ok(Html(html))
    }
}
