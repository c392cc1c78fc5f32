use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use std::{path::Path, str::FromStr};

use super::{traits::Storage, SetupReport};
use crate::types::{FitnessLevel, PlanFilter, User, WorkoutPlan, WorkoutSession};

const DB_SCHEMA_VERSION: i64 = 2;

const USER_COLUMNS: &str = "id, email, username, google_id, password_hash, created_at";
const PLAN_COLUMNS: &str = "id, name, user_id, exercises, level, created_at";
const SESSION_COLUMNS: &str =
    "id, plan_id, user_id, start_time, end_time, exercises_completed, notes";

#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
}

fn conversion_error(
    idx: usize,
    ty: Type,
    err: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

// Fixed-width UTC timestamps keep text ordering equal to time ordering.
fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn decode_time(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|err| conversion_error(idx, Type::Text, err))
}

fn decode_json<T: serde::de::DeserializeOwned>(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|err| conversion_error(idx, Type::Text, err))
}

fn encode_json<T: serde::Serialize>(value: &T) -> rusqlite::Result<String> {
    serde_json::to_string(value).map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))
}

fn map_user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        google_id: row.get(3)?,
        password_hash: row.get(4)?,
        created_at: decode_time(row, 5)?,
    })
}

fn map_plan_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkoutPlan> {
    let level_str: String = row.get(4)?;
    let level = FitnessLevel::from_str(&level_str)
        .map_err(|err| conversion_error(4, Type::Text, err))?;
    Ok(WorkoutPlan {
        id: row.get(0)?,
        name: row.get(1)?,
        user_id: row.get(2)?,
        exercises: decode_json(row, 3)?,
        level,
        created_at: decode_time(row, 5)?,
    })
}

fn map_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<WorkoutSession> {
    let end_time = match row.get::<_, Option<String>>(4)? {
        Some(_) => Some(decode_time(row, 4)?),
        None => None,
    };
    Ok(WorkoutSession {
        id: row.get(0)?,
        plan_id: row.get(1)?,
        user_id: row.get(2)?,
        start_time: decode_time(row, 3)?,
        end_time,
        exercises_completed: decode_json(row, 5)?,
        notes: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
    })
}

fn db_save_user(conn: &Connection, user: &User) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, username, google_id, password_hash, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET email=excluded.email, username=excluded.username,
                    google_id=excluded.google_id, password_hash=excluded.password_hash",
        params![
            user.id,
            user.email,
            user.username,
            user.google_id,
            user.password_hash,
            encode_time(&user.created_at)
        ],
    )?;
    Ok(())
}

fn db_find_user(conn: &Connection, column: &str, value: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
        params![value],
        map_user_row,
    )
    .optional()
}

fn db_save_plan(conn: &Connection, plan: &WorkoutPlan) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO workout_plans (id, name, user_id, exercises, level, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(id) DO UPDATE SET name=excluded.name, exercises=excluded.exercises,
                    level=excluded.level",
        params![
            plan.id,
            plan.name,
            plan.user_id,
            encode_json(&plan.exercises)?,
            plan.level.as_str(),
            encode_time(&plan.created_at)
        ],
    )?;
    Ok(())
}

fn db_load_plan(conn: &Connection, id: &str) -> rusqlite::Result<Option<WorkoutPlan>> {
    conn.query_row(
        &format!("SELECT {PLAN_COLUMNS} FROM workout_plans WHERE id = ?1"),
        params![id],
        map_plan_row,
    )
    .optional()
}

fn db_list_plans(
    conn: &Connection,
    user_id: &str,
    filter: &PlanFilter,
) -> rusqlite::Result<Vec<WorkoutPlan>> {
    let plans = match filter.level {
        Some(level) => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM workout_plans
                 WHERE user_id = ?1 AND level = ?2
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id, level.as_str()], map_plan_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
        None => {
            let mut stmt = conn.prepare(&format!(
                "SELECT {PLAN_COLUMNS} FROM workout_plans
                 WHERE user_id = ?1
                 ORDER BY created_at DESC"
            ))?;
            let rows = stmt
                .query_map(params![user_id], map_plan_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        }
    };
    Ok(plans)
}

fn db_save_session(conn: &Connection, session: &WorkoutSession) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO workout_sessions
                    (id, plan_id, user_id, start_time, end_time, exercises_completed, notes)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT(id) DO UPDATE SET end_time=excluded.end_time,
                    exercises_completed=excluded.exercises_completed, notes=excluded.notes",
        params![
            session.id,
            session.plan_id,
            session.user_id,
            encode_time(&session.start_time),
            session.end_time.as_ref().map(encode_time),
            encode_json(&session.exercises_completed)?,
            session.notes
        ],
    )?;
    Ok(())
}

fn db_load_session(conn: &Connection, id: &str) -> rusqlite::Result<Option<WorkoutSession>> {
    conn.query_row(
        &format!("SELECT {SESSION_COLUMNS} FROM workout_sessions WHERE id = ?1"),
        params![id],
        map_session_row,
    )
    .optional()
}

fn db_list_sessions(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<WorkoutSession>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SESSION_COLUMNS} FROM workout_sessions
         WHERE user_id = ?1
         ORDER BY start_time DESC"
    ))?;
    let rows = stmt
        .query_map(params![user_id], map_session_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_list_indexes(conn: &Connection) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'index' AND name NOT LIKE 'sqlite_autoindex_%'
         ORDER BY name",
    )?;
    let rows = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(rows)
}

const CREATE_INDEXES: &str = r#"
    CREATE INDEX IF NOT EXISTS user_level_created_idx
        ON workout_plans(user_id, level, created_at DESC);
    CREATE INDEX IF NOT EXISTS sessions_user_start_idx
        ON workout_sessions(user_id, start_time DESC);
"#;

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
        }
    }

    pub fn reset_all(&self) -> Result<()> {
        if !std::path::Path::new(&self.path).exists() {
            return Ok(());
        }
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    pub fn init(&self) -> Result<()> {
        self.with_conn(|_conn| Ok(()))?;
        Ok(())
    }

    /// Backfills plan levels, makes sure indexes exist and reports what is there.
    ///
    /// `backfilled` counts levels filled in by this run, whether by the schema
    /// migration or by the explicit update. A database migrated earlier by any
    /// other access reports 0.
    pub fn setup(&self) -> Result<SetupReport> {
        let (conn, migrated) = self.open()?;
        let updated = conn.execute(
            "UPDATE workout_plans SET level = 'unspecified' WHERE level IS NULL OR level = ''",
            [],
        )?;
        conn.execute_batch(CREATE_INDEXES)?;
        let plans: i64 =
            conn.query_row("SELECT COUNT(*) FROM workout_plans", [], |row| row.get(0))?;
        Ok(SetupReport {
            plans: plans as usize,
            backfilled: migrated + updated,
            indexes: db_list_indexes(&conn)?,
        })
    }

    /// Opens a migrated connection and the number of plan levels the migration backfilled.
    fn open(&self) -> rusqlite::Result<(Connection, usize)> {
        let conn = Connection::open(&self.path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(std::time::Duration::from_millis(500))?;

        let migrated = Self::migrate(&conn)?;
        Ok((conn, migrated))
    }

    fn with_conn<F, T>(&self, f: F) -> rusqlite::Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let (conn, _) = self.open()?;
        f(&conn)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<usize> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(0);
        }

        log::info!(
            "SQLite schema migration: {} -> {}",
            version,
            DB_SCHEMA_VERSION
        );

        if version == 0 {
            conn.execute_batch(
                r#"
            CREATE TABLE users (
                id TEXT PRIMARY KEY,
                email TEXT NOT NULL,
                username TEXT NOT NULL,
                google_id TEXT,
                password_hash TEXT,
                created_at TEXT NOT NULL
            );
            CREATE UNIQUE INDEX users_email_idx ON users(email);
            CREATE UNIQUE INDEX users_google_id_idx
                ON users(google_id)
                WHERE google_id IS NOT NULL;
            CREATE TABLE workout_plans (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                exercises TEXT NOT NULL DEFAULT '[]',
                level TEXT NOT NULL DEFAULT 'unspecified',
                created_at TEXT NOT NULL
            );
            CREATE TABLE workout_sessions (
                id TEXT PRIMARY KEY,
                plan_id TEXT NOT NULL REFERENCES workout_plans(id),
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                start_time TEXT NOT NULL,
                end_time TEXT,
                exercises_completed TEXT NOT NULL DEFAULT '[]',
                notes TEXT DEFAULT ''
            );
        "#,
            )?;
            conn.execute_batch(CREATE_INDEXES)?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            return Ok(0);
        }

        if version == 1 {
            conn.execute_batch(
                r#"
            ALTER TABLE workout_plans ADD COLUMN level TEXT NOT NULL DEFAULT 'unspecified';
            "#,
            )?;
            let backfilled: i64 =
                conn.query_row("SELECT COUNT(*) FROM workout_plans", [], |row| row.get(0))?;
            conn.execute_batch(CREATE_INDEXES)?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            log::info!("SQLite migration set level on {} existing plans", backfilled);
            return Ok(backfilled as usize);
        }

        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
            Some("database schema version mismatch; please run with --reset option".to_string()),
        ))
    }
}

impl Storage for SqliteStorage {
    fn save_user(&self, user: &User) -> Result<()> {
        self.with_conn(|conn| db_save_user(conn, user))?;
        Ok(())
    }

    fn load_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.with_conn(|conn| db_find_user(conn, "id", id))?)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.with_conn(|conn| db_find_user(conn, "email", email))?)
    }

    fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
        Ok(self.with_conn(|conn| db_find_user(conn, "google_id", google_id))?)
    }

    fn save_plan(&self, plan: &WorkoutPlan) -> Result<()> {
        self.with_conn(|conn| db_save_plan(conn, plan))?;
        Ok(())
    }

    fn load_plan(&self, id: &str) -> Result<Option<WorkoutPlan>> {
        Ok(self.with_conn(|conn| db_load_plan(conn, id))?)
    }

    fn list_plans(&self, user_id: &str, filter: &PlanFilter) -> Result<Vec<WorkoutPlan>> {
        Ok(self.with_conn(|conn| db_list_plans(conn, user_id, filter))?)
    }

    fn save_session(&self, session: &WorkoutSession) -> Result<()> {
        self.with_conn(|conn| db_save_session(conn, session))?;
        Ok(())
    }

    fn load_session(&self, id: &str) -> Result<Option<WorkoutSession>> {
        Ok(self.with_conn(|conn| db_load_session(conn, id))?)
    }

    fn list_sessions(&self, user_id: &str) -> Result<Vec<WorkoutSession>> {
        Ok(self.with_conn(|conn| db_list_sessions(conn, user_id))?)
    }
}
