use std::path::PathBuf;
use std::sync::Arc;

use crate::{
    auth::{GoogleConfig, GoogleOAuth},
    configuration::StorageBackend,
    context,
    storage::{self, SetupReport},
};
use anyhow::{Context, Result};

pub type SharedStorage = Arc<dyn storage::Storage + Send + Sync>;

const SQLITE_FILE: &str = "fittrack.sqlite";
const DOCUMENTS_DIR: &str = "documents";

pub fn init_data_dir(ctx: &context::Context) -> Result<()> {
    let data_dir = PathBuf::from(&ctx.config.data_dir);
    std::fs::create_dir_all(&data_dir)?;
    Ok(())
}

fn sqlite(ctx: &context::Context) -> storage::SqliteStorage {
    storage::SqliteStorage::new(PathBuf::from(&ctx.config.data_dir).join(SQLITE_FILE))
}

fn documents(ctx: &context::Context) -> storage::DocumentStorage {
    storage::DocumentStorage::new(PathBuf::from(&ctx.config.data_dir).join(DOCUMENTS_DIR))
}

pub fn init_storage(ctx: &context::Context) -> Result<SharedStorage> {
    match ctx.config.storage {
        StorageBackend::Memory => Ok(Arc::new(storage::MemoryStorage::new())),
        StorageBackend::Sqlite => {
            let sqlite = sqlite(ctx);
            if ctx.config.reset {
                sqlite.reset_all().context("resetting storage")?;
            }
            sqlite.init().context("initializing storage")?;
            Ok(Arc::new(sqlite))
        }
        StorageBackend::Document => {
            let docs = documents(ctx);
            if ctx.config.reset {
                docs.reset_all().context("resetting storage")?;
            }
            docs.init().context("initializing storage")?;
            Ok(Arc::new(docs))
        }
    }
}

/// Runs the one-off maintenance for the configured backend.
pub fn setup_storage(ctx: &context::Context) -> Result<SetupReport> {
    match ctx.config.storage {
        StorageBackend::Memory => Ok(SetupReport::default()),
        StorageBackend::Sqlite => sqlite(ctx).setup().context("setting up sqlite storage"),
        StorageBackend::Document => documents(ctx)
            .setup()
            .context("setting up document storage"),
    }
}

pub fn build_google(ctx: &context::Context) -> Option<GoogleOAuth> {
    ctx.config.google.as_ref().map(|creds| {
        GoogleOAuth::new(GoogleConfig::new(
            &creds.client_id,
            &creds.client_secret,
            &ctx.config.public_url,
        ))
    })
}
