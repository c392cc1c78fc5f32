use super::CommandRunner;
use crate::app::wiring;
use crate::cli;
use crate::configuration::StorageBackend;
use crate::context;
use anyhow::{Context, Result};

impl CommandRunner for cli::DbCmd {
    fn run(&self, ctx: &context::Context) -> Result<()> {
        match self {
            cli::DbCmd::Setup => {
                if ctx.config.storage == StorageBackend::Memory {
                    log::warn!("memory storage keeps nothing between runs; nothing to set up");
                    return Ok(());
                }
                let report = wiring::setup_storage(ctx).context("running db setup")?;
                log::info!(
                    "🗄️ {} storage ready: {} plans, {} backfilled with level 'unspecified'",
                    ctx.config.storage,
                    report.plans,
                    report.backfilled
                );
                for index in &report.indexes {
                    println!("{index}");
                }
                Ok(())
            }
        }
    }
}
