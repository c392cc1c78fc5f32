pub mod wiring;

use crate::{cli, context, rest};
use anyhow::{Context as AnyhowContext, Result};
use std::path::Path;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: wiring::SharedStorage,
}

impl App {
    pub fn from_cli() -> Result<(Self, cli::Cli)> {
        let cli = crate::cli::parse();
        let ctx = context::Context::from_cli(&cli);

        crate::tracing::set_log_file(ctx.config.log_file.as_deref().map(Path::new));
        log::info!("🚀 Starting fittrack");
        log::info!("🗄️ Storage: {}", ctx.config.storage);
        log::info!("📂 Data dir: {}", ctx.config.data_dir);
        log::info!(
            "🔐 Google sign-in: {}",
            if ctx.config.google.is_some() {
                "enabled"
            } else {
                "disabled"
            }
        );

        wiring::init_data_dir(&ctx).context("initializing data dir")?;
        let storage = wiring::init_storage(&ctx)?;

        Ok((Self { ctx, storage }, cli))
    }
}

pub async fn run_daemon(app: App) -> Result<()> {
    log::info!("🌍 Public URL: {}", app.ctx.config.public_url);
    if let Some(path) = app.ctx.config.log_file.as_deref() {
        log::info!("📝 Log file: {}", path);
    }

    let shutdown = CancellationToken::new();

    let state = rest::AppState::new(
        app.storage.clone(),
        wiring::build_google(&app.ctx),
        app.ctx.config.secure_cookies(),
    )
    .context("building web state")?;
    let addr = app.ctx.config.listen;
    let web_shutdown = shutdown.clone();

    let mut web_handle = tokio::spawn(async move {
        if let Err(e) = rest::serve(addr, state, web_shutdown).await {
            log::error!("Web server error: {:#}", e);
        }
    });

    let web_result = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            log::info!("🧨 Ctrl-C received, shutting down");
            shutdown.cancel();
            web_handle.await
        }
        res = &mut web_handle => res,
    };
    shutdown.cancel();

    if let Err(e) = web_result {
        log::error!("Web server task failed: {}", e);
        return Err(e.into());
    }

    log::info!("✅ Shutdown complete");
    Ok(())
}

pub async fn run() -> Result<()> {
    let (app, cli) = App::from_cli()?;

    if let Some(cmd) = &cli.cmd {
        // one-shot command mode
        cmd.run(&app.ctx)?;
        return Ok(());
    }

    run_daemon(app).await
}
