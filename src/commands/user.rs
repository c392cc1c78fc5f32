use std::io::IsTerminal;

use super::CommandRunner;
use crate::app::wiring;
use crate::auth::local;
use crate::cli;
use crate::configuration::StorageBackend;
use crate::context;
use anyhow::{bail, Context, Result};

/// Reads a password twice from the terminal.
fn prompt_password() -> Result<String> {
    if !std::io::stdin().is_terminal() {
        bail!("no password given and stdin is not a terminal; pass --password");
    }
    let p1 = rpassword::prompt_password("Password: ").context("read password")?;
    let p2 = rpassword::prompt_password("Confirm password: ").context("confirm password")?;
    if p1 != p2 {
        bail!("passwords do not match");
    }
    Ok(p1)
}

impl CommandRunner for cli::UserCmd {
    fn run(&self, ctx: &context::Context) -> Result<()> {
        match self {
            cli::UserCmd::Add {
                email,
                username,
                password,
            } => {
                if ctx.config.storage == StorageBackend::Memory {
                    log::warn!("memory storage: the account is discarded when this command exits");
                }
                let password = match password {
                    Some(p) => p.clone(),
                    None => prompt_password()?,
                };
                let storage = wiring::init_storage(ctx)?;
                let user = local::register(
                    &storage,
                    email,
                    username.as_deref().unwrap_or_default(),
                    &password,
                )
                .context("creating user")?;
                println!("{}", user.id);
                Ok(())
            }
        }
    }
}
