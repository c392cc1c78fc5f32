use crate::cli::Command;
use crate::context;

pub mod db;
pub mod user;

pub trait CommandRunner {
    fn run(&self, ctx: &context::Context) -> anyhow::Result<()>;
}

impl Command {
    pub fn run(&self, ctx: &context::Context) -> anyhow::Result<()> {
        match self {
            Command::Db { cmd } => cmd.run(ctx),
            Command::User { cmd } => cmd.run(ctx),
        }
    }
}
