use clap::Subcommand;

use crate::cli::db_cmd::DbCmd;
use crate::cli::user_cmd::UserCmd;

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    #[command(
        about = "Database maintenance commands",
        long_about = "Prepare the configured storage backend: apply migrations, backfill missing plan levels and report the indexes in place."
    )]
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
    #[command(
        about = "User account commands",
        long_about = "Manage local FitTrack accounts without going through the web UI."
    )]
    User {
        #[command(subcommand)]
        cmd: UserCmd,
    },
}
