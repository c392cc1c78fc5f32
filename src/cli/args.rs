use clap::Parser;
use std::env;

use crate::cli::command::Command;
use crate::configuration::StorageBackend;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "FitTrack: plan workouts, track sets and follow your progress",
    long_about = "A small fitness-tracking web application. Serves the FitTrack web UI with local and Google sign-in, or runs one-shot maintenance commands.",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    #[arg(
        long,
        env = "FITTRACK_DATA_DIR",
        default_value = ".fittrack/",
        value_name = "DIR",
        help = "Directory to store persistent data"
    )]
    pub data_dir: String,

    #[arg(
        long,
        env = "FITTRACK_STORAGE",
        value_enum,
        default_value_t = StorageBackend::Sqlite,
        value_name = "BACKEND",
        help = "Storage backend for users, plans and sessions"
    )]
    pub storage: StorageBackend,

    #[arg(
        long,
        default_value_t = false,
        help = "Reset all persisted state before starting"
    )]
    pub reset: bool,

    #[arg(
        long = "log-file",
        env = "FITTRACK_LOG_FILE",
        value_name = "PATH",
        help = "Write logs to PATH (in addition to stderr)"
    )]
    pub log_file: Option<String>,

    #[arg(
        long,
        env = "FITTRACK_LISTEN",
        value_name = "ADDR",
        default_value = "127.0.0.1:5000",
        help = "Web server listen address (host:port)"
    )]
    pub listen: std::net::SocketAddr,

    #[arg(
        long = "public-url",
        env = "FITTRACK_PUBLIC_URL",
        value_name = "URL",
        help = "Externally visible base URL, used for the OAuth redirect (defaults to http://<listen>)"
    )]
    pub public_url: Option<String>,

    #[arg(
        long = "google-client-id",
        env = "GOOGLE_OAUTH_CLIENT_ID",
        value_name = "ID",
        help = "Google OAuth client id"
    )]
    pub google_client_id: Option<String>,

    #[arg(
        long = "google-client-secret",
        env = "GOOGLE_OAUTH_CLIENT_SECRET",
        value_name = "SECRET",
        hide_env_values = true,
        help = "Google OAuth client secret"
    )]
    pub google_client_secret: Option<String>,

    #[command(subcommand)]
    pub cmd: Option<Command>,
}

pub fn parse() -> Cli {
    let dotenv_path = env::var("DOTENV_PATH").unwrap_or(".env".into());
    dotenvy::from_filename(&dotenv_path).ok();

    println!("Loaded env from {}", dotenv_path);
    Cli::parse()
}
