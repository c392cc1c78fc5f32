mod args;
mod command;
mod db_cmd;
mod user_cmd;

pub use args::Cli;
pub use command::Command;
pub use db_cmd::DbCmd;
pub use user_cmd::UserCmd;

pub use args::parse;
