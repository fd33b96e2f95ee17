//! Command handlers that talk to a server.

pub mod check;
pub mod config_cmd;
pub mod libraries;
pub mod ping;
pub mod snapshot;
pub mod users;
pub mod watch;

use shelfwatch_core::Coordinator;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a server command to its handler.
pub async fn dispatch(
    cmd: Command,
    coordinator: &Coordinator,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Snapshot(args) => snapshot::handle(coordinator, args, global).await,
        Command::Watch(args) => watch::handle(coordinator, args, global).await,
        Command::Libraries(args) => libraries::handle(coordinator, args, global).await,
        Command::Users(args) => users::handle(coordinator, args, global).await,
        Command::Ping => ping::handle(coordinator, global).await,
        Command::Check => check::handle(coordinator, global).await,
        // Handled in main without a server connection.
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
