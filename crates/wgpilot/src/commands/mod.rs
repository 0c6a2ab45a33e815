//! Command dispatch.

pub mod peers;
pub mod session;
pub mod watch;

use std::sync::Arc;

use wgpilot_config::Settings;
use wgpilot_core::SessionStore;

use crate::cli::{Command, GlobalOpts};
use crate::config;
use crate::error::CliError;

pub async fn dispatch(
    cmd: Command,
    global: &GlobalOpts,
    settings: &Settings,
    store: Arc<SessionStore>,
) -> Result<(), CliError> {
    let connect = || config::build_client(global, settings, Arc::clone(&store), None);

    match cmd {
        Command::Login => session::login(global, settings, Arc::clone(&store)).await,
        Command::Status { verify: false } => session::status(global, &store),
        Command::Status { verify: true } => session::verify(&connect()?, global).await,
        Command::Logout => session::logout(&connect()?, global).await,
        Command::Info => session::info(&connect()?, global).await,
        Command::Peers(args) => peers::handle(&connect()?, args, global, settings).await,
        Command::Watch(args) => watch::handle(connect()?, &args, global, settings).await,
    }
}
