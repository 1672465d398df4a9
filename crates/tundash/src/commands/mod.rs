//! Command dispatch: bridges CLI args -> core Commands -> output formatting.

pub mod config_cmd;
pub mod general;
pub mod instances;
pub mod logs;
pub mod service;
pub mod status;
pub mod topology;
pub mod util;

use tundash_core::Dashboard;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    dashboard: &Dashboard,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Instances(args) => instances::handle(dashboard, args, global).await,
        Command::General(args) => general::handle(dashboard, args, global).await,
        Command::Status => status::handle_status(dashboard, global),
        Command::Diagnostics => status::handle_diagnostics(dashboard, global),
        Command::Topology => topology::handle(dashboard, global),
        Command::Logs(args) => logs::handle(dashboard, args, global).await,
        Command::Restart => service::restart(dashboard, global).await,
        Command::Reset => service::reset(dashboard, global).await,
        Command::Firewall => service::firewall(dashboard, global).await,
        // Config and Completions are handled before dispatch
        Command::Config(_) | Command::Completions(_) => Err(CliError::Internal(
            "command does not need a dashboard connection".into(),
        )),
    }
}
