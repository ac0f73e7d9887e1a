//! Command handlers, one module per top-level subcommand.

mod actuators;
mod controller;
mod send;
mod util;
mod watch;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let global = cli.global;
    match cli.command {
        Command::Actuators => actuators::list(&global).await,
        Command::Send(args) => send::send(&global, args).await,
        Command::Watch(args) => watch::watch(&global, args).await,
        Command::ConfigReload => controller::config_reload(&global).await,
        Command::Logging(args) => controller::logging(&global, args.command).await,
        Command::Calibration(args) => controller::calibration(&global, args.command).await,
    }
}
