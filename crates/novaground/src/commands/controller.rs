//! Auxiliary controller operations: config reload, data logging,
//! calibration mode. Each prints the controller's JSON reply.

use crate::cli::{CalibrationCommand, GlobalOpts, LoggingCommand};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn config_reload(global: &GlobalOpts) -> Result<(), CliError> {
    let panel = util::build_panel(global)?;
    let reply = panel.refresh_config().await?;
    print_reply(global, &reply, "configuration reloaded");
    Ok(())
}

pub async fn logging(global: &GlobalOpts, command: LoggingCommand) -> Result<(), CliError> {
    let panel = util::build_panel(global)?;
    let (enabled, message) = match command {
        LoggingCommand::Start => (true, "data logging started"),
        LoggingCommand::Stop => (false, "data logging stopped"),
    };
    let reply = panel.set_data_logging(enabled).await?;
    print_reply(global, &reply, message);
    Ok(())
}

pub async fn calibration(global: &GlobalOpts, command: CalibrationCommand) -> Result<(), CliError> {
    let panel = util::build_panel(global)?;
    let (enabled, message) = match command {
        CalibrationCommand::On => (true, "calibration mode on"),
        CalibrationCommand::Off => (false, "calibration mode off"),
    };
    let reply = panel.set_calibration(enabled).await?;
    print_reply(global, &reply, message);
    Ok(())
}

fn print_reply(global: &GlobalOpts, reply: &serde_json::Value, message: &str) {
    let rendered = output::render_single(&global.output, reply, |_| message.to_owned());
    output::print_output(&rendered, global.quiet);
}
