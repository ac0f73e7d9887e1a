//! One-shot command dispatch.

use tracing::debug;

use novaground_core::{Intent, IntentAction};

use crate::cli::{GlobalOpts, SendAction, SendArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn send(global: &GlobalOpts, args: SendArgs) -> Result<(), CliError> {
    let panel = util::build_panel(global)?;
    // The dispatcher derives toggle targets from the shadow, so the
    // catalogue must be current before the command is planned.
    panel.refresh_actuators().await?;

    let action = match args.action {
        SendAction::Open => IntentAction::ToggleOpen,
        SendAction::Arm => IntentAction::ToggleArming,
        SendAction::Power => IntentAction::TogglePower,
        SendAction::Valve { position } => IntentAction::SelectValve(position),
    };

    debug!(name = %args.name, ?action, "dispatching intent");
    let change = panel.dispatch(Intent::new(args.name.clone(), action)).await?;
    let updated = panel
        .store()
        .actuator(&args.name)
        .ok_or(CliError::ActuatorNotFound { name: args.name })?;

    let rendered = output::render_single(&global.output, &updated, |a| {
        format!("{} -> {change}", a.name)
    });
    output::print_output(&rendered, global.quiet);
    Ok(())
}
