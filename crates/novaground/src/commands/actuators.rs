//! Actuator listing.

use tabled::Tabled;

use novaground_core::{Actuator, ActuatorKind};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Tabled)]
struct ActuatorRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Power")]
    power: String,
}

impl From<&Actuator> for ActuatorRow {
    fn from(actuator: &Actuator) -> Self {
        Self {
            name: actuator.name.clone(),
            kind: actuator.kind.tag().to_owned(),
            state: primary_state(&actuator.kind),
            power: actuator
                .kind
                .power()
                .map_or_else(|| "-".into(), |p| p.to_string()),
        }
    }
}

/// The actuator's main field rendered for the State column; the power
/// gate gets its own column.
fn primary_state(kind: &ActuatorKind) -> String {
    match kind {
        ActuatorKind::Servo { open, .. } | ActuatorKind::Solenoid { open } => open.to_string(),
        ActuatorKind::GpioDevice { arming } | ActuatorKind::PoweredGpioDevice { arming, .. } => {
            arming.to_string()
        }
        ActuatorKind::PoweredDevice { .. } => "-".into(),
        ActuatorKind::Servo3 {
            valve, positions, ..
        } => format!("{valve} (of {})", positions.join("/")),
    }
}

pub async fn list(global: &GlobalOpts) -> Result<(), CliError> {
    let panel = util::build_panel(global)?;
    panel.refresh_actuators().await?;

    let snapshot = panel.store().actuators_snapshot();
    let rendered = output::render_list(
        &global.output,
        snapshot.as_ref(),
        |a| ActuatorRow::from(a),
        |a| a.name.clone(),
    );
    output::print_output(&rendered, global.quiet);
    Ok(())
}
