// ── Wire-to-domain conversion ──
//
// Turns raw `ActuatorRecord`s from the catalogue endpoint into typed
// `Actuator`s. This is the single place where defaults are applied:
// open -> closed, power -> off, arming -> disarmed, positions ->
// ["1","2","3"], valve -> the second position label. Downstream code
// never sees an absent field again.

use novaground_api::ActuatorRecord;
use tracing::warn;

use crate::error::CoreError;
use crate::model::{Actuator, ActuatorKind, ArmingState, OpenState, PowerState};

const DEFAULT_POSITIONS: [&str; 3] = ["1", "2", "3"];

/// Convert one catalogue record. Unknown `type` tags are an error so
/// the caller can decide to skip-and-log rather than abort the refresh.
pub fn actuator_from_record(rec: ActuatorRecord) -> Result<Actuator, CoreError> {
    let kind = match rec.kind.as_str() {
        "servo" => ActuatorKind::Servo {
            open: parse_open(&rec.name, rec.open_state),
            power: parse_power(&rec.name, rec.power_state),
        },
        "solenoid" => ActuatorKind::Solenoid {
            open: parse_open(&rec.name, rec.open_state),
        },
        "poweredDevice" => ActuatorKind::PoweredDevice {
            power: parse_power(&rec.name, rec.power_state),
        },
        "gpioDevice" => ActuatorKind::GpioDevice {
            arming: parse_arming(&rec.name, rec.arming_state),
        },
        "poweredGpioDevice" => ActuatorKind::PoweredGpioDevice {
            arming: parse_arming(&rec.name, rec.arming_state),
            power: parse_power(&rec.name, rec.power_state),
        },
        "servo3" => {
            let positions = match rec.positions {
                Some(p) if !p.is_empty() => p,
                _ => DEFAULT_POSITIONS.map(String::from).to_vec(),
            };
            // Mid position is the resting default for a 3-way valve;
            // a single-position list falls back to its only label.
            let valve = rec
                .valve_state
                .or_else(|| positions.get(1).cloned())
                .or_else(|| positions.first().cloned())
                .unwrap_or_default();
            ActuatorKind::Servo3 {
                valve,
                positions,
                power: parse_power(&rec.name, rec.power_state),
            }
        }
        other => {
            return Err(CoreError::UnknownActuatorKind {
                name: rec.name,
                kind: other.to_owned(),
            });
        }
    };

    Ok(Actuator { name: rec.name, kind })
}

// Absent fields take the safe default; unrecognized values do too, with
// a warning, so one misbehaving record cannot brick the catalogue.

fn parse_open(name: &str, raw: Option<String>) -> OpenState {
    match raw.as_deref() {
        Some("open") => OpenState::Open,
        Some("closed") | None => OpenState::Closed,
        Some(other) => {
            warn!(name, value = other, "unrecognized openState, defaulting to closed");
            OpenState::Closed
        }
    }
}

fn parse_power(name: &str, raw: Option<String>) -> PowerState {
    match raw.as_deref() {
        Some("on") => PowerState::On,
        Some("off") | None => PowerState::Off,
        Some(other) => {
            warn!(name, value = other, "unrecognized powerState, defaulting to off");
            PowerState::Off
        }
    }
}

fn parse_arming(name: &str, raw: Option<String>) -> ArmingState {
    match raw.as_deref() {
        Some("armed") => ArmingState::Armed,
        Some("disarmed") | None => ArmingState::Disarmed,
        Some(other) => {
            warn!(name, value = other, "unrecognized armingState, defaulting to disarmed");
            ArmingState::Disarmed
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
