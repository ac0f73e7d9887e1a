// ── Actuator domain types ──
//
// Each actuator kind carries exactly the fields that are meaningful for
// it, so "does this servo have an arming state?" is unrepresentable
// rather than a runtime question. Defaults are applied once, at
// ingestion (see `convert`), never at read time.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ── State enums ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenState {
    Open,
    Closed,
}

impl OpenState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Open => Self::Closed,
            Self::Closed => Self::Open,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
}

impl PowerState {
    pub fn toggled(self) -> Self {
        match self {
            Self::On => Self::Off,
            Self::Off => Self::On,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::On => "on",
            Self::Off => "off",
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Self::On)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArmingState {
    Armed,
    Disarmed,
}

impl ArmingState {
    pub fn toggled(self) -> Self {
        match self {
            Self::Armed => Self::Disarmed,
            Self::Disarmed => Self::Armed,
        }
    }

    pub fn as_wire(self) -> &'static str {
        match self {
            Self::Armed => "armed",
            Self::Disarmed => "disarmed",
        }
    }
}

impl std::fmt::Display for OpenState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl std::fmt::Display for PowerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

impl std::fmt::Display for ArmingState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_wire())
    }
}

// ── ActuatorKind ─────────────────────────────────────────────────────

/// The six actuator kinds and their valid fields.
///
/// Serde variant names match the wire's `type` tags exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ActuatorKind {
    /// Powered open/close valve; commands are gated on power.
    Servo { open: OpenState, power: PowerState },
    /// Relay-driven open/close valve with no power gate.
    Solenoid { open: OpenState },
    /// Bare on/off relay load.
    PoweredDevice { power: PowerState },
    /// Arm/disarm line with no power gate.
    GpioDevice { arming: ArmingState },
    /// Arm/disarm line gated on power.
    PoweredGpioDevice {
        arming: ArmingState,
        power: PowerState,
    },
    /// Multi-position valve; selecting one position deselects the rest.
    Servo3 {
        valve: String,
        positions: Vec<String>,
        power: PowerState,
    },
}

impl ActuatorKind {
    /// The wire `type` tag for command requests.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Servo { .. } => "servo",
            Self::Solenoid { .. } => "solenoid",
            Self::PoweredDevice { .. } => "poweredDevice",
            Self::GpioDevice { .. } => "gpioDevice",
            Self::PoweredGpioDevice { .. } => "poweredGpioDevice",
            Self::Servo3 { .. } => "servo3",
        }
    }

    /// Power state, for the kinds that have one.
    pub fn power(&self) -> Option<PowerState> {
        match self {
            Self::Servo { power, .. }
            | Self::PoweredDevice { power }
            | Self::PoweredGpioDevice { power, .. }
            | Self::Servo3 { power, .. } => Some(*power),
            Self::Solenoid { .. } | Self::GpioDevice { .. } => None,
        }
    }
}

// ── Actuator ─────────────────────────────────────────────────────────

/// One actuator in the shadow: the client's last-known belief about the
/// remote device's state, authoritative for rendering only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actuator {
    pub name: String,
    #[serde(flatten)]
    pub kind: ActuatorKind,
}

impl Actuator {
    /// Fold a confirmed single-field change into this actuator.
    ///
    /// Mutates exactly one field; a change that does not fit the kind
    /// is an error and leaves the actuator untouched.
    pub(crate) fn apply(&mut self, change: &StateChange) -> Result<(), CoreError> {
        match (&mut self.kind, change) {
            (
                ActuatorKind::Servo { open, .. } | ActuatorKind::Solenoid { open },
                StateChange::Open(v),
            ) => {
                *open = *v;
                Ok(())
            }
            (
                ActuatorKind::GpioDevice { arming }
                | ActuatorKind::PoweredGpioDevice { arming, .. },
                StateChange::Arming(v),
            ) => {
                *arming = *v;
                Ok(())
            }
            (
                ActuatorKind::Servo { power, .. }
                | ActuatorKind::PoweredDevice { power }
                | ActuatorKind::PoweredGpioDevice { power, .. }
                | ActuatorKind::Servo3 { power, .. },
                StateChange::Power(v),
            ) => {
                *power = *v;
                Ok(())
            }
            (ActuatorKind::Servo3 { valve, positions, .. }, StateChange::Valve(p)) => {
                if !positions.contains(p) {
                    return Err(CoreError::UnknownPosition {
                        name: self.name.clone(),
                        position: p.clone(),
                    });
                }
                *valve = p.clone();
                Ok(())
            }
            _ => Err(CoreError::StateMismatch {
                name: self.name.clone(),
            }),
        }
    }
}

// ── StateChange ──────────────────────────────────────────────────────

/// A confirmed single-field mutation: the dispatcher computes one of
/// these as the command candidate, and the shadow applies it only after
/// the controller answered success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StateChange {
    Open(OpenState),
    Arming(ArmingState),
    Power(PowerState),
    Valve(String),
}

impl StateChange {
    /// The wire `state` string carried by the command request.
    pub fn wire_value(&self) -> String {
        match self {
            Self::Open(v) => v.as_wire().to_owned(),
            Self::Arming(v) => v.as_wire().to_owned(),
            Self::Power(v) => v.as_wire().to_owned(),
            Self::Valve(p) => p.clone(),
        }
    }
}

impl std::fmt::Display for StateChange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open(_) | Self::Arming(_) | Self::Power(_) => f.write_str(&self.wire_value()),
            Self::Valve(p) => write!(f, "position {p}"),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toggles_round_trip() {
        assert_eq!(OpenState::Closed.toggled(), OpenState::Open);
        assert_eq!(OpenState::Open.toggled().toggled(), OpenState::Open);
        assert_eq!(PowerState::Off.toggled(), PowerState::On);
        assert_eq!(ArmingState::Disarmed.toggled(), ArmingState::Armed);
    }

    #[test]
    fn kind_tags_match_wire_vocabulary() {
        let kinds = [
            ActuatorKind::Servo { open: OpenState::Closed, power: PowerState::Off },
            ActuatorKind::Solenoid { open: OpenState::Closed },
            ActuatorKind::PoweredDevice { power: PowerState::Off },
            ActuatorKind::GpioDevice { arming: ArmingState::Disarmed },
            ActuatorKind::PoweredGpioDevice { arming: ArmingState::Disarmed, power: PowerState::Off },
            ActuatorKind::Servo3 { valve: "2".into(), positions: vec!["1".into(), "2".into(), "3".into()], power: PowerState::Off },
        ];
        let tags: Vec<&str> = kinds.iter().map(ActuatorKind::tag).collect();
        assert_eq!(
            tags,
            ["servo", "solenoid", "poweredDevice", "gpioDevice", "poweredGpioDevice", "servo3"]
        );

        // The serde tag must agree with `tag()` -- command requests use one,
        // JSON output the other.
        for kind in &kinds {
            let json = serde_json::to_value(kind).expect("serialize");
            assert_eq!(json["type"], kind.tag());
        }
    }

    #[test]
    fn apply_mutates_only_the_matching_field() {
        let mut act = Actuator {
            name: "mv1".into(),
            kind: ActuatorKind::Servo { open: OpenState::Closed, power: PowerState::On },
        };

        act.apply(&StateChange::Open(OpenState::Open)).expect("apply");
        assert_eq!(
            act.kind,
            ActuatorKind::Servo { open: OpenState::Open, power: PowerState::On }
        );
    }

    #[test]
    fn apply_rejects_mismatched_change() {
        let mut act = Actuator {
            name: "vent1".into(),
            kind: ActuatorKind::Solenoid { open: OpenState::Closed },
        };
        let before = act.clone();

        let err = act.apply(&StateChange::Power(PowerState::On)).expect_err("mismatch");
        assert!(matches!(err, CoreError::StateMismatch { .. }));
        assert_eq!(act, before, "failed apply must not mutate");
    }

    #[test]
    fn apply_rejects_unknown_valve_position() {
        let mut act = Actuator {
            name: "valve1".into(),
            kind: ActuatorKind::Servo3 {
                valve: "1".into(),
                positions: vec!["1".into(), "2".into(), "3".into()],
                power: PowerState::On,
            },
        };

        let err = act.apply(&StateChange::Valve("9".into())).expect_err("bad position");
        assert!(matches!(err, CoreError::UnknownPosition { .. }));
    }
}
