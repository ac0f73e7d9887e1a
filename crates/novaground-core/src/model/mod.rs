// ── Domain model ──

mod actuator;

pub use actuator::{Actuator, ActuatorKind, ArmingState, OpenState, PowerState, StateChange};
