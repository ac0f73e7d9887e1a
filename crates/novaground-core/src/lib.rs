// novaground-core: state synchronization layer between novaground-api
// and consumers (CLI / future UIs). Owns the actuator shadow, command
// dispatch discipline, and the panel session lifecycle.

pub mod config;
pub mod convert;
pub mod dispatch;
pub mod error;
pub mod model;
pub mod panel;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::PanelConfig;
pub use dispatch::{Dispatcher, Intent, IntentAction, LockGate};
pub use error::CoreError;
pub use panel::Panel;
pub use store::ShadowStore;

// Re-export model types at the crate root for ergonomics.
pub use model::{Actuator, ActuatorKind, ArmingState, OpenState, PowerState, StateChange};

// Telemetry observations pass through unchanged from the api crate.
pub use novaground_api::{
    GpioReading, LinkState, ReconnectPolicy, SensorReading, SensorValue, TelemetryEvent,
};
