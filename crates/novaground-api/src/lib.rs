// novaground-api: async transport client for the test-stand controller
// (HTTP command/catalogue endpoints + WebSocket telemetry stream).

pub mod client;
pub mod error;
pub mod telemetry;
pub mod transport;
pub mod types;

pub use client::DeviceClient;
pub use error::Error;
pub use telemetry::{LinkState, ReconnectPolicy, TelemetryChannel, TelemetryEvent};
pub use transport::TransportConfig;
pub use types::{ActuatorRecord, CommandRequest, GpioReading, SensorReading, SensorValue, TelemetryFrame};
