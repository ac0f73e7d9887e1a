//! Wire types for the controller's JSON surfaces.
//!
//! These mirror exactly what the device sends and accepts. Fields the
//! device may omit are `Option` here; defaulting and validation happen
//! once, at ingestion, in `novaground-core`.

use serde::{Deserialize, Serialize};

// ── Telemetry (read path) ────────────────────────────────────────────

/// A sensor value as transmitted: numeric for most channels, but some
/// producers send opaque strings (status words, fault codes).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SensorValue {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for SensorValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// One sensor reading inside a telemetry frame. Entirely replaced on
/// each frame -- nothing here persists across frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub name: String,
    pub value: SensorValue,

    /// Rolling average, producer-computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avg: Option<f64>,

    /// Rate of change, producer-computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate: Option<f64>,

    /// Producer-side capture time, Unix epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
}

/// One GPIO reading inside a telemetry frame. The state string is
/// device-defined and passed through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpioReading {
    pub name: String,
    pub state: String,
}

/// A full telemetry frame. Either top-level key may be absent; absence
/// is reported per-section by the channel, never fatal.
#[derive(Debug, Clone, Deserialize)]
pub struct TelemetryFrame {
    #[serde(default)]
    pub sensors: Option<Vec<SensorReading>>,
    #[serde(default)]
    pub gpios: Option<Vec<GpioReading>>,
}

// ── Actuator catalogue (read path) ───────────────────────────────────

/// Raw actuator object from `GET /get_actuators`.
///
/// Every state field is optional on the wire; the device only sends the
/// ones meaningful for the actuator's type, and may omit even those on
/// first boot.
#[derive(Debug, Clone, Deserialize)]
pub struct ActuatorRecord {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, rename = "openState")]
    pub open_state: Option<String>,

    #[serde(default, rename = "powerState")]
    pub power_state: Option<String>,

    #[serde(default, rename = "armingState")]
    pub arming_state: Option<String>,

    #[serde(default, rename = "valveState")]
    pub valve_state: Option<String>,

    #[serde(default)]
    pub positions: Option<Vec<String>>,
}

// ── Commands (write path) ────────────────────────────────────────────

/// Body for `POST /send_command`. The `state` string is the desired new
/// value for whichever field the actuator type toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandRequest {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    pub state: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensor_value_accepts_numbers_and_strings() {
        let n: SensorValue = serde_json::from_str("42.5").expect("number");
        assert_eq!(n, SensorValue::Number(42.5));

        let s: SensorValue = serde_json::from_str("\"FAULT\"").expect("string");
        assert_eq!(s, SensorValue::Text("FAULT".into()));
    }

    #[test]
    fn frame_tolerates_missing_sections() {
        let frame: TelemetryFrame =
            serde_json::from_str(r#"{"gpios":[{"name":"g1","state":"high"}]}"#).expect("frame");
        assert!(frame.sensors.is_none());
        assert_eq!(frame.gpios.as_deref(), Some(&[GpioReading { name: "g1".into(), state: "high".into() }][..]));
    }

    #[test]
    fn actuator_record_with_sparse_fields() {
        let rec: ActuatorRecord =
            serde_json::from_str(r#"{"name":"mv1","type":"servo"}"#).expect("record");
        assert_eq!(rec.name, "mv1");
        assert_eq!(rec.kind, "servo");
        assert!(rec.open_state.is_none());
        assert!(rec.power_state.is_none());
    }

    #[test]
    fn command_request_wire_shape() {
        let cmd = CommandRequest {
            kind: "servo3".into(),
            name: "valve1".into(),
            state: "2".into(),
        };
        let json = serde_json::to_value(&cmd).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"type": "servo3", "name": "valve1", "state": "2"})
        );
    }
}
