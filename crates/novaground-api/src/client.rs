// Controller HTTP client
//
// Wraps `reqwest::Client` with the controller's URL layout and response
// conventions: the actuator catalogue, the single command endpoint, and
// the auxiliary config/logging/calibration endpoints whose JSON results
// are passed through opaquely for the caller to log.

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{ActuatorRecord, CommandRequest};

/// HTTP client for the test-stand controller.
///
/// All methods hit a single base URL (e.g. `http://192.168.0.1:8000`).
/// The command endpoint treats exactly HTTP 200 as success; every other
/// status, and any transport failure, surfaces as an error so callers
/// never mutate local state on an unconfirmed command.
pub struct DeviceClient {
    http: reqwest::Client,
    base_url: Url,
}

impl DeviceClient {
    /// Create a new client from a `TransportConfig`.
    pub fn new(base_url: Url, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self { http, base_url })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    ///
    /// Used by tests that point at a mock server.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Derive the WebSocket telemetry URL from the base URL
    /// (`http://host:port` becomes `ws://host:port/ws_basic`).
    pub fn telemetry_url(&self) -> Result<Url, Error> {
        let scheme = if self.base_url.scheme() == "https" { "wss" } else { "ws" };
        let host = self
            .base_url
            .host_str()
            .ok_or(Error::InvalidUrl(url::ParseError::EmptyHost))?;
        let full = match self.base_url.port() {
            Some(port) => format!("{scheme}://{host}:{port}/ws_basic"),
            None => format!("{scheme}://{host}/ws_basic"),
        };
        Ok(Url::parse(&full)?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, Error> {
        Ok(self.base_url.join(path)?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    /// Send a GET request and deserialize the JSON body.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &'static str,
    ) -> Result<T, Error> {
        let url = self.endpoint(path)?;
        debug!("GET {}", url);

        let resp = self.http.get(url).send().await?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::UnexpectedStatus { endpoint: path, status });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    // ── Actuator catalogue ───────────────────────────────────────────

    /// Fetch the full actuator catalogue from `GET /get_actuators`.
    ///
    /// Records come back with only the fields meaningful for each type;
    /// the core crate applies defaults when it ingests them.
    pub async fn get_actuators(&self) -> Result<Vec<ActuatorRecord>, Error> {
        self.get_json("/get_actuators").await
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Send one actuator command via `POST /send_command`.
    ///
    /// Exactly HTTP 200 means the controller confirmed the command.
    /// Any other status is a rejection; a transport failure means the
    /// command may or may not have reached the device (no retry here --
    /// the caller's shadow state stays untouched either way).
    pub async fn send_command(&self, cmd: &CommandRequest) -> Result<(), Error> {
        let url = self.endpoint("/send_command")?;
        debug!(kind = %cmd.kind, name = %cmd.name, state = %cmd.state, "POST {}", url);

        let resp = self.http.post(url).json(cmd).send().await?;
        let status = resp.status().as_u16();
        if status == 200 {
            Ok(())
        } else {
            Err(Error::CommandFailed { status })
        }
    }

    // ── Auxiliary endpoints (opaque pass-through) ────────────────────

    /// Ask the controller to re-read its configuration.
    /// The JSON result is informational only.
    pub async fn update_config(&self) -> Result<serde_json::Value, Error> {
        self.get_json("/update_config").await
    }

    /// Start on-controller data logging.
    pub async fn start_saving_data(&self) -> Result<serde_json::Value, Error> {
        self.get_json("/start_saving_data").await
    }

    /// Stop on-controller data logging. Retrieving the produced file is
    /// left to external tooling.
    pub async fn stop_saving_data(&self) -> Result<serde_json::Value, Error> {
        self.get_json("/stop_saving_data").await
    }

    /// Toggle between calibrated and raw sensor values.
    pub async fn toggle_calibration(&self, calibration: bool) -> Result<serde_json::Value, Error> {
        let url = self.endpoint("/toggle_calibration")?;
        debug!(calibration, "POST {}", url);

        let resp = self
            .http
            .post(url)
            .json(&serde_json::json!({ "calibration": calibration }))
            .send()
            .await?;
        let status = resp.status().as_u16();
        if status != 200 {
            return Err(Error::UnexpectedStatus { endpoint: "/toggle_calibration", status });
        }

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }
}
