//! WebSocket telemetry channel with bounded fixed-interval reconnect.
//!
//! Owns the single persistent connection to the controller's
//! `/ws_basic` endpoint, decodes framed snapshots, and broadcasts them
//! through a [`tokio::sync::broadcast`] channel. Link health is
//! observable through a [`tokio::sync::watch`] channel.
//!
//! # Example
//!
//! ```rust,ignore
//! use novaground_api::telemetry::{TelemetryChannel, ReconnectPolicy, TelemetryEvent};
//! use tokio_util::sync::CancellationToken;
//! use url::Url;
//!
//! let cancel = CancellationToken::new();
//! let ws_url = Url::parse("ws://192.168.0.1:8000/ws_basic")?;
//!
//! let channel = TelemetryChannel::new(ws_url, ReconnectPolicy::default(), cancel.clone());
//! let mut rx = channel.subscribe();
//! channel.connect();
//!
//! while let Ok(event) = rx.recv().await {
//!     if let TelemetryEvent::Sensors { readings, .. } = event {
//!         println!("{} sensor rows", readings.len());
//!     }
//! }
//!
//! channel.shutdown();
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use futures_util::StreamExt;
use tokio::sync::{broadcast, watch};
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;
use crate::types::{GpioReading, SensorReading, TelemetryFrame};

// ── Broadcast channel capacity ───────────────────────────────────────

const EVENT_CHANNEL_CAPACITY: usize = 1024;

// ── ReconnectPolicy ──────────────────────────────────────────────────

/// Fixed-interval reconnection policy.
///
/// The interval is deliberately flat rather than exponential: the
/// controller sits on a local, low-latency link, so spreading attempts
/// further apart buys nothing. Both knobs are configurable for callers
/// that disagree.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Delay between a connection ending and the next attempt. Default: 2s.
    pub interval: Duration,

    /// Reconnection attempts before the channel gives up for good.
    /// Default: 10.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the next reconnection attempt, or `None` once the
    /// attempt budget is spent. `attempts_used` counts completed
    /// `closed -> connecting` transitions since the last successful open.
    fn next_delay(&self, attempts_used: u32) -> Option<Duration> {
        (attempts_used < self.max_attempts).then_some(self.interval)
    }
}

// ── LinkState ────────────────────────────────────────────────────────

/// Observable state of the telemetry link.
///
/// Lifecycle: `Idle -> Connecting -> Open -> Closed -> Connecting -> ...`
/// ending in [`Failed`](Self::Failed) once the reconnect budget is
/// exhausted. There is no resume from `Failed`; callers build a fresh
/// channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkState {
    Idle,
    /// `attempt` is 0 for the initial connect, N for the Nth reconnect.
    Connecting { attempt: u32 },
    Open,
    Closed,
    /// Terminal: no further attempts will be made.
    Failed,
}

// ── TelemetryEvent ───────────────────────────────────────────────────

/// One decoded observation from the telemetry stream.
///
/// The sensor and GPIO sections of a frame are reported independently:
/// a frame may carry one, both, or neither, and a missing section is an
/// `Invalid*` observation rather than an error.
#[derive(Debug, Clone)]
pub enum TelemetryEvent {
    /// A full-replacement sensor snapshot. `delay_secs` is
    /// `receive_time - producer_time` from the first reading's
    /// timestamp, advisory only.
    Sensors {
        readings: Vec<SensorReading>,
        delay_secs: Option<f64>,
    },

    /// Frame decoded but carried no `sensors` key.
    InvalidSensors,

    /// A full-replacement GPIO snapshot.
    Gpios(Vec<GpioReading>),

    /// Frame decoded but carried no `gpios` key.
    InvalidGpios,

    /// Frame was not valid JSON. The channel keeps listening.
    DecodeError(String),
}

// ── TelemetryChannel ─────────────────────────────────────────────────

/// Handle to the telemetry stream.
///
/// Construct with [`new`](Self::new), then call
/// [`connect`](Self::connect) to spawn the background loop. Subscribe
/// before connecting to avoid missing the first frames.
pub struct TelemetryChannel {
    ws_url: Url,
    policy: ReconnectPolicy,
    event_tx: broadcast::Sender<TelemetryEvent>,
    state_tx: Arc<watch::Sender<LinkState>>,
    cancel: CancellationToken,
    started: AtomicBool,
}

impl TelemetryChannel {
    /// Create a channel. Does not connect.
    pub fn new(ws_url: Url, policy: ReconnectPolicy, cancel: CancellationToken) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let (state_tx, _) = watch::channel(LinkState::Idle);

        Self {
            ws_url,
            policy,
            event_tx,
            state_tx: Arc::new(state_tx),
            cancel,
            started: AtomicBool::new(false),
        }
    }

    /// Spawn the background connect/read/reconnect loop.
    ///
    /// Idempotent: a second call while the loop is running (or after it
    /// has terminally failed) is a no-op, so double-triggering cannot
    /// open duplicate sockets.
    pub fn connect(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            tracing::debug!("telemetry channel already started, ignoring connect");
            return;
        }

        let ws_url = self.ws_url.clone();
        let event_tx = self.event_tx.clone();
        let state_tx = Arc::clone(&self.state_tx);
        let policy = self.policy.clone();
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            ws_loop(&ws_url, &event_tx, &state_tx, &policy, &cancel).await;
        });
    }

    /// Get a new broadcast receiver for telemetry observations.
    ///
    /// Multiple consumers can subscribe concurrently. A consumer that
    /// falls behind receives [`broadcast::error::RecvError::Lagged`].
    pub fn subscribe(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.event_tx.subscribe()
    }

    /// Observe link state transitions.
    pub fn link_state(&self) -> watch::Receiver<LinkState> {
        self.state_tx.subscribe()
    }

    /// Signal the background loop to shut down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// Main loop: connect → read until the connection ends → fixed-interval
/// backoff → reconnect, bounded by the policy's attempt budget.
///
/// Only a connection *ending* schedules a reconnect. Transport errors
/// surface as the session result and are logged, but the close that
/// reliably follows them is what drives the schedule -- there is never
/// more than one timer armed.
async fn ws_loop(
    ws_url: &Url,
    event_tx: &broadcast::Sender<TelemetryEvent>,
    state_tx: &watch::Sender<LinkState>,
    policy: &ReconnectPolicy,
    cancel: &CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let _ = state_tx.send(LinkState::Connecting { attempt });

        let session = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            result = run_connection(ws_url, event_tx, state_tx, cancel, &mut attempt) => result,
        };

        if let Err(e) = session {
            tracing::warn!(error = %e, attempt, "telemetry connection error");
        }
        if cancel.is_cancelled() {
            break;
        }

        let _ = state_tx.send(LinkState::Closed);

        let Some(delay) = policy.next_delay(attempt) else {
            tracing::error!(
                max_attempts = policy.max_attempts,
                "telemetry reconnect budget exhausted, giving up"
            );
            let _ = state_tx.send(LinkState::Failed);
            return;
        };

        tracing::info!(
            delay_ms = delay.as_millis() as u64,
            attempt = attempt + 1,
            "waiting before telemetry reconnect"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
    }

    let _ = state_tx.send(LinkState::Closed);
    tracing::debug!("telemetry loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish one WebSocket connection and read frames until it drops.
///
/// Resets the reconnect-attempt counter strictly on the transition into
/// the open state.
async fn run_connection(
    url: &Url,
    event_tx: &broadcast::Sender<TelemetryEvent>,
    state_tx: &watch::Sender<LinkState>,
    cancel: &CancellationToken,
    attempt: &mut u32,
) -> Result<(), Error> {
    tracing::info!(url = %url, "connecting telemetry link");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let request = ClientRequestBuilder::new(uri);
    let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
        .await
        .map_err(|e| Error::WebSocketConnect(e.to_string()))?;

    tracing::info!("telemetry link open");
    *attempt = 0;
    let _ = state_tx.send(LinkState::Open);

    let (_write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Ok(()),
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        decode_frame(&text, event_tx);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("telemetry ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        if let Some(ref cf) = frame {
                            tracing::info!(code = %cf.code, reason = %cf.reason, "telemetry close frame");
                        } else {
                            tracing::info!("telemetry close frame (no payload)");
                        }
                        return Ok(());
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("telemetry stream ended");
                        return Ok(());
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Frame decoding ───────────────────────────────────────────────────

/// Decode one text frame and broadcast what it carried.
///
/// The sensor and GPIO sections are evaluated independently so one
/// malformed section never suppresses the other. A frame that fails to
/// parse at all produces a single `DecodeError` observation.
fn decode_frame(text: &str, event_tx: &broadcast::Sender<TelemetryEvent>) {
    let frame: TelemetryFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!(error = %e, "telemetry frame is not valid JSON");
            // Ignore send errors -- just means no active subscribers
            let _ = event_tx.send(TelemetryEvent::DecodeError(e.to_string()));
            return;
        }
    };

    match frame.sensors {
        Some(readings) => {
            let delay_secs = sample_delay_secs(&readings, Utc::now().timestamp_millis());
            let _ = event_tx.send(TelemetryEvent::Sensors { readings, delay_secs });
        }
        None => {
            let _ = event_tx.send(TelemetryEvent::InvalidSensors);
        }
    }

    match frame.gpios {
        Some(gpios) => {
            let _ = event_tx.send(TelemetryEvent::Gpios(gpios));
        }
        None => {
            let _ = event_tx.send(TelemetryEvent::InvalidGpios);
        }
    }
}

/// Seconds between the first reading's producer timestamp (ms) and the
/// receive time. Advisory telemetry only -- never a control input.
#[allow(clippy::cast_precision_loss)]
fn sample_delay_secs(readings: &[SensorReading], received_ms: i64) -> Option<f64> {
    let sampled_ms = readings.first()?.timestamp?;
    Some((received_ms as f64 - sampled_ms) / 1000.0)
}

// ── Tests ────────────────────────────────────────────────────────────
