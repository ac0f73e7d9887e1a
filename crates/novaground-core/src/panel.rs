// ── Panel facade ──
//
// Owns one controller connection end to end: HTTP client, telemetry
// channel, shadow store, lock gate and dispatcher, plus the background
// tasks that pump telemetry into the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PanelConfig;
use crate::convert::actuator_from_record;
use crate::dispatch::{Dispatcher, Intent, LockGate};
use crate::error::CoreError;
use crate::model::StateChange;
use crate::store::ShadowStore;
use novaground_api::{DeviceClient, LinkState, TelemetryChannel, TelemetryEvent};

/// Cheaply cloneable handle to one control panel session.
#[derive(Clone)]
pub struct Panel {
    inner: Arc<PanelInner>,
}

struct PanelInner {
    config: PanelConfig,
    client: Arc<DeviceClient>,
    store: Arc<ShadowStore>,
    lock: Arc<LockGate>,
    dispatcher: Dispatcher,
    connection: Mutex<Option<Connection>>,
}

/// Everything torn down together on disconnect.
struct Connection {
    channel: TelemetryChannel,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Panel {
    pub fn new(config: PanelConfig) -> Result<Self, CoreError> {
        let client = Arc::new(DeviceClient::new(
            config.base_url.clone(),
            &config.transport(),
        )?);
        let store = Arc::new(ShadowStore::new());
        let lock = Arc::new(LockGate::new());
        let dispatcher = Dispatcher::new(client.clone(), store.clone(), lock.clone());

        Ok(Self {
            inner: Arc::new(PanelInner {
                config,
                client,
                store,
                lock,
                dispatcher,
                connection: Mutex::new(None),
            }),
        })
    }

    /// Fetch the actuator catalogue and open the telemetry link.
    ///
    /// Idempotent: connecting an already connected panel is a no-op.
    pub async fn connect(&self) -> Result<(), CoreError> {
        let mut slot = self.inner.connection.lock().await;
        if slot.is_some() {
            debug!("panel already connected");
            return Ok(());
        }

        self.refresh_actuators().await?;

        let ws_url = self.inner.client.telemetry_url()?;
        let cancel = CancellationToken::new();
        let channel = TelemetryChannel::new(
            ws_url,
            self.inner.config.reconnect.clone(),
            cancel.child_token(),
        );
        channel.connect();

        let mut tasks = vec![tokio::spawn(pump_telemetry(
            channel.subscribe(),
            self.inner.store.clone(),
            cancel.child_token(),
        ))];
        if self.inner.config.refresh_interval_secs > 0 {
            tasks.push(tokio::spawn(refresh_periodically(
                self.clone(),
                Duration::from_secs(self.inner.config.refresh_interval_secs),
                cancel.child_token(),
            )));
        }

        info!(url = %self.inner.config.base_url, "panel connected");
        *slot = Some(Connection {
            channel,
            cancel,
            tasks,
        });
        Ok(())
    }

    /// Tear the telemetry link down and stop background tasks. The
    /// shadow keeps its last-known state for rendering.
    pub async fn disconnect(&self) {
        let Some(connection) = self.inner.connection.lock().await.take() else {
            return;
        };
        connection.channel.shutdown();
        connection.cancel.cancel();
        for task in connection.tasks {
            if let Err(error) = task.await {
                if !error.is_cancelled() {
                    warn!(%error, "background task ended abnormally");
                }
            }
        }
        info!("panel disconnected");
    }

    /// Re-fetch the catalogue and replace the shadow's actuator set.
    /// Records for unknown kinds are skipped with a warning instead of
    /// failing the whole refresh.
    pub async fn refresh_actuators(&self) -> Result<(), CoreError> {
        let records = self.inner.client.get_actuators().await?;
        let mut actuators = Vec::with_capacity(records.len());
        for record in records {
            match actuator_from_record(record) {
                Ok(actuator) => actuators.push(actuator),
                Err(error) => warn!(%error, "skipping actuator record"),
            }
        }
        debug!(count = actuators.len(), "actuator catalogue refreshed");
        self.inner.store.replace_actuators(actuators);
        Ok(())
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn dispatch(&self, intent: Intent) -> Result<StateChange, CoreError> {
        self.inner.dispatcher.dispatch(intent).await
    }

    pub fn lock(&self) {
        self.inner.lock.engage();
        info!("actuator lock engaged");
    }

    pub fn unlock(&self) {
        self.inner.lock.release();
        info!("actuator lock released");
    }

    /// Flip the lock, returning the new engaged state.
    pub fn toggle_lock(&self) -> bool {
        let engaged = self.inner.lock.toggle();
        info!(engaged, "actuator lock toggled");
        engaged
    }

    pub fn is_locked(&self) -> bool {
        self.inner.lock.is_engaged()
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn store(&self) -> &ShadowStore {
        &self.inner.store
    }

    /// Watch the telemetry link's lifecycle. Errors when the panel has
    /// never been connected.
    pub async fn link_state(&self) -> Result<watch::Receiver<LinkState>, CoreError> {
        let slot = self.inner.connection.lock().await;
        slot.as_ref()
            .map(|c| c.channel.link_state())
            .ok_or(CoreError::PanelDisconnected)
    }

    /// Subscribe to raw telemetry events, in arrival order.
    pub async fn telemetry_events(
        &self,
    ) -> Result<broadcast::Receiver<TelemetryEvent>, CoreError> {
        let slot = self.inner.connection.lock().await;
        slot.as_ref()
            .map(|c| c.channel.subscribe())
            .ok_or(CoreError::PanelDisconnected)
    }

    // ── Auxiliary controller operations ──────────────────────────────

    /// Ask the controller to reload its device configuration.
    pub async fn refresh_config(&self) -> Result<serde_json::Value, CoreError> {
        let result = self.inner.client.update_config().await?;
        info!("controller configuration reloaded");
        Ok(result)
    }

    /// Start or stop on-controller data logging.
    pub async fn set_data_logging(&self, enabled: bool) -> Result<serde_json::Value, CoreError> {
        let result = if enabled {
            self.inner.client.start_saving_data().await?
        } else {
            self.inner.client.stop_saving_data().await?
        };
        info!(enabled, "data logging switched");
        Ok(result)
    }

    /// Switch the controller's calibration mode.
    pub async fn set_calibration(&self, enabled: bool) -> Result<serde_json::Value, CoreError> {
        let result = self.inner.client.toggle_calibration(enabled).await?;
        info!(enabled, "calibration mode switched");
        Ok(result)
    }
}

/// Fold telemetry events into the shadow until the channel closes or
/// the session is torn down. The sender outlives this task (the panel
/// holds the channel while joining it), so cancellation is what ends
/// the loop on disconnect.
async fn pump_telemetry(
    mut events: broadcast::Receiver<TelemetryEvent>,
    store: Arc<ShadowStore>,
    cancel: CancellationToken,
) {
    loop {
        let event = tokio::select! {
            () = cancel.cancelled() => break,
            event = events.recv() => event,
        };
        match event {
            Ok(TelemetryEvent::Sensors {
                readings,
                delay_secs,
            }) => {
                store.set_link_delay(delay_secs);
                store.replace_sensors(readings);
            }
            Ok(TelemetryEvent::Gpios(readings)) => store.replace_gpios(readings),
            Ok(TelemetryEvent::InvalidSensors) => {
                warn!("frame carried an invalid sensors section");
            }
            Ok(TelemetryEvent::InvalidGpios) => {
                warn!("frame carried an invalid gpios section");
            }
            Ok(TelemetryEvent::DecodeError(message)) => {
                warn!(%message, "undecodable telemetry frame");
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                // Frames are full snapshots, so dropped ones are
                // superseded by the next -- log and keep going.
                warn!(skipped, "telemetry receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
    debug!("telemetry pump stopped");
}

/// Keep the actuator catalogue fresh in the background. Refresh
/// failures are logged and retried on the next tick.
async fn refresh_periodically(panel: Panel, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    ticker.tick().await; // the first tick fires immediately
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(error) = panel.refresh_actuators().await {
                    warn!(%error, "background catalogue refresh failed");
                }
            }
        }
    }
    debug!("catalogue refresh task stopped");
}
