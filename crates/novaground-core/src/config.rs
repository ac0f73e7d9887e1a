use std::time::Duration;

use url::Url;

use novaground_api::{ReconnectPolicy, TransportConfig};

/// Everything the panel needs to reach one controller.
#[derive(Debug, Clone)]
pub struct PanelConfig {
    /// Controller base URL, e.g. `http://192.168.4.1:8000`.
    pub base_url: Url,
    /// HTTP request timeout.
    pub timeout: Duration,
    /// Telemetry reconnect behavior.
    pub reconnect: ReconnectPolicy,
    /// Seconds between background catalogue refreshes; 0 disables the
    /// refresh task and the catalogue is only fetched on connect.
    pub refresh_interval_secs: u64,
}

impl PanelConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(10),
            reconnect: ReconnectPolicy::default(),
            refresh_interval_secs: 0,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_reconnect(mut self, reconnect: ReconnectPolicy) -> Self {
        self.reconnect = reconnect;
        self
    }

    #[must_use]
    pub fn with_refresh_interval_secs(mut self, secs: u64) -> Self {
        self.refresh_interval_secs = secs;
        self
    }

    pub(crate) fn transport(&self) -> TransportConfig {
        TransportConfig {
            timeout: self.timeout,
        }
    }
}
