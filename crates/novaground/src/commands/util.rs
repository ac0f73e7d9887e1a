//! Shared helpers for command handlers.

use std::time::Duration;

use tracing::debug;
use url::Url;

use novaground_core::{Panel, PanelConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Build a panel from the global flags. Does not connect.
pub fn build_panel(global: &GlobalOpts) -> Result<Panel, CliError> {
    let base_url = Url::parse(&global.host).map_err(|source| CliError::InvalidHost {
        value: global.host.clone(),
        source,
    })?;
    debug!(host = %base_url, timeout_secs = global.timeout, "building panel");
    let config = PanelConfig::new(base_url).with_timeout(Duration::from_secs(global.timeout));
    Ok(Panel::new(config)?)
}
