//! Live telemetry streaming.

use std::time::Duration;

use owo_colors::OwoColorize;

use novaground_core::{CoreError, GpioReading, LinkState, SensorReading, TelemetryEvent};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::util;

pub async fn watch(global: &GlobalOpts, args: WatchArgs) -> Result<(), CliError> {
    let panel = util::build_panel(global)?;
    panel.connect().await?;
    let mut events = panel.telemetry_events().await?;
    let mut link = panel.link_state().await?;

    let printer = Printer {
        json: matches!(
            global.output,
            OutputFormat::Json | OutputFormat::JsonCompact
        ),
        color: output::should_color(&global.color),
        quiet: global.quiet,
        gpios_only: args.gpios_only,
        sensors_only: args.sensors_only,
    };

    let deadline = args
        .duration
        .map(|secs| tokio::time::Instant::now() + Duration::from_secs(secs));
    let result = stream(&mut events, &mut link, deadline, &printer).await;
    panel.disconnect().await;
    result
}

async fn stream(
    events: &mut tokio::sync::broadcast::Receiver<TelemetryEvent>,
    link: &mut tokio::sync::watch::Receiver<LinkState>,
    deadline: Option<tokio::time::Instant>,
    printer: &Printer,
) -> Result<(), CliError> {
    loop {
        let until_deadline = async {
            match deadline {
                Some(instant) => tokio::time::sleep_until(instant).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            () = until_deadline => return Ok(()),
            changed = link.changed() => {
                if changed.is_err() {
                    return Ok(());
                }
                let state = link.borrow_and_update().clone();
                printer.link_state(&state);
                if state == LinkState::Failed {
                    return Err(CoreError::Telemetry(
                        "reconnect budget exhausted".into(),
                    )
                    .into());
                }
            }
            event = events.recv() => match event {
                Ok(event) => printer.event(&event),
                // Skipped frames are superseded by the next one.
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => {}
                Err(tokio::sync::broadcast::error::RecvError::Closed) => return Ok(()),
            },
        }
    }
}

struct Printer {
    json: bool,
    color: bool,
    quiet: bool,
    gpios_only: bool,
    sensors_only: bool,
}

impl Printer {
    fn link_state(&self, state: &LinkState) {
        if self.quiet || self.json {
            return;
        }
        let line = match state {
            LinkState::Idle => "link: idle".to_owned(),
            LinkState::Connecting { attempt: 0 } => "link: connecting".to_owned(),
            LinkState::Connecting { attempt } => format!("link: reconnecting (attempt {attempt})"),
            LinkState::Open => "link: open".to_owned(),
            LinkState::Closed => "link: closed".to_owned(),
            LinkState::Failed => "link: failed".to_owned(),
        };
        if self.color {
            eprintln!("{}", line.dimmed());
        } else {
            eprintln!("{line}");
        }
    }

    fn event(&self, event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Sensors {
                readings,
                delay_secs,
            } if !self.gpios_only => self.sensors(readings, *delay_secs),
            TelemetryEvent::Gpios(readings) if !self.sensors_only => self.gpios(readings),
            TelemetryEvent::InvalidSensors if !self.gpios_only => {
                self.notice("invalid sensors section");
            }
            TelemetryEvent::InvalidGpios if !self.sensors_only => {
                self.notice("invalid gpios section");
            }
            TelemetryEvent::DecodeError(message) => self.notice(message),
            _ => {}
        }
    }

    fn sensors(&self, readings: &[SensorReading], delay_secs: Option<f64>) {
        if self.json {
            let payload = serde_json::json!({
                "sensors": readings,
                "delay_secs": delay_secs,
            });
            println!("{payload}");
            return;
        }
        if let Some(delay) = delay_secs {
            let header = format!("-- sensors (delay {delay:.3}s) --");
            if self.color {
                println!("{}", header.dimmed());
            } else {
                println!("{header}");
            }
        }
        for reading in readings {
            let mut line = format!("{:20} {}", reading.name, reading.value);
            if let Some(avg) = reading.avg {
                line.push_str(&format!("  avg {avg:.2}"));
            }
            if let Some(rate) = reading.rate {
                line.push_str(&format!("  rate {rate:.2}/s"));
            }
            println!("{line}");
        }
    }

    fn gpios(&self, readings: &[GpioReading]) {
        if self.json {
            let payload = serde_json::json!({ "gpios": readings });
            println!("{payload}");
            return;
        }
        for reading in readings {
            if self.color && reading.state == "high" {
                println!("{:20} {}", reading.name, reading.state.green());
            } else {
                println!("{:20} {}", reading.name, reading.state);
            }
        }
    }

    fn notice(&self, message: &str) {
        if self.quiet {
            return;
        }
        if self.color {
            eprintln!("{}", message.yellow());
        } else {
            eprintln!("{message}");
        }
    }
}
