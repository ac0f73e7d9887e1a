//! Clap derive structures for the `novaground` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// novaground -- terminal control panel for NovaGround test stands
#[derive(Debug, Parser)]
#[command(
    name = "novaground",
    version,
    about = "Operate a NovaGround test stand controller from the command line",
    long_about = "A CLI for remote test-stand operation: live telemetry,\n\
        actuator state, and command dispatch against the controller's\n\
        HTTP/WebSocket interface.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller base URL
    #[arg(
        long,
        short = 'H',
        env = "NOVAGROUND_HOST",
        default_value = "http://localhost:8000",
        global = true
    )]
    pub host: String,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "NOVAGROUND_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Request timeout in seconds
    #[arg(long, env = "NOVAGROUND_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List the controller's actuators and their last-known states
    #[command(alias = "act", alias = "a")]
    Actuators,

    /// Send one command to a named actuator
    #[command(alias = "s")]
    Send(SendArgs),

    /// Stream live telemetry until interrupted
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Ask the controller to reload its device configuration
    ConfigReload,

    /// Control on-controller data logging
    Logging(LoggingArgs),

    /// Switch the controller's calibration mode
    Calibration(CalibrationArgs),
}

// ── Send ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct SendArgs {
    /// Actuator name as listed by `actuators`
    pub name: String,

    #[command(subcommand)]
    pub action: SendAction,
}

#[derive(Debug, Subcommand)]
pub enum SendAction {
    /// Toggle open/closed (servo, solenoid)
    Open,
    /// Toggle armed/disarmed (GPIO devices)
    Arm,
    /// Toggle the power gate
    Power,
    /// Move a multi-position valve to a named position
    Valve {
        /// Target position label
        position: String,
    },
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds (default: run until Ctrl-C)
    #[arg(long, short = 'd')]
    pub duration: Option<u64>,

    /// Only show GPIO observations
    #[arg(long, conflicts_with = "sensors_only")]
    pub gpios_only: bool,

    /// Only show sensor observations
    #[arg(long)]
    pub sensors_only: bool,
}

// ── Logging / Calibration ────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct LoggingArgs {
    #[command(subcommand)]
    pub command: LoggingCommand,
}

#[derive(Debug, Subcommand)]
pub enum LoggingCommand {
    /// Start saving data on the controller
    Start,
    /// Stop saving data on the controller
    Stop,
}

#[derive(Debug, Args)]
pub struct CalibrationArgs {
    #[command(subcommand)]
    pub command: CalibrationCommand,
}

#[derive(Debug, Subcommand)]
pub enum CalibrationCommand {
    /// Enable calibration mode
    On,
    /// Disable calibration mode
    Off,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_tree_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_valve_parses_a_position() {
        let cli = Cli::try_parse_from(["novaground", "send", "valve1", "valve", "2"])
            .expect("parse");
        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.name, "valve1");
        assert!(matches!(args.action, SendAction::Valve { position } if position == "2"));
    }
}
