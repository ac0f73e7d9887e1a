//! CLI error type with miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use novaground_core::CoreError;

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    #[error("Invalid controller URL '{value}'")]
    #[diagnostic(
        code(novaground::invalid_host),
        help("pass a full base URL, e.g. http://192.168.4.1:8000")
    )]
    InvalidHost {
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Actuator not found: {name}")]
    #[diagnostic(
        code(novaground::not_found),
        help("run `novaground actuators` to list known actuators")
    )]
    ActuatorNotFound { name: String },

    #[error(transparent)]
    #[diagnostic(code(novaground::core))]
    Core(CoreError),

    #[error(transparent)]
    #[diagnostic(code(novaground::io))]
    Io(#[from] std::io::Error),
}

impl From<CoreError> for CliError {
    fn from(error: CoreError) -> Self {
        match error {
            CoreError::ActuatorNotFound { name } => Self::ActuatorNotFound { name },
            other => Self::Core(other),
        }
    }
}
