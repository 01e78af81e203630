//! Error types for the design orchestration core
//!
//! Two layers are kept apart. `GatewayError` describes what went wrong on a
//! single round trip to the generative-AI service and keeps enough detail to
//! tell a network fault from a malformed answer. `KodexError` is the crate-wide
//! error for everything that is not a Gateway call: configuration, wizard
//! misuse, file handling and the booking demo.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a failed Gateway call, used for logging and
/// carried on degraded results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Network,
    Upstream,
    EmptyResponse,
    SchemaValidation,
    Cancelled,
    Configuration,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::Network => "network",
            FailureKind::Upstream => "upstream",
            FailureKind::EmptyResponse => "empty_response",
            FailureKind::SchemaValidation => "schema_validation",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Configuration => "configuration",
        };
        f.write_str(label)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Gateway transport failed: {0}")]
    Transport(String),
    #[error("Gateway returned status {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Gateway returned no usable content: {0}")]
    EmptyResponse(String),
    #[error("Gateway response failed schema validation: {0}")]
    SchemaValidation(String),
    #[error("Gateway response could not be parsed: {0}")]
    Parsing(String),
    #[error("Gateway call cancelled")]
    Cancelled,
    #[error("Gateway configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    pub fn kind(&self) -> FailureKind {
        match self {
            GatewayError::Transport(_) => FailureKind::Network,
            GatewayError::Upstream { .. } => FailureKind::Upstream,
            GatewayError::EmptyResponse(_) => FailureKind::EmptyResponse,
            // A body we cannot parse is as useless as one that fails its schema.
            GatewayError::SchemaValidation(_) | GatewayError::Parsing(_) => {
                FailureKind::SchemaValidation
            }
            GatewayError::Cancelled => FailureKind::Cancelled,
            GatewayError::Configuration(_) => FailureKind::Configuration,
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Parsing(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Wizard transitions that are not allowed from the current selection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WizardError {
    #[error("A work type must be selected first")]
    NoWorkType,
    #[error("Sub-type '{sub_type}' does not apply to work type '{work_type}'")]
    SubTypeMismatch { work_type: String, sub_type: String },
    #[error("A font can only be chosen for cut names")]
    FontNotApplicable,
    #[error("File uploads are not accepted for {0}")]
    UploadNotAccepted(String),
    #[error("Selection is incomplete: {0}")]
    Incomplete(String),
    #[error("The setup was already submitted; reset the session to start over")]
    Finalized,
}

#[derive(Error, Debug)]
pub enum KodexError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Booking error: {0}")]
    Booking(String),
    #[error("Tool execution failed for '{tool_name}': {message}")]
    Tool { tool_name: String, message: String },
    #[error("Another request is still being processed")]
    Busy,
}

impl From<std::io::Error> for KodexError {
    fn from(err: std::io::Error) -> Self {
        KodexError::Io(err.to_string())
    }
}
