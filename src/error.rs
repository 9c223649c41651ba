//! Error types for the cmdsense CLI.
//!
//! Uses thiserror for derive macros and provides user-actionable error
//! messages.
//!
//! Note that failures *inside* a poll tick (spawn failures, timeouts,
//! non-zero exits, template errors) are deliberately not represented here:
//! they are data, carried in [`crate::sensor::RawOutcome`] and the sensor
//! state diagnostics, and never escape a tick as an error.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for cmdsense operations.
#[derive(Error, Debug)]
pub enum CmdsenseError {
    /// User provided invalid arguments or referenced an unknown sensor.
    #[error("{0}")]
    UserError(String),

    /// The sensor registry or an attribute-template payload is invalid.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl CmdsenseError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CmdsenseError::UserError(_) => exit_codes::USER_ERROR,
            CmdsenseError::ConfigError(_) => exit_codes::CONFIG_FAILURE,
        }
    }
}

/// Result type alias for cmdsense operations.
pub type Result<T> = std::result::Result<T, CmdsenseError>;
