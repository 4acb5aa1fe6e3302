// src/core/error.rs

use thiserror::Error;

/// Errors that end a session in the `Failed` state.
///
/// Anything less severe than these is absorbed by the stage that hit it and
/// reported through a `log` event instead.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ScanError {
    #[error("could not resolve {target}: {reason}")]
    Unresolvable { target: String, reason: String },

    #[error("port scanner unavailable: {0}")]
    ToolUnavailable(String),

    #[error("invalid scan options: {0}")]
    InvalidOptions(String),

    #[error("scan task aborted: {0}")]
    TaskAborted(String),
}
