//! Error types for adbview.
//!
//! Every controller operation reports failures through [`BridgeError`]. The
//! bridge layer turns them into `{success: false, error}` records, so the
//! presentation surface only ever sees the display message.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the adbview core.
#[derive(Debug, Error)]
pub enum BridgeError {
    // Long-running stream state
    #[error("Logcat is already running")]
    AlreadyRunning,

    #[error("Logcat is not running")]
    NotRunning,

    // Executable discovery
    #[error("ADB not found in common locations. Please add ADB to PATH or pass --adb-path.")]
    NotFound { searched: Vec<String> },

    // One-shot commands
    #[error("Command timed out after {0:?}")]
    Timeout(Duration),

    #[error("{message}")]
    Execution {
        message: String,
        /// Captured standard error, when the command got far enough to produce any.
        stderr: Option<String>,
    },

    // Save prompt
    #[error("Save canceled")]
    Cancelled,

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    // Request validation
    #[error("Invalid params: {message}")]
    InvalidParams { message: String },

    #[error("Method not found: {0}")]
    UnknownMethod(String),
}

/// Result type alias for adbview operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl From<std::io::Error> for BridgeError {
    fn from(err: std::io::Error) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl BridgeError {
    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        BridgeError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Create an execution error without captured output.
    pub fn execution(message: impl Into<String>) -> Self {
        BridgeError::Execution {
            message: message.into(),
            stderr: None,
        }
    }

    /// Captured stderr, if this error carries any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            BridgeError::Execution { stderr, .. } => stderr.as_deref(),
            _ => None,
        }
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// Standard JSON-RPC error codes:
    /// - -32601: Method not found
    /// - -32602: Invalid params
    /// - -32603: Internal error
    ///
    /// Custom error codes (application-defined, -32000 to -32099):
    /// - -32000: Timeout
    /// - -32001: Executable not found
    /// - -32002: Stream state conflict (already running / not running)
    /// - -32003: Command execution failed
    /// - -32004: Cancelled by user
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            BridgeError::UnknownMethod(_) => -32601,
            BridgeError::InvalidParams { .. } => -32602,
            BridgeError::Timeout(_) => -32000,
            BridgeError::NotFound { .. } => -32001,
            BridgeError::AlreadyRunning | BridgeError::NotRunning => -32002,
            BridgeError::Execution { .. } => -32003,
            BridgeError::Cancelled => -32004,
            BridgeError::Io { .. } | BridgeError::Json { .. } => -32603,
        }
    }
}
