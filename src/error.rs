use thiserror::Error;

/// Internal failure taxonomy. None of these escape a scanner's `scan()`:
/// per-item failures are logged and degrade to empty sub-results.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("subprocess `{command}` failed: {reason}")]
    Subprocess { command: String, reason: String },

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),
}
