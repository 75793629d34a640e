use thiserror::Error;

/// jobhours error types
#[derive(Error, Debug)]
pub enum ReportError {
    /// File I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Transport-level HTTP failure (connect, timeout, TLS)
    #[error("http error: {0}")]
    Http(String),

    /// Failed to parse JSON, TOML or CSV
    #[error("parse error: {0}")]
    Parse(String),

    /// Response did not have the expected aggregation shape
    #[error("unexpected response shape: {0}")]
    Shape(String),

    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// Date string could not be interpreted
    #[error("invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    /// Report window is empty or inverted
    #[error("invalid window: start {start} is not before end {end}")]
    InvalidWindow { start: String, end: String },

    /// Search service answered with a non-success status
    #[error("search request to {0} failed")]
    RequestFailed(String),
}

/// Result type alias for jobhours
pub type Result<T> = std::result::Result<T, ReportError>;

impl From<serde_json::Error> for ReportError {
    fn from(err: serde_json::Error) -> Self {
        ReportError::Parse(err.to_string())
    }
}

/// Disk failures stay I/O errors; anything else is a CSV encoding problem.
impl From<csv::Error> for ReportError {
    fn from(err: csv::Error) -> Self {
        if !err.is_io_error() {
            return ReportError::Parse(format!("csv: {}", err));
        }
        match err.into_kind() {
            csv::ErrorKind::Io(io_err) => ReportError::Io(io_err),
            other => ReportError::Parse(format!("csv: {:?}", other)),
        }
    }
}
