//! Error types shared by the collector, the aggregator and the run log
//! reader.
//!
//! Per-request failures are not represented here: they are folded into the
//! sample set as failed samples (see [`crate::collector::RequestError`]).
//! `BenchError` only carries conditions that must reach the caller.

use thiserror::Error;

/// Errors surfaced to the immediate caller of the library API.
#[derive(Debug, Error)]
pub enum BenchError {
    /// A contract violation such as a non-positive collection window or a
    /// zero concurrency level.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        BenchError::InvalidInput(message.into())
    }
}

pub type Result<T> = std::result::Result<T, BenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_input_display() {
        let err = BenchError::invalid("wall_seconds must be positive, got 0");
        assert_eq!(
            err.to_string(),
            "invalid input: wall_seconds must be positive, got 0"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: BenchError = io.into();
        assert!(matches!(err, BenchError::Io(_)));
    }
}
