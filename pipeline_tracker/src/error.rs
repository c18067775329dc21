//! Error taxonomy shared by every component of the tracker.
//!
//! Each expected failure (bad duration text, unreachable store, missing config
//! key, ...) is a [`TrackerError`] variant so that the orchestrators can compose
//! results with `?` and callers can branch on [`TrackerError::kind`].

use std::fmt;

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Stable, machine-readable error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed duration string.
    InvalidDurationFormat,
    /// A duration that must be strictly positive is zero or negative.
    NonPositiveDuration,
    /// The tracking store could not be reached or opened.
    StoreConnection,
    /// The tracking store was reachable but a read or write failed.
    StoreQuery,
    /// A required configuration key is absent.
    MissingConfiguration,
    /// A configuration value is present but unusable.
    InvalidConfiguration,
    /// A window does not have the configured length or is inverted.
    InvalidWindow,
}

impl ErrorKind {
    /// Upper-snake name used in logs and CLI output.
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidDurationFormat => "INVALID_DURATION_FORMAT",
            ErrorKind::NonPositiveDuration => "NON_POSITIVE_DURATION",
            ErrorKind::StoreConnection => "STORE_CONNECTION_ERROR",
            ErrorKind::StoreQuery => "STORE_QUERY_ERROR",
            ErrorKind::MissingConfiguration => "MISSING_CONFIGURATION",
            ErrorKind::InvalidConfiguration => "INVALID_CONFIGURATION",
            ErrorKind::InvalidWindow => "INVALID_WINDOW",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced by the tracker library.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The input does not follow the `y, mon, w, d, h, m, s, ms` grammar.
    #[error("invalid duration '{input}': {reason}")]
    InvalidDurationFormat {
        /// The raw text that was rejected.
        input: String,
        /// What exactly was wrong with it.
        reason: String,
    },

    /// A duration that must be strictly positive is not.
    #[error("{what} must be positive, got '{value}'")]
    NonPositiveDuration {
        /// Which duration was checked (e.g. `query_interval_window`).
        what: String,
        /// The offending value in duration-string form.
        value: String,
    },

    /// Failure to open or configure the store connection.
    #[error("tracking store connection failed: {0}")]
    StoreConnection(String),

    /// A store read or write failed after the connection was established.
    ///
    /// `inserted_count` is the number of rows the store confirms were written
    /// before the failure (always `0` for reads).
    #[error("tracking store {operation} failed after {inserted_count} row(s): {message}")]
    StoreQuery {
        /// Store operation name (e.g. `insert_many`).
        operation: &'static str,
        /// Underlying driver message.
        message: String,
        /// Rows persisted before the failure.
        inserted_count: usize,
    },

    /// A required configuration key is absent.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// A configuration value is present but unusable.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A window handed to the record builder is inverted or has the wrong length.
    #[error("window [{start}, {end}) does not span {expected}")]
    InvalidWindow {
        /// Window start as RFC-3339 text.
        start: String,
        /// Window end as RFC-3339 text.
        end: String,
        /// The configured window length.
        expected: String,
    },
}

impl TrackerError {
    /// Machine-readable kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            TrackerError::InvalidDurationFormat { .. } => ErrorKind::InvalidDurationFormat,
            TrackerError::NonPositiveDuration { .. } => ErrorKind::NonPositiveDuration,
            TrackerError::StoreConnection(_) => ErrorKind::StoreConnection,
            TrackerError::StoreQuery { .. } => ErrorKind::StoreQuery,
            TrackerError::MissingConfiguration(_) => ErrorKind::MissingConfiguration,
            TrackerError::InvalidConfiguration(_) => ErrorKind::InvalidConfiguration,
            TrackerError::InvalidWindow { .. } => ErrorKind::InvalidWindow,
        }
    }

    /// Rows the store confirmed before failing; zero for every other kind.
    pub fn inserted_count(&self) -> usize {
        match self {
            TrackerError::StoreQuery { inserted_count, .. } => *inserted_count,
            _ => 0,
        }
    }

    pub(crate) fn invalid_duration(input: &str, reason: impl Into<String>) -> Self {
        TrackerError::InvalidDurationFormat {
            input: input.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn store_query(operation: &'static str, err: impl fmt::Display) -> Self {
        TrackerError::StoreQuery {
            operation,
            message: err.to_string(),
            inserted_count: 0,
        }
    }
}

impl From<shared_utils::env::EnvError> for TrackerError {
    fn from(err: shared_utils::env::EnvError) -> Self {
        TrackerError::MissingConfiguration(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_render_upper_snake() {
        let err = TrackerError::store_query("fetch_by_status", "disk I/O error");
        assert_eq!(err.kind().as_str(), "STORE_QUERY_ERROR");
        assert_eq!(err.inserted_count(), 0);
        assert_eq!(
            TrackerError::MissingConfiguration("timezone".into())
                .kind()
                .to_string(),
            "MISSING_CONFIGURATION"
        );
    }

    #[test]
    fn partial_insert_count_is_surfaced() {
        let err = TrackerError::StoreQuery {
            operation: "insert_many",
            message: "UNIQUE constraint failed".into(),
            inserted_count: 2,
        };
        assert_eq!(err.inserted_count(), 2);
        assert!(err.to_string().contains("after 2 row(s)"));
    }
}
