//! Error types for Wayfarer
//!
//! This module defines all error types used throughout the library,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Wayfarer operations
///
/// This enum encompasses all possible errors that can occur while
/// talking to the location store, requesting activity suggestions,
/// acquiring an identity, loading configuration, or validating a
/// location draft.
#[derive(Error, Debug)]
pub enum WayfarerError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Location store errors (remote reads and writes)
    #[error("Store error: {0}")]
    Store(String),

    /// A stored record could not be decoded into a location
    #[error("Decode error: {0}")]
    Decode(String),

    /// Suggestion generation errors (API calls, malformed responses)
    #[error("Generation error: {0}")]
    Generation(String),

    /// Generation ended for a reason other than normal completion
    #[error("Generation stopped: {reason}")]
    GenerationStopped {
        /// Finish reason reported by the model service
        reason: String,
    },

    /// Identity acquisition errors (anonymous sign-in)
    #[error("Identity error: {0}")]
    Identity(String),

    /// A location draft has a blank name
    #[error("Location name must not be empty")]
    EmptyName,

    /// A location draft has a start date after its end date
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Draft start date, epoch milliseconds
        start: i64,
        /// Draft end date, epoch milliseconds
        end: i64,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Wayfarer operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = WayfarerError::Config("missing project id".to_string());
        assert_eq!(error.to_string(), "Configuration error: missing project id");
    }

    #[test]
    fn test_store_error_display() {
        let error = WayfarerError::Store("HTTP 503 from document service".to_string());
        assert_eq!(
            error.to_string(),
            "Store error: HTTP 503 from document service"
        );
    }

    #[test]
    fn test_decode_error_display() {
        let error = WayfarerError::Decode("status field is not a string".to_string());
        assert_eq!(
            error.to_string(),
            "Decode error: status field is not a string"
        );
    }

    #[test]
    fn test_generation_error_display() {
        let error = WayfarerError::Generation("API timeout".to_string());
        assert_eq!(error.to_string(), "Generation error: API timeout");
    }

    #[test]
    fn test_generation_stopped_display() {
        let error = WayfarerError::GenerationStopped {
            reason: "SAFETY".to_string(),
        };
        assert_eq!(error.to_string(), "Generation stopped: SAFETY");
    }

    #[test]
    fn test_identity_error_display() {
        let error = WayfarerError::Identity("sign-up rejected".to_string());
        assert_eq!(error.to_string(), "Identity error: sign-up rejected");
    }

    #[test]
    fn test_empty_name_display() {
        let error = WayfarerError::EmptyName;
        assert_eq!(error.to_string(), "Location name must not be empty");
    }

    #[test]
    fn test_invalid_date_range_display() {
        let error = WayfarerError::InvalidDateRange {
            start: 200,
            end: 100,
        };
        let s = error.to_string();
        assert!(s.contains("start 200"));
        assert!(s.contains("end 100"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: WayfarerError = io_error.into();
        assert!(matches!(error, WayfarerError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: WayfarerError = json_error.into();
        assert!(matches!(error, WayfarerError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: WayfarerError = yaml_error.into();
        assert!(matches!(error, WayfarerError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WayfarerError>();
    }
}
