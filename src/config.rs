//! Configuration management for Wayfarer
//!
//! This module handles loading, parsing, and validating configuration
//! from YAML files with environment variable overrides.

use crate::error::{Result, WayfarerError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Wayfarer
///
/// This structure holds all configuration needed by the library:
/// the location store backend, the suggestion service, and the
/// identity provider used before suggestion requests.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Location store configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Activity suggestion configuration
    #[serde(default)]
    pub suggestion: SuggestionConfig,

    /// Identity (anonymous sign-in) configuration
    #[serde(default)]
    pub identity: IdentityConfig,
}

/// Location store configuration
///
/// Specifies which store backend to use and its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Type of store backend to use
    #[serde(rename = "type", default = "default_store_backend")]
    pub backend: String,

    /// Hosted document database configuration
    #[serde(default)]
    pub firestore: FirestoreConfig,
}

fn default_store_backend() -> String {
    "firestore".to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            firestore: FirestoreConfig::default(),
        }
    }
}

/// Hosted document database (Firestore REST) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// Cloud project id the database belongs to
    #[serde(default)]
    pub project_id: String,

    /// Web API key sent with every request
    #[serde(default)]
    pub api_key: String,

    /// Collection holding location documents
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Optional API base URL (useful for tests and local mocks)
    ///
    /// When set, this base is used to build document endpoints, which
    /// allows tests to point the store at a mock server. When unset,
    /// the public service endpoint is used.
    #[serde(default)]
    pub api_base: Option<String>,

    /// Interval between subscription polls, in milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_collection() -> String {
    "locations".to_string()
}

fn default_poll_interval_ms() -> u64 {
    2_000
}

impl Default for FirestoreConfig {
    fn default() -> Self {
        Self {
            project_id: String::new(),
            api_key: String::new(),
            collection: default_collection(),
            api_base: None,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Activity suggestion configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SuggestionConfig {
    /// Generative language service configuration
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Generative language service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Model to request suggestions from
    #[serde(default = "default_gemini_model")]
    pub model: String,

    /// API key sent with every request
    #[serde(default)]
    pub api_key: String,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,

    /// Sampling parameters for generation requests
    #[serde(default)]
    pub sampling: SamplingConfig,
}

fn default_gemini_model() -> String {
    "gemini-2.5-flash".to_string()
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: default_gemini_model(),
            api_key: String::new(),
            api_base: None,
            sampling: SamplingConfig::default(),
        }
    }
}

/// Sampling parameters for generation requests
///
/// These are tunables, not contracts: downstream behavior must not
/// depend on particular values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    /// Number of candidates to request
    #[serde(default = "default_candidate_count")]
    pub candidate_count: u32,

    /// Hard cap on generated tokens
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Top-k sampling cutoff
    #[serde(default = "default_top_k")]
    pub top_k: u32,

    /// Nucleus sampling cutoff
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_candidate_count() -> u32 {
    1
}

fn default_max_output_tokens() -> u32 {
    750
}

fn default_temperature() -> f32 {
    0.8
}

fn default_top_k() -> u32 {
    30
}

fn default_top_p() -> f32 {
    0.8
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            candidate_count: default_candidate_count(),
            max_output_tokens: default_max_output_tokens(),
            temperature: default_temperature(),
            top_k: default_top_k(),
            top_p: default_top_p(),
        }
    }
}

/// Identity (anonymous sign-in) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Whether suggestion requests must hold an identity token
    #[serde(default = "default_identity_enabled")]
    pub enabled: bool,

    /// Web API key for the identity endpoint
    #[serde(default)]
    pub api_key: String,

    /// Optional API base URL (useful for tests and local mocks)
    #[serde(default)]
    pub api_base: Option<String>,
}

fn default_identity_enabled() -> bool {
    true
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            enabled: default_identity_enabled(),
            api_key: String::new(),
            api_base: None,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file with environment overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    ///
    /// # Returns
    ///
    /// Returns the loaded and merged configuration. A missing file is
    /// not an error: defaults are used and a warning is logged.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WayfarerError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| WayfarerError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(backend) = std::env::var("WAYFARER_STORE_TYPE") {
            self.store.backend = backend;
        }

        if let Ok(project_id) = std::env::var("WAYFARER_FIRESTORE_PROJECT_ID") {
            self.store.firestore.project_id = project_id;
        }

        if let Ok(api_key) = std::env::var("WAYFARER_FIRESTORE_API_KEY") {
            self.store.firestore.api_key = api_key;
        }

        if let Ok(interval) = std::env::var("WAYFARER_POLL_INTERVAL_MS") {
            if let Ok(value) = interval.parse() {
                self.store.firestore.poll_interval_ms = value;
            } else {
                tracing::warn!("Invalid WAYFARER_POLL_INTERVAL_MS: {}", interval);
            }
        }

        if let Ok(model) = std::env::var("WAYFARER_GEMINI_MODEL") {
            self.suggestion.gemini.model = model;
        }

        if let Ok(api_key) = std::env::var("WAYFARER_GEMINI_API_KEY") {
            self.suggestion.gemini.api_key = api_key;
        }

        if let Ok(api_key) = std::env::var("WAYFARER_IDENTITY_API_KEY") {
            self.identity.api_key = api_key;
        }
    }

    /// Validate the configuration
    ///
    /// Ensures all configuration values are within acceptable ranges
    /// and that required fields are properly set.
    ///
    /// # Returns
    ///
    /// Returns Ok if configuration is valid
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        let valid_backends = ["firestore", "memory"];
        if !valid_backends.contains(&self.store.backend.as_str()) {
            return Err(WayfarerError::Config(format!(
                "Invalid store type: {}. Must be one of: {}",
                self.store.backend,
                valid_backends.join(", ")
            ))
            .into());
        }

        if self.store.backend == "firestore" {
            if self.store.firestore.project_id.is_empty() {
                return Err(WayfarerError::Config(
                    "store.firestore.project_id cannot be empty".to_string(),
                )
                .into());
            }

            if self.store.firestore.collection.is_empty() {
                return Err(WayfarerError::Config(
                    "store.firestore.collection cannot be empty".to_string(),
                )
                .into());
            }

            if self.store.firestore.poll_interval_ms == 0 {
                return Err(WayfarerError::Config(
                    "store.firestore.poll_interval_ms must be greater than 0".to_string(),
                )
                .into());
            }
        }

        if self.suggestion.gemini.model.is_empty() {
            return Err(
                WayfarerError::Config("suggestion.gemini.model cannot be empty".to_string()).into(),
            );
        }

        let sampling = &self.suggestion.gemini.sampling;
        if sampling.candidate_count == 0 {
            return Err(WayfarerError::Config(
                "sampling.candidate_count must be greater than 0".to_string(),
            )
            .into());
        }

        if sampling.max_output_tokens == 0 {
            return Err(WayfarerError::Config(
                "sampling.max_output_tokens must be greater than 0".to_string(),
            )
            .into());
        }

        if !(0.0..=2.0).contains(&sampling.temperature) {
            return Err(WayfarerError::Config(
                "sampling.temperature must be between 0.0 and 2.0".to_string(),
            )
            .into());
        }

        if !(0.0..=1.0).contains(&sampling.top_p) {
            return Err(WayfarerError::Config(
                "sampling.top_p must be between 0.0 and 1.0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}
