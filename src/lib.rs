//! Wayfarer - Travel journal core library
//!
//! This library provides the core of a travel journal: location records,
//! a hosted document-database store with push-style change subscriptions,
//! AI activity suggestions, and the coordinator that ties them together
//! behind one observable state.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `model`: Location entity, status, and presentation helpers
//! - `store`: Location persistence contract with Firestore and in-memory backends
//! - `suggest`: Prompt building, the generative-language client, and reply parsing
//! - `auth`: Anonymous identity tokens for authenticated request paths
//! - `journal`: Observable state, the coordinator, and the location draft
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use wayfarer::config::Config;
//! use wayfarer::journal::JournalController;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/wayfarer.yaml")?;
//!     config.validate()?;
//!
//!     let controller = JournalController::from_config(&config)?;
//!     let mut state = controller.watch();
//!     state.changed().await?;
//!     println!("{} locations", state.borrow().locations.len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod journal;
pub mod model;
pub mod store;
pub mod suggest;

// Re-export commonly used types
pub use config::Config;
pub use error::{Result, WayfarerError};
pub use journal::{JournalController, JournalState, LocationDraft};
pub use model::{Location, LocationStatus};
pub use store::{LocationStore, StoreEvent, Subscription};
pub use suggest::{SuggestionRequest, SuggestionService, NO_SUGGESTIONS_SENTINEL};
