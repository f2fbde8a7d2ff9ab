//! Location store for Wayfarer
//!
//! This module defines the LocationStore trait that all store backends
//! must implement, along with the change-subscription types shared by
//! the hosted document-database backend and the in-process backend.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::model::Location;
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// A change notification delivered to subscribers
///
/// Snapshots always carry the complete current collection, never deltas;
/// convergence requires no merging on the consumer side. Errors are
/// advisory: the subscription stays registered after delivering one.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    /// The complete decoded collection, in store order
    Snapshot(Vec<Location>),
    /// A listener failure, as display text
    Error(String),
}

/// Handle to a live change subscription
///
/// Dropping the handle releases the registration; [`Subscription::cancel`]
/// releases it explicitly. The handle also implements
/// [`futures::Stream`], yielding [`StoreEvent`]s in delivery order.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<StoreEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    pub(crate) fn new(
        events: mpsc::UnboundedReceiver<StoreEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self { events, cancel }
    }

    /// Waits for the next event from the store
    ///
    /// # Returns
    ///
    /// Returns `None` once the subscription has been cancelled and all
    /// buffered events were consumed
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// Releases the subscription registration
    ///
    /// Events already in flight may still be received afterwards.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl Stream for Subscription {
    type Item = StoreEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StoreEvent>> {
        self.events.poll_recv(cx)
    }
}

/// Store trait for location persistence
///
/// All store backends must implement this trait. The contract is
/// upsert-based: `create` and `update` are the same full-document set
/// operation at the wire level and differ only in caller intent.
///
/// # Examples
///
/// ```no_run
/// use wayfarer::model::Location;
/// use wayfarer::store::{LocationStore, MemoryStore};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let porto = Location::new("Porto", "Portugal");
///
/// store.create(&porto).await.unwrap();
/// let all = store.get_all().await.unwrap();
/// assert_eq!(all.len(), 1);
/// # });
/// ```
#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Writes a location under its id, creating or replacing the document
    ///
    /// # Arguments
    ///
    /// * `location` - Location to persist; `location.id` is the document id
    ///
    /// # Errors
    ///
    /// Returns error if the write is rejected or the backend is unreachable
    async fn create(&self, location: &Location) -> Result<()>;

    /// Writes a location under its id, creating or replacing the document
    ///
    /// Identical wire semantics to [`LocationStore::create`]; kept as a
    /// separate operation because callers carry distinct intent.
    ///
    /// # Arguments
    ///
    /// * `location` - Location to persist; `location.id` is the document id
    ///
    /// # Errors
    ///
    /// Returns error if the write is rejected or the backend is unreachable
    async fn update(&self, location: &Location) -> Result<()>;

    /// Deletes the document with the given id
    ///
    /// Deletion is idempotent: deleting a non-existent id succeeds.
    ///
    /// # Arguments
    ///
    /// * `id` - Document id to delete
    ///
    /// # Errors
    ///
    /// Returns error if the delete is rejected or the backend is unreachable
    async fn delete(&self, id: &str) -> Result<()>;

    /// Reads the complete collection
    ///
    /// Records that fail to decode are skipped with a warning rather than
    /// failing the whole read.
    ///
    /// # Returns
    ///
    /// Returns all decodable locations, in store order
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable
    async fn get_all(&self) -> Result<Vec<Location>>;

    /// Reads a single location by id
    ///
    /// # Arguments
    ///
    /// * `id` - Document id to look up
    ///
    /// # Returns
    ///
    /// Returns `None` when no document with that id exists
    ///
    /// # Errors
    ///
    /// Returns error if the backend is unreachable or an existing document
    /// fails to decode
    async fn get_by_id(&self, id: &str) -> Result<Option<Location>>;

    /// Registers a change subscription
    ///
    /// The subscription receives one snapshot shortly after registration
    /// (even for an empty collection), then one on every observed change
    /// from any writer.
    fn subscribe(&self) -> Subscription;
}

/// Create a store instance based on configuration
///
/// # Arguments
///
/// * `config` - Store configuration
///
/// # Returns
///
/// Returns a shared store instance
///
/// # Errors
///
/// Returns error if the store type is invalid or initialization fails
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn LocationStore>> {
    match config.backend.as_str() {
        "firestore" => Ok(Arc::new(FirestoreStore::new(config.firestore.clone())?)),
        "memory" => Ok(Arc::new(MemoryStore::new())),
        _ => Err(crate::error::WayfarerError::Config(format!(
            "Unknown store type: {}",
            config.backend
        ))
        .into()),
    }
}
