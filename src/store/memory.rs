//! In-memory store backend for Wayfarer
//!
//! This module implements the LocationStore trait over a process-local
//! map. It backs the `memory` store type in configuration and doubles as
//! the test stand-in for the hosted backend: same upsert, idempotent
//! delete, and snapshot subscription semantics, without the network.
//!
//! Writes can be made to fail on demand via
//! [`MemoryStore::set_fail_writes`], which lets tests exercise the error
//! paths of code built on top of the store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, WayfarerError};
use crate::model::Location;
use crate::store::{LocationStore, StoreEvent, Subscription};

/// Process-local location store
///
/// Locations are held in a map keyed by id, so snapshots come back in
/// stable id order, matching the hosted backend's name-ordered listings.
/// Every successful write pushes a fresh snapshot to all live
/// subscriptions.
///
/// # Examples
///
/// ```
/// use wayfarer::model::Location;
/// use wayfarer::store::{MemoryStore, LocationStore, StoreEvent};
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// let mut subscription = store.subscribe();
///
/// // The subscription starts with the current (empty) snapshot.
/// assert_eq!(
///     subscription.next_event().await,
///     Some(StoreEvent::Snapshot(vec![]))
/// );
///
/// let porto = Location::new("Porto", "Portugal");
/// store.create(&porto).await.unwrap();
///
/// match subscription.next_event().await {
///     Some(StoreEvent::Snapshot(locations)) => assert_eq!(locations.len(), 1),
///     other => panic!("expected snapshot, got {:?}", other),
/// }
/// # });
/// ```
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

#[derive(Default)]
struct MemoryInner {
    documents: BTreeMap<String, Location>,
    subscribers: Vec<(mpsc::UnboundedSender<StoreEvent>, CancellationToken)>,
    /// When set, all write operations fail with this message
    fail_writes: Option<String>,
}

impl MemoryStore {
    /// Create a new, empty in-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with the given message, or
    /// restore normal operation with `None`
    ///
    /// Reads and subscriptions are unaffected. Intended for tests that
    /// need to observe write-failure handling.
    pub async fn set_fail_writes(&self, message: Option<&str>) {
        let mut inner = self.inner.lock().await;
        inner.fail_writes = message.map(|m| m.to_string());
    }

    async fn write<F>(&self, apply: F) -> Result<()>
    where
        F: FnOnce(&mut BTreeMap<String, Location>),
    {
        let mut inner = self.inner.lock().await;
        if let Some(message) = &inner.fail_writes {
            return Err(WayfarerError::Store(message.clone()).into());
        }
        apply(&mut inner.documents);
        broadcast_snapshot(&mut inner);
        Ok(())
    }
}

/// Sends the current snapshot to every live subscriber, pruning the
/// cancelled and the dropped
fn broadcast_snapshot(inner: &mut MemoryInner) {
    let snapshot: Vec<Location> = inner.documents.values().cloned().collect();
    inner.subscribers.retain(|(tx, token)| {
        if token.is_cancelled() {
            return false;
        }
        tx.send(StoreEvent::Snapshot(snapshot.clone())).is_ok()
    });
}

#[async_trait]
impl LocationStore for MemoryStore {
    async fn create(&self, location: &Location) -> Result<()> {
        let location = location.clone();
        self.write(move |documents| {
            documents.insert(location.id.clone(), location);
        })
        .await
    }

    async fn update(&self, location: &Location) -> Result<()> {
        // Same set-by-id semantics as create, matching the hosted
        // backend's full-document writes.
        self.create(location).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let id = id.to_string();
        self.write(move |documents| {
            documents.remove(&id);
        })
        .await
    }

    async fn get_all(&self) -> Result<Vec<Location>> {
        let inner = self.inner.lock().await;
        Ok(inner.documents.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Location>> {
        let inner = self.inner.lock().await;
        Ok(inner.documents.get(id).cloned())
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        tokio::spawn(async move {
            let mut inner = inner.lock().await;
            let snapshot: Vec<Location> = inner.documents.values().cloned().collect();
            if tx.send(StoreEvent::Snapshot(snapshot)).is_ok() {
                inner.subscribers.push((tx, token));
            }
        });

        Subscription::new(rx, cancel)
    }
}
