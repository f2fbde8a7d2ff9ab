//! Journal coordinator
//!
//! The controller owns the observable [`JournalState`] and mediates all
//! traffic between the presentation layer and the remote services. It
//! subscribes to the store once at construction; after that, the
//! collection shown on screen only ever changes when the subscription
//! delivers a fresh snapshot. Local mutations are spawned
//! fire-and-forget and report back exclusively through state fields
//! (`saved`, `last_error`), never through return values.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::auth::create_identity_provider;
use crate::config::Config;
use crate::error::Result;
use crate::journal::JournalState;
use crate::model::Location;
use crate::store::{create_store, LocationStore, StoreEvent};
use crate::suggest::{SuggestionRequest, SuggestionService};

/// Coordinator between screens, the location store, and the suggestion
/// service
///
/// Must be constructed inside a Tokio runtime; construction spawns the
/// store subscription loop. Dropping the controller (or calling
/// [`JournalController::shutdown`]) ends that loop.
///
/// # Examples
///
/// ```no_run
/// use wayfarer::config::Config;
/// use wayfarer::journal::JournalController;
///
/// # tokio_test::block_on(async {
/// let config = Config::load("config/wayfarer.yaml").unwrap();
/// let controller = JournalController::from_config(&config).unwrap();
///
/// let mut state = controller.watch();
/// while state.changed().await.is_ok() {
///     let snapshot = state.borrow().clone();
///     println!("{} locations", snapshot.locations.len());
/// }
/// # });
/// ```
pub struct JournalController {
    state: Arc<watch::Sender<JournalState>>,
    store: Arc<dyn LocationStore>,
    service: Arc<SuggestionService>,
    /// Issue counter for suggestion requests; completions holding a
    /// ticket older than the counter are stale and get dropped
    ticket: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl JournalController {
    /// Create a controller over an existing store and service
    ///
    /// Spawns the subscription loop immediately; the first snapshot it
    /// delivers flips `is_loading` off.
    pub fn new(store: Arc<dyn LocationStore>, service: SuggestionService) -> Self {
        let (state_tx, _) = watch::channel(JournalState::new());
        let state = Arc::new(state_tx);
        let shutdown = CancellationToken::new();

        let sync_store = Arc::clone(&store);
        let sync_state = Arc::clone(&state);
        let sync_shutdown = shutdown.clone();
        tokio::spawn(async move {
            run_sync_loop(sync_store, sync_state, sync_shutdown).await;
        });

        Self {
            state,
            store,
            service: Arc::new(service),
            ticket: Arc::new(AtomicU64::new(0)),
            shutdown,
        }
    }

    /// Create a fully wired controller from configuration
    ///
    /// Builds the store, the identity provider (when enabled), and the
    /// suggestion service, then hands them to [`JournalController::new`].
    ///
    /// # Errors
    ///
    /// Returns error if any component cannot be constructed
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = create_store(&config.store)?;
        let identity = create_identity_provider(&config.identity)?;
        let service = SuggestionService::from_config(&config.suggestion, identity)?;
        Ok(Self::new(store, service))
    }

    /// Receiver for state snapshots; each publish is a whole state
    pub fn watch(&self) -> watch::Receiver<JournalState> {
        self.state.subscribe()
    }

    /// The state as of right now
    pub fn state(&self) -> JournalState {
        self.state.borrow().clone()
    }

    /// Persist a new location
    ///
    /// Fire-and-forget: completion shows up in state as `saved = true`
    /// (with `last_error` cleared) or as a fresh `last_error`. The
    /// location list itself updates only when the subscription delivers
    /// the next snapshot.
    pub fn add(&self, location: Location) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tracing::debug!("Adding location: id={}", location.id);
            let result = store.create(&location).await;
            publish_mutation_result(&state, "add", true, result);
        });
    }

    /// Persist changes to an existing location
    ///
    /// Same completion contract as [`JournalController::add`].
    pub fn update(&self, location: Location) {
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tracing::debug!("Updating location: id={}", location.id);
            let result = store.update(&location).await;
            publish_mutation_result(&state, "update", true, result);
        });
    }

    /// Delete a location by id
    ///
    /// Success clears `last_error`, failure sets it; `saved` is not
    /// touched (save acknowledgment belongs to the editor flow).
    pub fn delete(&self, id: &str) {
        let id = id.to_string();
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            tracing::debug!("Deleting location: id={}", id);
            let result = store.delete(&id).await;
            publish_mutation_result(&state, "delete", false, result);
        });
    }

    /// Request one activity suggestion; completion lands in
    /// `state.suggestion`
    ///
    /// Requests race freely: each takes a ticket, and only the newest
    /// ticket's completion is applied, so rapid re-requests cannot
    /// clobber a fresher result with a slower, older one. Identity
    /// failures are logged and leave state unchanged.
    pub fn request_suggestion(&self, request: SuggestionRequest) {
        let ticket = self.next_ticket();
        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        let counter = Arc::clone(&self.ticket);
        tokio::spawn(async move {
            match service.request_single(&request).await {
                Ok(suggestion) => {
                    if counter.load(Ordering::SeqCst) != ticket {
                        tracing::debug!("Dropping stale suggestion for {}", request.place);
                        return;
                    }
                    state.send_modify(|s| s.suggestion = Some(suggestion));
                }
                Err(e) => {
                    tracing::warn!("Suggestion request failed: {}", e);
                }
            }
        });
    }

    /// Request a suggestion list; completion lands in `state.suggestions`
    ///
    /// Shares the ticket counter with
    /// [`JournalController::request_suggestion`], so whichever request
    /// was issued last wins regardless of arrival order.
    pub fn request_suggestions(&self, request: SuggestionRequest) {
        let ticket = self.next_ticket();
        let service = Arc::clone(&self.service);
        let state = Arc::clone(&self.state);
        let counter = Arc::clone(&self.ticket);
        tokio::spawn(async move {
            match service.request_list(&request).await {
                Ok(suggestions) => {
                    if counter.load(Ordering::SeqCst) != ticket {
                        tracing::debug!("Dropping stale suggestions for {}", request.place);
                        return;
                    }
                    state.send_modify(|s| s.suggestions = suggestions);
                }
                Err(e) => {
                    tracing::warn!("Suggestion request failed: {}", e);
                }
            }
        });
    }

    /// Clear the consumed single suggestion (clear-after-read)
    pub fn clear_suggestion(&self) {
        self.state.send_modify(|s| s.suggestion = None);
    }

    /// Clear the consumed suggestion list (clear-after-read)
    pub fn clear_suggestions(&self) {
        self.state.send_modify(|s| s.suggestions = Vec::new());
    }

    /// Clear the save acknowledgment (clear-after-read)
    pub fn clear_saved(&self) {
        self.state.send_modify(|s| s.saved = false);
    }

    /// End the subscription loop; state stops updating afterwards
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn next_ticket(&self) -> u64 {
        self.ticket.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for JournalController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// Applies store events to state until shutdown or channel close
async fn run_sync_loop(
    store: Arc<dyn LocationStore>,
    state: Arc<watch::Sender<JournalState>>,
    shutdown: CancellationToken,
) {
    let mut subscription = store.subscribe();

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            event = subscription.next_event() => match event {
                Some(StoreEvent::Snapshot(locations)) => {
                    tracing::debug!("Applying snapshot of {} locations", locations.len());
                    state.send_modify(|s| {
                        s.locations = locations;
                        s.is_loading = false;
                    });
                }
                Some(StoreEvent::Error(message)) => {
                    // Listener errors are advisory; only failed mutations
                    // own last_error.
                    tracing::warn!("Store listener error: {}", message);
                }
                None => break,
            }
        }
    }

    tracing::debug!("Location sync loop ended");
}

fn publish_mutation_result(
    state: &watch::Sender<JournalState>,
    operation: &'static str,
    acknowledges_save: bool,
    result: Result<()>,
) {
    match result {
        Ok(()) => {
            state.send_modify(|s| {
                s.last_error = None;
                if acknowledges_save {
                    s.saved = true;
                }
            });
        }
        Err(e) => {
            tracing::error!("Failed to {} location: {}", operation, e);
            state.send_modify(|s| {
                s.last_error = Some(e.to_string());
            });
        }
    }
}
