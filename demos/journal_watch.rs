//! Journal Watcher Example
//!
//! This example demonstrates how to use the Wayfarer controller to:
//! 1. Load configuration and start the journal coordinator
//! 2. Observe journal state through the watch channel
//! 3. Create a location from a draft
//! 4. Request an AI activity suggestion for it
//!
//! # Running
//!
//! The memory backend needs no credentials:
//! ```bash
//! export WAYFARER_STORE_TYPE="memory"
//! ```
//!
//! For the hosted document database and live suggestions, set instead:
//! ```bash
//! export WAYFARER_STORE_TYPE="firestore"
//! export WAYFARER_FIRESTORE_PROJECT_ID="your-project"
//! export WAYFARER_FIRESTORE_API_KEY="your-api-key"
//! export WAYFARER_GEMINI_API_KEY="your-gemini-key"
//! export WAYFARER_IDENTITY_API_KEY="your-identity-key"
//! ```
//!
//! Then run with:
//! ```bash
//! cargo run --example journal_watch
//! ```

use tokio::sync::watch;
use tokio::time::{timeout, Duration};
use wayfarer::config::Config;
use wayfarer::journal::{JournalController, JournalState, LocationDraft};
use wayfarer::suggest::SuggestionRequest;

/// Configuration file consulted before environment overrides.
const CONFIG_PATH: &str = "config/wayfarer.yaml";

/// Place written when the journal starts empty.
const SAMPLE_PLACE: &str = "Porto";

/// Country of the sample place.
const SAMPLE_COUNTRY: &str = "Portugal";

/// How long to wait for a suggestion before moving on.
const SUGGESTION_WAIT: Duration = Duration::from_secs(10);

/// Prints one state snapshot in a planned/visited layout.
fn print_snapshot(state: &JournalState) {
    println!("Journal ({} locations):", state.locations.len());
    for location in state.planned() {
        println!("  [planned] {} - {}", location.name, location.country);
    }
    for location in state.visited() {
        println!("  [visited] {} - {}", location.name, location.country);
    }
    if let Some(error) = &state.last_error {
        println!("  last error: {}", error);
    }
}

/// Waits for the next published state and returns a clone of it.
async fn next_state(rx: &mut watch::Receiver<JournalState>) -> anyhow::Result<JournalState> {
    rx.changed().await?;
    Ok(rx.borrow_and_update().clone())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wayfarer=debug".parse().unwrap()),
        )
        .init();

    println!("Starting Wayfarer journal watcher...");

    // Load configuration from file and environment
    let config = match Config::load(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            eprintln!(
                "Check {} or the WAYFARER_* environment variables.",
                CONFIG_PATH
            );
            return Err(e);
        }
    };
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        eprintln!("Please set the required environment variables:");
        eprintln!("  WAYFARER_STORE_TYPE (\"firestore\" or \"memory\")");
        eprintln!("  WAYFARER_FIRESTORE_PROJECT_ID (firestore backend)");
        eprintln!("  WAYFARER_FIRESTORE_API_KEY (firestore backend)");
        return Err(e);
    }

    println!("Configuration:");
    println!("  Store backend: {}", config.store.backend);
    println!("  Collection: {}", config.store.firestore.collection);
    println!("  Suggestion model: {}", config.suggestion.gemini.model);

    // Start the coordinator and wait for the first snapshot
    let controller = JournalController::from_config(&config)?;
    let mut rx = controller.watch();

    let state = next_state(&mut rx).await?;
    print_snapshot(&state);

    // Write a sample location when the journal starts empty
    if state.locations.is_empty() {
        let mut draft = LocationDraft::new();
        draft.name = SAMPLE_PLACE.to_string();
        draft.country = SAMPLE_COUNTRY.to_string();
        draft.add_note("Added by the journal_watch example");
        controller.add(draft.build()?);

        loop {
            let state = next_state(&mut rx).await?;
            if state.saved {
                controller.clear_saved();
                println!("Saved {} to the journal.", SAMPLE_PLACE);
                break;
            }
            if let Some(error) = state.last_error {
                eprintln!("Write failed: {}", error);
                controller.shutdown();
                return Ok(());
            }
        }
    }

    // Ask for one activity suggestion for the sample place
    controller.request_suggestion(SuggestionRequest {
        place: SAMPLE_PLACE.to_string(),
        country: Some(SAMPLE_COUNTRY.to_string()),
        start_date: None,
        end_date: None,
        exclusions: Vec::new(),
    });
    let suggested = timeout(SUGGESTION_WAIT, async {
        loop {
            let state = next_state(&mut rx).await?;
            if let Some(suggestion) = state.suggestion {
                controller.clear_suggestion();
                return anyhow::Ok(suggestion);
            }
        }
    })
    .await;
    match suggested {
        Ok(suggestion) => println!("Suggested activity: {}", suggestion?),
        Err(_) => println!("No suggestion arrived within {:?}.", SUGGESTION_WAIT),
    }

    println!("Watching for remote changes. Press Ctrl+C to stop.");

    // Print every later snapshot until interrupted
    loop {
        tokio::select! {
            changed = rx.changed() => {
                changed?;
                let state = rx.borrow_and_update().clone();
                print_snapshot(&state);
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.shutdown();
    println!("Watcher stopped.");
    Ok(())
}
