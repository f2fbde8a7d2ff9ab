use std::time::Duration;

use tokio::sync::watch;
use wayfarer::journal::JournalState;

/// Opt-in log output for debugging test runs: `RUST_LOG=debug cargo test`
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

/// Waits until the controller publishes a state satisfying the predicate
#[allow(dead_code)]
pub async fn wait_for_state<F>(
    rx: &mut watch::Receiver<JournalState>,
    predicate: F,
) -> JournalState
where
    F: Fn(&JournalState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            {
                let state = rx.borrow_and_update();
                if predicate(&state) {
                    return state.clone();
                }
            }
            rx.changed().await.expect("state channel closed");
        }
    })
    .await
    .expect("timed out waiting for state")
}
