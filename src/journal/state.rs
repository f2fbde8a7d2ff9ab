//! Observable journal state
//!
//! One snapshot struct carries everything the presentation layer reads.
//! The controller publishes it through a tokio `watch` channel, so every
//! consumer sees whole, internally-consistent states in publish order.

use crate::model::{partition_by_status, Location};

/// Snapshot of the journal as the presentation layer sees it
///
/// `suggestion`, `suggestions` and `saved` follow a cooperative
/// clear-after-read contract: the controller sets them on completion and
/// the consumer calls the matching `clear_*` operation after merging the
/// value into its own state. Nothing enforces the clear; skipping it just
/// re-delivers the old value with the next publish.
#[derive(Debug, Clone, PartialEq)]
pub struct JournalState {
    /// Latest full snapshot from the store, in store order
    pub locations: Vec<Location>,
    /// True from construction until the first snapshot arrives
    pub is_loading: bool,
    /// Most recent mutation failure, as display text; cleared by the
    /// next successful mutation
    pub last_error: Option<String>,
    /// Latest single activity suggestion
    pub suggestion: Option<String>,
    /// Latest activity suggestion list
    pub suggestions: Vec<String>,
    /// Acknowledges a completed create or update
    pub saved: bool,
}

impl JournalState {
    /// Initial state: loading, with nothing to show yet
    pub fn new() -> Self {
        Self {
            locations: Vec::new(),
            is_loading: true,
            last_error: None,
            suggestion: None,
            suggestions: Vec::new(),
            saved: false,
        }
    }

    /// Locations still to visit, soonest start first, undated first
    pub fn planned(&self) -> Vec<Location> {
        partition_by_status(&self.locations).0
    }

    /// Locations already visited, soonest start first, undated first
    pub fn visited(&self) -> Vec<Location> {
        partition_by_status(&self.locations).1
    }
}

impl Default for JournalState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LocationStatus;

    #[test]
    fn test_initial_state_is_loading_and_empty() {
        let state = JournalState::new();
        assert!(state.is_loading);
        assert!(state.locations.is_empty());
        assert!(state.last_error.is_none());
        assert!(state.suggestion.is_none());
        assert!(state.suggestions.is_empty());
        assert!(!state.saved);
    }

    #[test]
    fn test_planned_and_visited_split_the_snapshot() {
        let mut porto = Location::new("Porto", "Portugal");
        porto.status = LocationStatus::Visited;
        porto.start_date = Some(200);
        let mut oslo = Location::new("Oslo", "Norway");
        oslo.start_date = Some(100);
        let kyoto = Location::new("Kyoto", "Japan");

        let mut state = JournalState::new();
        state.locations = vec![porto.clone(), oslo.clone(), kyoto.clone()];

        // Undated locations sort first within each half.
        assert_eq!(state.planned(), vec![kyoto, oslo]);
        assert_eq!(state.visited(), vec![porto]);
    }
}
