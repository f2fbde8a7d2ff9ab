//! Edit-boundary draft for creating and editing locations
//!
//! A draft holds the editable fields of one location while a create or
//! edit screen is open. All validation happens at [`LocationDraft::build`];
//! a draft that fails to build never reaches the store.

use crate::error::{Result, WayfarerError};
use crate::model::{Location, LocationStatus};

/// Mutable working copy of a location's editable fields
///
/// # Examples
///
/// ```
/// use wayfarer::journal::LocationDraft;
///
/// let mut draft = LocationDraft::new();
/// draft.name = "Porto".to_string();
/// draft.country = "Portugal".to_string();
/// draft.add_note("Book riverside hotel");
///
/// let location = draft.build().unwrap();
/// assert_eq!(location.name, "Porto");
/// assert_eq!(location.notes.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocationDraft {
    /// Present when editing an existing location; `build` keeps it
    id: Option<String>,
    pub name: String,
    pub country: String,
    pub notes: Vec<String>,
    pub status: LocationStatus,
    /// Trip start, epoch milliseconds
    pub start_date: Option<i64>,
    /// Trip end, epoch milliseconds
    pub end_date: Option<i64>,
}

impl LocationDraft {
    /// Blank draft for a new location; the id is assigned at `build`
    pub fn new() -> Self {
        Self::default()
    }

    /// Draft seeded from an existing location, keeping its id
    pub fn edit(location: &Location) -> Self {
        Self {
            id: Some(location.id.clone()),
            name: location.name.clone(),
            country: location.country.clone(),
            notes: location.notes.clone(),
            status: location.status,
            start_date: location.start_date,
            end_date: location.end_date,
        }
    }

    /// Append a note; blank text is rejected
    ///
    /// Returns whether the note was added.
    pub fn add_note(&mut self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        self.notes.push(text.to_string());
        true
    }

    /// Replace the note at `index`; blank text and out-of-range indices
    /// are rejected
    ///
    /// Returns whether the note was changed.
    pub fn edit_note(&mut self, index: usize, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() {
            return false;
        }
        match self.notes.get_mut(index) {
            Some(note) => {
                *note = text.to_string();
                true
            }
            None => false,
        }
    }

    /// Remove the note at `index`
    ///
    /// Returns whether a note was removed.
    pub fn remove_note(&mut self, index: usize) -> bool {
        if index >= self.notes.len() {
            return false;
        }
        self.notes.remove(index);
        true
    }

    /// Move the note at `from` so it sits at `to`, shifting the rest
    ///
    /// Remove-then-reinsert semantics, matching a drag reorder: the
    /// moved note lands exactly at `to` in the resulting list.
    ///
    /// Returns whether the reorder happened.
    pub fn move_note(&mut self, from: usize, to: usize) -> bool {
        if from >= self.notes.len() || to >= self.notes.len() {
            return false;
        }
        let note = self.notes.remove(from);
        self.notes.insert(to, note);
        true
    }

    /// Append an accepted suggestion as a note
    ///
    /// The no-suggestions sentinel is displayable and merges like any
    /// other suggestion. Callers clear the controller's suggestion state
    /// afterwards (clear-after-read contract).
    ///
    /// Returns whether the suggestion was added.
    pub fn merge_suggestion(&mut self, suggestion: &str) -> bool {
        self.add_note(suggestion)
    }

    /// Whether the draft has enough context to ask for a suggestion
    ///
    /// Mirrors the edit screens: the AI button stays disabled until the
    /// name is non-blank.
    pub fn can_request_suggestion(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Validate the draft and produce a location
    ///
    /// The name is trimmed; every other field carries over verbatim. A
    /// draft created with [`LocationDraft::new`] gets a fresh id here.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::EmptyName`] when the name is blank after
    /// trimming, and [`WayfarerError::InvalidDateRange`] when both dates
    /// are present with start after end. Equal dates are a valid
    /// single-day trip.
    pub fn build(&self) -> Result<Location> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(WayfarerError::EmptyName.into());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                return Err(WayfarerError::InvalidDateRange { start, end }.into());
            }
        }

        let mut location = Location::new(name, self.country.clone());
        if let Some(id) = &self.id {
            location.id = id.clone();
        }
        location.notes = self.notes.clone();
        location.status = self.status;
        location.start_date = self.start_date;
        location.end_date = self.end_date;
        Ok(location)
    }
}
