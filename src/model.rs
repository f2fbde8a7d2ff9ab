//! Core data model for Wayfarer
//!
//! This module defines the location entity stored in the travel journal,
//! together with the status partitioning and date helpers shared by the
//! store, suggestion, and journal layers.

use crate::error::WayfarerError;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A travel location in the journal
///
/// Identity is the `id` field, assigned client-side at creation time and
/// used as the document id in the store. Dates are epoch milliseconds with
/// date-only precision; an absent date means "not decided yet".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Unique identifier (UUID string)
    pub id: String,
    /// Place name; the only mandatory user-provided field
    pub name: String,
    /// Country the place belongs to; may be empty
    pub country: String,
    /// Ordered free-text notes, user-reorderable
    #[serde(default)]
    pub notes: Vec<String>,
    /// Whether the trip is still planned or already taken
    #[serde(default)]
    pub status: LocationStatus,
    /// Trip start, epoch milliseconds
    #[serde(default)]
    pub start_date: Option<i64>,
    /// Trip end, epoch milliseconds
    #[serde(default)]
    pub end_date: Option<i64>,
}

impl Location {
    /// Creates a new planned location with a fresh id
    ///
    /// # Arguments
    ///
    /// * `name` - Place name
    /// * `country` - Country the place belongs to
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfarer::model::{Location, LocationStatus};
    ///
    /// let location = Location::new("Porto", "Portugal");
    /// assert_eq!(location.status, LocationStatus::Planned);
    /// assert!(location.notes.is_empty());
    /// assert!(!location.id.is_empty());
    /// ```
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            country: country.into(),
            notes: Vec::new(),
            status: LocationStatus::Planned,
            start_date: None,
            end_date: None,
        }
    }
}

/// Lifecycle status of a location
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LocationStatus {
    /// Trip not taken yet
    #[default]
    Planned,
    /// Trip already taken
    Visited,
}

impl LocationStatus {
    /// Wire tag for this status, as stored in documents
    pub fn as_str(&self) -> &'static str {
        match self {
            LocationStatus::Planned => "PLANNED",
            LocationStatus::Visited => "VISITED",
        }
    }
}

impl fmt::Display for LocationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LocationStatus {
    type Err = WayfarerError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "PLANNED" => Ok(LocationStatus::Planned),
            "VISITED" => Ok(LocationStatus::Visited),
            other => Err(WayfarerError::Decode(format!(
                "Unknown location status: {}",
                other
            ))),
        }
    }
}

/// Splits locations into planned and visited groups for display
///
/// Each group is sorted ascending by start date with undated locations
/// first; the sort is stable, so store order is preserved among equal
/// keys.
///
/// # Arguments
///
/// * `locations` - The full collection, in store order
///
/// # Returns
///
/// Returns `(planned, visited)`
///
/// # Examples
///
/// ```
/// use wayfarer::model::{partition_by_status, Location, LocationStatus};
///
/// let mut porto = Location::new("Porto", "Portugal");
/// porto.start_date = Some(1_746_835_200_000);
/// let mut kyoto = Location::new("Kyoto", "Japan");
/// kyoto.status = LocationStatus::Visited;
///
/// let (planned, visited) = partition_by_status(&[porto, kyoto]);
/// assert_eq!(planned.len(), 1);
/// assert_eq!(visited.len(), 1);
/// ```
pub fn partition_by_status(locations: &[Location]) -> (Vec<Location>, Vec<Location>) {
    let mut planned = Vec::new();
    let mut visited = Vec::new();

    for location in locations {
        match location.status {
            LocationStatus::Planned => planned.push(location.clone()),
            LocationStatus::Visited => visited.push(location.clone()),
        }
    }

    // Option<i64> orders None first, which is the display contract for
    // undated trips.
    planned.sort_by_key(|l| l.start_date);
    visited.sort_by_key(|l| l.start_date);

    (planned, visited)
}

/// Formats an epoch-millisecond timestamp as a `yyyy-MM-dd` date (UTC)
pub fn format_date(millis: i64) -> String {
    DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| millis.to_string())
}
