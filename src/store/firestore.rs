//! Hosted document-database store backend for Wayfarer
//!
//! This module implements the LocationStore trait against the Firestore
//! REST v1 API. Locations are stored as typed field maps under a
//! configurable collection; change subscriptions are implemented as a
//! polling loop that local writes wake immediately.

use crate::config::FirestoreConfig;
use crate::error::{Result, WayfarerError};
use crate::model::{Location, LocationStatus};
use crate::store::{LocationStore, StoreEvent, Subscription};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

/// Public endpoint of the document service
const DEFAULT_API_BASE: &str = "https://firestore.googleapis.com/v1";

/// Capacity of the write-nudge channel; nudges are wake signals only,
/// so lagging receivers simply re-poll.
const WRITE_EVENTS_CAPACITY: usize = 16;

/// Firestore-backed location store
///
/// Documents live at
/// `projects/{project_id}/databases/(default)/documents/{collection}/{id}`.
/// Writes are full-document sets (no update mask), deletes are idempotent,
/// and reads decode record-by-record, skipping records that fail.
///
/// # Examples
///
/// ```no_run
/// use wayfarer::config::FirestoreConfig;
/// use wayfarer::model::Location;
/// use wayfarer::store::{FirestoreStore, LocationStore};
///
/// # tokio_test::block_on(async {
/// let config = FirestoreConfig {
///     project_id: "travel-journal-demo".to_string(),
///     ..FirestoreConfig::default()
/// };
/// let store = FirestoreStore::new(config).unwrap();
///
/// let porto = Location::new("Porto", "Portugal");
/// store.create(&porto).await.unwrap();
/// # });
/// ```
#[derive(Clone)]
pub struct FirestoreStore {
    client: Client,
    config: FirestoreConfig,
    write_events: broadcast::Sender<()>,
}

/// A document as sent to and received from the service
#[derive(Debug, Serialize, Deserialize)]
struct FirestoreDocument {
    /// Full resource path; present in responses, omitted in write bodies
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(default)]
    fields: BTreeMap<String, FirestoreValue>,
}

/// A typed field value in the service's oneof encoding
///
/// External tagging matches the wire shape exactly: a single-key object
/// such as `{"stringValue": "Porto"}`. Integers travel as decimal strings
/// per the API. Value kinds this store never writes (booleans, maps,
/// timestamps) deserialize as errors and surface as decode skips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum FirestoreValue {
    #[serde(rename = "stringValue")]
    String(String),
    #[serde(rename = "integerValue")]
    Integer(String),
    #[serde(rename = "nullValue")]
    Null(serde_json::Value),
    #[serde(rename = "arrayValue")]
    Array(ArrayValue),
}

/// Array payload; the service omits `values` entirely for empty arrays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct ArrayValue {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    values: Vec<FirestoreValue>,
}

/// Response from listing a collection
#[derive(Debug, Deserialize)]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<FirestoreDocument>,
    #[serde(rename = "nextPageToken", default)]
    next_page_token: Option<String>,
}

impl FirestoreStore {
    /// Create a new Firestore-backed store
    ///
    /// # Arguments
    ///
    /// * `config` - Store configuration (project, collection, API key)
    ///
    /// # Returns
    ///
    /// Returns a new FirestoreStore instance
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: FirestoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("wayfarer/0.1.0")
            .build()
            .map_err(|e| WayfarerError::Store(format!("Failed to create HTTP client: {}", e)))?;

        let (write_events, _) = broadcast::channel(WRITE_EVENTS_CAPACITY);

        tracing::info!(
            "Initialized document store: project={}, collection={}",
            config.project_id,
            config.collection
        );

        Ok(Self {
            client,
            config,
            write_events,
        })
    }

    fn api_base(&self) -> &str {
        self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/projects/{}/databases/(default)/documents/{}",
            self.api_base(),
            self.config.project_id,
            self.config.collection
        )
    }

    fn document_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), id)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        if self.config.api_key.is_empty() {
            request
        } else {
            request.query(&[("key", self.config.api_key.as_str())])
        }
    }

    /// Wakes all live subscription pollers after a local write
    fn notify_write(&self) {
        let _ = self.write_events.send(());
    }

    /// Full-document set: creates or replaces the document under the
    /// location's id
    async fn set_document(&self, location: &Location) -> Result<()> {
        let url = self.document_url(&location.id);
        let body = FirestoreDocument {
            name: None,
            fields: encode_fields(location),
        };

        tracing::debug!("Writing location document: id={}", location.id);

        let response = self
            .with_key(self.client.patch(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Document write failed: {}", e);
                WayfarerError::Store(format!("Document write failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Document service returned error {}: {}", status, error_text);
            return Err(WayfarerError::Store(format!(
                "Document service returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        self.notify_write();
        Ok(())
    }

    /// Reads the complete collection, following pagination
    async fn fetch_all(&self) -> Result<Vec<Location>> {
        let url = self.collection_url();
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self.with_key(self.client.get(&url));
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token.as_str())]);
            }

            let response = request.send().await.map_err(|e| {
                tracing::error!("Collection read failed: {}", e);
                WayfarerError::Store(format!("Collection read failed: {}", e))
            })?;

            let status = response.status();
            if !status.is_success() {
                let error_text = response.text().await.unwrap_or_default();
                tracing::error!("Document service returned error {}: {}", status, error_text);
                return Err(WayfarerError::Store(format!(
                    "Document service returned error {}: {}",
                    status, error_text
                ))
                .into());
            }

            let page: ListDocumentsResponse = response.json().await.map_err(|e| {
                tracing::error!("Failed to parse collection response: {}", e);
                WayfarerError::Store(format!("Failed to parse collection response: {}", e))
            })?;

            documents.extend(page.documents);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        let mut locations = Vec::new();
        for document in &documents {
            match decode_document(document) {
                Ok(location) => locations.push(location),
                Err(e) => {
                    tracing::warn!("Skipping undecodable location document: {}", e);
                }
            }
        }

        tracing::debug!("Fetched {} locations", locations.len());
        Ok(locations)
    }
}

#[async_trait]
impl LocationStore for FirestoreStore {
    async fn create(&self, location: &Location) -> Result<()> {
        self.set_document(location).await
    }

    async fn update(&self, location: &Location) -> Result<()> {
        self.set_document(location).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let url = self.document_url(id);

        tracing::debug!("Deleting location document: id={}", id);

        let response = self
            .with_key(self.client.delete(&url))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Document delete failed: {}", e);
                WayfarerError::Store(format!("Document delete failed: {}", e))
            })?;

        let status = response.status();
        // The service acknowledges deletes of missing documents with a
        // success status; a 404 from intermediaries gets the same
        // idempotent treatment.
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Document service returned error {}: {}", status, error_text);
            return Err(WayfarerError::Store(format!(
                "Document service returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        self.notify_write();
        Ok(())
    }

    async fn get_all(&self) -> Result<Vec<Location>> {
        self.fetch_all().await
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Location>> {
        let url = self.document_url(id);

        let response = self
            .with_key(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Document read failed: {}", e);
                WayfarerError::Store(format!("Document read failed: {}", e))
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Document service returned error {}: {}", status, error_text);
            return Err(WayfarerError::Store(format!(
                "Document service returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let document: FirestoreDocument = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse document response: {}", e);
            WayfarerError::Store(format!("Failed to parse document response: {}", e))
        })?;

        decode_document(&document).map(Some)
    }

    fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();

        let store = self.clone();
        let token = cancel.clone();
        let mut write_rx = self.write_events.subscribe();

        tokio::spawn(async move {
            let interval = Duration::from_millis(store.config.poll_interval_ms.max(1));
            let mut last: Option<Vec<Location>> = None;

            loop {
                match store.fetch_all().await {
                    Ok(snapshot) => {
                        // The first fetch always emits; afterwards only
                        // observed changes do.
                        if last.as_ref() != Some(&snapshot) {
                            if tx.send(StoreEvent::Snapshot(snapshot.clone())).is_err() {
                                break;
                            }
                            last = Some(snapshot);
                        }
                    }
                    Err(e) => {
                        tracing::warn!("Subscription poll failed: {}", e);
                        if tx.send(StoreEvent::Error(e.to_string())).is_err() {
                            break;
                        }
                    }
                }

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                    _ = write_rx.recv() => {}
                }
            }

            tracing::debug!("Subscription poll loop ended");
        });

        Subscription::new(rx, cancel)
    }
}

/// Encodes a location as the document field map
///
/// The id is not part of the map; it is carried by the document path.
fn encode_fields(location: &Location) -> BTreeMap<String, FirestoreValue> {
    let mut fields = BTreeMap::new();

    fields.insert(
        "name".to_string(),
        FirestoreValue::String(location.name.clone()),
    );
    fields.insert(
        "country".to_string(),
        FirestoreValue::String(location.country.clone()),
    );
    fields.insert(
        "notes".to_string(),
        FirestoreValue::Array(ArrayValue {
            values: location
                .notes
                .iter()
                .map(|note| FirestoreValue::String(note.clone()))
                .collect(),
        }),
    );
    fields.insert(
        "status".to_string(),
        FirestoreValue::String(location.status.as_str().to_string()),
    );
    fields.insert("startDate".to_string(), encode_millis(location.start_date));
    fields.insert("endDate".to_string(), encode_millis(location.end_date));

    fields
}

fn encode_millis(millis: Option<i64>) -> FirestoreValue {
    match millis {
        Some(value) => FirestoreValue::Integer(value.to_string()),
        None => FirestoreValue::Null(serde_json::Value::Null),
    }
}

/// Decodes a document into a location
///
/// Absent fields take entity defaults, matching documents written by
/// older clients; fields of the wrong kind are decode errors.
fn decode_document(document: &FirestoreDocument) -> Result<Location> {
    let name_path = document
        .name
        .as_deref()
        .ok_or_else(|| WayfarerError::Decode("Document has no resource name".to_string()))?;
    let id = doc_id(name_path);

    let fields = &document.fields;

    Ok(Location {
        id,
        name: decode_string(fields, "name")?,
        country: decode_string(fields, "country")?,
        notes: decode_notes(fields)?,
        status: decode_status(fields)?,
        start_date: decode_millis(fields, "startDate")?,
        end_date: decode_millis(fields, "endDate")?,
    })
}

/// Extracts the document id from its full resource path
fn doc_id(name: &str) -> String {
    name.rsplit('/').next().unwrap_or(name).to_string()
}

fn decode_string(fields: &BTreeMap<String, FirestoreValue>, key: &str) -> Result<String> {
    match fields.get(key) {
        Some(FirestoreValue::String(value)) => Ok(value.clone()),
        None => Ok(String::new()),
        Some(other) => Err(WayfarerError::Decode(format!(
            "Field {} is not a string: {:?}",
            key, other
        ))
        .into()),
    }
}

fn decode_notes(fields: &BTreeMap<String, FirestoreValue>) -> Result<Vec<String>> {
    match fields.get("notes") {
        Some(FirestoreValue::Array(array)) => array
            .values
            .iter()
            .map(|value| match value {
                FirestoreValue::String(note) => Ok(note.clone()),
                other => Err(WayfarerError::Decode(format!(
                    "Note entry is not a string: {:?}",
                    other
                ))
                .into()),
            })
            .collect(),
        None => Ok(Vec::new()),
        Some(other) => Err(WayfarerError::Decode(format!(
            "Field notes is not an array: {:?}",
            other
        ))
        .into()),
    }
}

fn decode_status(fields: &BTreeMap<String, FirestoreValue>) -> Result<LocationStatus> {
    match fields.get("status") {
        Some(FirestoreValue::String(tag)) => Ok(tag.parse()?),
        None => Ok(LocationStatus::default()),
        Some(other) => Err(WayfarerError::Decode(format!(
            "Field status is not a string: {:?}",
            other
        ))
        .into()),
    }
}

fn decode_millis(fields: &BTreeMap<String, FirestoreValue>, key: &str) -> Result<Option<i64>> {
    match fields.get(key) {
        Some(FirestoreValue::Integer(raw)) => raw.parse::<i64>().map(Some).map_err(|e| {
            WayfarerError::Decode(format!("Field {} is not a valid integer: {}", key, e)).into()
        }),
        Some(FirestoreValue::Null(_)) | None => Ok(None),
        Some(other) => Err(WayfarerError::Decode(format!(
            "Field {} is not an integer: {:?}",
            key, other
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_location() -> Location {
        let mut location = Location::new("Porto", "Portugal");
        location.id = "loc-1".to_string();
        location.notes = vec!["Book riverside hotel".to_string(), "Try francesinha".to_string()];
        location.status = LocationStatus::Planned;
        location.start_date = Some(1_746_835_200_000);
        location.end_date = Some(1_747_526_400_000);
        location
    }

    fn document_for(location: &Location) -> FirestoreDocument {
        FirestoreDocument {
            name: Some(format!(
                "projects/demo/databases/(default)/documents/locations/{}",
                location.id
            )),
            fields: encode_fields(location),
        }
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let location = sample_location();
        let document = document_for(&location);
        let decoded = decode_document(&document).unwrap();
        assert_eq!(decoded, location);
    }

    #[test]
    fn test_round_trip_empty_notes_and_absent_dates() {
        let mut location = Location::new("Oslo", "Norway");
        location.id = "loc-2".to_string();

        let document = document_for(&location);
        let decoded = decode_document(&document).unwrap();
        assert_eq!(decoded, location);
        assert!(decoded.notes.is_empty());
        assert!(decoded.start_date.is_none());
    }

    #[test]
    fn test_integer_values_travel_as_strings() {
        let location = sample_location();
        let json = serde_json::to_value(encode_fields(&location)).unwrap();
        assert_eq!(
            json["startDate"],
            serde_json::json!({"integerValue": "1746835200000"})
        );
    }

    #[test]
    fn test_absent_date_encodes_as_null_value() {
        let mut location = sample_location();
        location.end_date = None;
        let json = serde_json::to_value(encode_fields(&location)).unwrap();
        assert_eq!(json["endDate"], serde_json::json!({"nullValue": null}));
    }

    #[test]
    fn test_empty_notes_omit_values_array() {
        let mut location = sample_location();
        location.notes.clear();
        let json = serde_json::to_value(encode_fields(&location)).unwrap();
        assert_eq!(json["notes"], serde_json::json!({"arrayValue": {}}));
    }

    #[test]
    fn test_decode_missing_values_array_as_empty_notes() {
        let json = serde_json::json!({
            "name": "projects/demo/databases/(default)/documents/locations/loc-3",
            "fields": {
                "name": {"stringValue": "Oslo"},
                "notes": {"arrayValue": {}}
            }
        });
        let document: FirestoreDocument = serde_json::from_value(json).unwrap();
        let decoded = decode_document(&document).unwrap();
        assert!(decoded.notes.is_empty());
    }

    #[test]
    fn test_decode_defaults_for_absent_fields() {
        let json = serde_json::json!({
            "name": "projects/demo/databases/(default)/documents/locations/loc-4",
            "fields": {
                "name": {"stringValue": "Kyoto"}
            }
        });
        let document: FirestoreDocument = serde_json::from_value(json).unwrap();
        let decoded = decode_document(&document).unwrap();

        assert_eq!(decoded.id, "loc-4");
        assert_eq!(decoded.name, "Kyoto");
        assert_eq!(decoded.country, "");
        assert_eq!(decoded.status, LocationStatus::Planned);
        assert!(decoded.start_date.is_none());
    }

    #[test]
    fn test_decode_rejects_unknown_status() {
        let json = serde_json::json!({
            "name": "projects/demo/databases/(default)/documents/locations/loc-5",
            "fields": {
                "status": {"stringValue": "WISHLIST"}
            }
        });
        let document: FirestoreDocument = serde_json::from_value(json).unwrap();
        assert!(decode_document(&document).is_err());
    }

    #[test]
    fn test_decode_rejects_wrong_field_kind() {
        let json = serde_json::json!({
            "name": "projects/demo/databases/(default)/documents/locations/loc-6",
            "fields": {
                "startDate": {"stringValue": "2025-05-10"}
            }
        });
        let document: FirestoreDocument = serde_json::from_value(json).unwrap();
        assert!(decode_document(&document).is_err());
    }

    #[test]
    fn test_decode_rejects_document_without_name() {
        let document = FirestoreDocument {
            name: None,
            fields: BTreeMap::new(),
        };
        assert!(decode_document(&document).is_err());
    }

    #[test]
    fn test_unknown_value_kind_fails_deserialization() {
        let json = serde_json::json!({"booleanValue": true});
        let result: std::result::Result<FirestoreValue, _> = serde_json::from_value(json);
        assert!(result.is_err());
    }

    #[test]
    fn test_doc_id_takes_last_path_segment() {
        assert_eq!(
            doc_id("projects/demo/databases/(default)/documents/locations/abc-123"),
            "abc-123"
        );
        assert_eq!(doc_id("abc-123"), "abc-123");
    }

    #[test]
    fn test_store_creation() {
        let config = FirestoreConfig {
            project_id: "demo-project".to_string(),
            ..FirestoreConfig::default()
        };
        assert!(FirestoreStore::new(config).is_ok());
    }

    #[test]
    fn test_collection_url_uses_api_base_override() {
        let config = FirestoreConfig {
            project_id: "demo-project".to_string(),
            api_base: Some("http://localhost:8080/v1".to_string()),
            ..FirestoreConfig::default()
        };
        let store = FirestoreStore::new(config).unwrap();
        assert_eq!(
            store.collection_url(),
            "http://localhost:8080/v1/projects/demo-project/databases/(default)/documents/locations"
        );
    }

    #[test]
    fn test_document_url_appends_id() {
        let config = FirestoreConfig {
            project_id: "demo-project".to_string(),
            api_base: Some("http://localhost:8080/v1".to_string()),
            ..FirestoreConfig::default()
        };
        let store = FirestoreStore::new(config).unwrap();
        assert!(store.document_url("loc-1").ends_with("/locations/loc-1"));
    }
}
