//! Anonymous identity for Wayfarer
//!
//! Suggestion requests can be required to carry an identity token. This
//! module obtains one with sign-in-if-absent semantics against the
//! identity service's REST API: a cached, unexpired token is reused
//! without a network call, otherwise a new anonymous session is created.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::IdentityConfig;
use crate::error::{Result, WayfarerError};

/// Public endpoint of the identity service
const DEFAULT_API_BASE: &str = "https://identitytoolkit.googleapis.com";

/// Tokens this close to expiry are refreshed instead of reused
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// A signed-in identity, as returned by [`IdentityProvider::ensure_signed_in`]
#[derive(Debug, Clone)]
pub struct IdentityToken {
    /// Opaque user id of the anonymous session
    pub user_id: String,
    /// Bearer token to attach to authenticated requests
    pub token: String,
    /// Instant past which the token must not be used
    pub expires_at: Instant,
}

impl IdentityToken {
    /// Whether the token is expired or within the refresh margin of it
    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_MARGIN >= self.expires_at
    }
}

/// Source of identity tokens for authenticated request paths
///
/// Implementations must be cheap to call repeatedly: `ensure_signed_in`
/// is invoked before every request that needs a token, and is expected
/// to serve from a cache when a live session exists.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Return a valid token, signing in first if no live session exists
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Identity`] if a session cannot be
    /// established. The failure is scoped to the caller's request; no
    /// shared state is poisoned.
    async fn ensure_signed_in(&self) -> Result<IdentityToken>;
}

/// Anonymous sign-in against the hosted identity service
///
/// Holds at most one session. The cache sits behind a lock so that
/// concurrent suggestion requests share a single sign-in instead of
/// racing to create several.
pub struct AnonymousIdentity {
    client: Client,
    config: IdentityConfig,
    cached: Mutex<Option<IdentityToken>>,
}

#[derive(Debug, Serialize)]
struct SignUpRequest {
    #[serde(rename = "returnSecureToken")]
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    id_token: String,
    local_id: String,
    /// Token lifetime in seconds, delivered as a decimal string
    expires_in: String,
}

impl AnonymousIdentity {
    /// Create a new anonymous identity provider
    ///
    /// # Arguments
    ///
    /// * `config` - Identity configuration (API key, endpoint override)
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: IdentityConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("wayfarer/0.1.0")
            .build()
            .map_err(|e| {
                WayfarerError::Identity(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            config,
            cached: Mutex::new(None),
        })
    }

    fn sign_up_url(&self) -> String {
        format!(
            "{}/v1/accounts:signUp",
            self.config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE)
        )
    }

    async fn sign_up(&self) -> Result<IdentityToken> {
        tracing::debug!("Creating anonymous identity session");

        let mut request = self.client.post(self.sign_up_url()).json(&SignUpRequest {
            return_secure_token: true,
        });
        if !self.config.api_key.is_empty() {
            request = request.query(&[("key", self.config.api_key.as_str())]);
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!("Identity sign-in failed: {}", e);
            WayfarerError::Identity(format!("Identity sign-in failed: {}", e))
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Identity service returned error {}: {}", status, error_text);
            return Err(WayfarerError::Identity(format!(
                "Identity service returned error {}: {}",
                status, error_text
            ))
            .into());
        }

        let body: SignUpResponse = response.json().await.map_err(|e| {
            tracing::error!("Failed to parse identity response: {}", e);
            WayfarerError::Identity(format!("Failed to parse identity response: {}", e))
        })?;

        let lifetime_secs: u64 = body.expires_in.parse().map_err(|e| {
            WayfarerError::Identity(format!(
                "Identity response has invalid expiry {:?}: {}",
                body.expires_in, e
            ))
        })?;

        tracing::info!("Anonymous identity established: user_id={}", body.local_id);

        Ok(IdentityToken {
            user_id: body.local_id,
            token: body.id_token,
            expires_at: Instant::now() + Duration::from_secs(lifetime_secs),
        })
    }
}

#[async_trait]
impl IdentityProvider for AnonymousIdentity {
    async fn ensure_signed_in(&self) -> Result<IdentityToken> {
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if !token.is_expired() {
                return Ok(token.clone());
            }
            tracing::debug!("Cached identity token expired, refreshing");
        }

        let token = self.sign_up().await?;
        *cached = Some(token.clone());
        Ok(token)
    }
}

/// Create the identity provider named by the configuration
///
/// Returns `None` when identity is disabled; suggestion requests then go
/// out unauthenticated.
pub fn create_identity_provider(
    config: &IdentityConfig,
) -> Result<Option<Arc<dyn IdentityProvider>>> {
    if !config.enabled {
        tracing::debug!("Identity disabled, requests will be unauthenticated");
        return Ok(None);
    }
    Ok(Some(Arc::new(AnonymousIdentity::new(config.clone())?)))
}
