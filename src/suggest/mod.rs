//! AI activity suggestions for Wayfarer
//!
//! This module turns a location plus optional trip context into one or
//! more short activity phrases by prompting a hosted generative-language
//! model. The service converts every generation failure into a fixed,
//! displayable fallback string; callers only ever see a phrase, the
//! no-suggestions sentinel, or that fallback. The single hard error the
//! service can return is an identity failure, which aborts just the
//! request that needed the token.

pub mod gemini;
pub mod prompt;

pub use gemini::GeminiClient;

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{IdentityProvider, IdentityToken};
use crate::config::SuggestionConfig;
use crate::error::Result;

/// Fixed reply the model is instructed to return for unrecognized places
///
/// This is a valid, displayable result, not an error; it flows to the
/// screen like any other suggestion.
pub const NO_SUGGESTIONS_SENTINEL: &str = "⚠️ No travel suggestions available for this location.";

/// Shown in place of a suggestion when generation fails
pub const GENERATION_FALLBACK: &str = "Suggestion generation failed, please try again.";

/// Most phrases a list request returns
pub const MAX_LIST_SUGGESTIONS: usize = 5;

/// Context for one suggestion request
///
/// # Examples
///
/// ```
/// use wayfarer::suggest::SuggestionRequest;
///
/// let request = SuggestionRequest::new("Porto")
///     .with_country("Portugal")
///     .with_dates(Some(1_746_835_200_000), None)
///     .with_exclusions(vec!["Livraria Lello".to_string()]);
/// assert_eq!(request.place, "Porto");
/// ```
#[derive(Debug, Clone, Default)]
pub struct SuggestionRequest {
    /// Place name as the user entered it
    pub place: String,
    /// Optional country qualifier; blank values are ignored
    pub country: Option<String>,
    /// Trip start, epoch milliseconds
    pub start_date: Option<i64>,
    /// Trip end, epoch milliseconds
    pub end_date: Option<i64>,
    /// Phrases the user already has; the single-suggestion prompt asks
    /// the model to avoid them
    pub exclusions: Vec<String>,
}

impl SuggestionRequest {
    /// Create a request for the given place with no extra context
    pub fn new(place: &str) -> Self {
        Self {
            place: place.to_string(),
            ..Self::default()
        }
    }

    /// Set the country qualifier
    pub fn with_country(mut self, country: &str) -> Self {
        self.country = Some(country.to_string());
        self
    }

    /// Set the trip date range, epoch milliseconds
    pub fn with_dates(mut self, start_date: Option<i64>, end_date: Option<i64>) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    /// Set the exclusion list
    pub fn with_exclusions(mut self, exclusions: Vec<String>) -> Self {
        self.exclusions = exclusions;
        self
    }
}

/// Transport to a generative-language model
///
/// The one seam the suggestion service talks through; tests substitute
/// an in-process fake, production uses [`GeminiClient`].
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send one prompt and return the model's raw text
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::WayfarerError::GenerationStopped`] for an
    /// abnormal finish and [`crate::error::WayfarerError::Generation`]
    /// for transport or protocol failures.
    async fn generate(&self, prompt: &str, token: Option<&IdentityToken>) -> Result<String>;
}

/// Activity suggestion service
///
/// Builds prompts, drives the generative client, and normalizes replies
/// into short displayable phrases.
pub struct SuggestionService {
    client: Arc<dyn GenerativeClient>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl SuggestionService {
    /// Create a service over an existing client
    ///
    /// # Arguments
    ///
    /// * `client` - Generative transport
    /// * `identity` - Identity provider; `None` sends requests
    ///   unauthenticated
    pub fn new(
        client: Arc<dyn GenerativeClient>,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        Self { client, identity }
    }

    /// Create a service from configuration, backed by [`GeminiClient`]
    ///
    /// # Errors
    ///
    /// Returns error if the client cannot be constructed
    pub fn from_config(
        config: &SuggestionConfig,
        identity: Option<Arc<dyn IdentityProvider>>,
    ) -> Result<Self> {
        let client = GeminiClient::new(config.gemini.clone())?;
        Ok(Self::new(Arc::new(client), identity))
    }

    /// Request exactly one activity phrase
    ///
    /// Returns, in order of preference: the model's phrase (bullet and
    /// whitespace stripped), the no-suggestions sentinel for empty
    /// replies, or [`GENERATION_FALLBACK`] when generation failed.
    ///
    /// # Errors
    ///
    /// The only error is an identity failure; it aborts this request and
    /// nothing else.
    pub async fn request_single(&self, request: &SuggestionRequest) -> Result<String> {
        let token = self.acquire_token().await?;
        let prompt = prompt::generate_single_prompt(request);

        tracing::debug!("Requesting suggestion: place={}", request.place);

        match self.client.generate(&prompt, token.as_ref()).await {
            Ok(text) => {
                let suggestion = tidy_suggestion_line(&text);
                if suggestion.is_empty() {
                    Ok(NO_SUGGESTIONS_SENTINEL.to_string())
                } else {
                    tracing::info!("New suggestion: {}", suggestion);
                    Ok(suggestion)
                }
            }
            Err(e) => {
                tracing::warn!("Suggestion generation failed: {}", e);
                Ok(GENERATION_FALLBACK.to_string())
            }
        }
    }

    /// Request up to [`MAX_LIST_SUGGESTIONS`] activity phrases
    ///
    /// Failure and empty-reply cases yield a one-element vector carrying
    /// the fallback or sentinel, so the result is always displayable.
    ///
    /// # Errors
    ///
    /// The only error is an identity failure; it aborts this request and
    /// nothing else.
    pub async fn request_list(&self, request: &SuggestionRequest) -> Result<Vec<String>> {
        let token = self.acquire_token().await?;
        let prompt = prompt::generate_list_prompt(request);

        tracing::debug!("Requesting suggestion list: place={}", request.place);

        match self.client.generate(&prompt, token.as_ref()).await {
            Ok(text) => {
                let suggestions = parse_suggestion_list(&text);
                if suggestions.is_empty() {
                    Ok(vec![NO_SUGGESTIONS_SENTINEL.to_string()])
                } else {
                    tracing::info!("New suggestions: {}", suggestions.join(", "));
                    Ok(suggestions)
                }
            }
            Err(e) => {
                tracing::warn!("Suggestion generation failed: {}", e);
                Ok(vec![GENERATION_FALLBACK.to_string()])
            }
        }
    }

    async fn acquire_token(&self) -> Result<Option<IdentityToken>> {
        match &self.identity {
            Some(provider) => provider.ensure_signed_in().await.map(Some),
            None => Ok(None),
        }
    }
}

/// Strips one leading bullet marker and surrounding whitespace
fn tidy_suggestion_line(line: &str) -> String {
    let trimmed = line.trim();
    let without_bullet = trimmed
        .strip_prefix('•')
        .or_else(|| trimmed.strip_prefix('-'))
        .or_else(|| trimmed.strip_prefix('*'))
        .unwrap_or(trimmed);
    without_bullet.trim().to_string()
}

/// Splits a line-delimited reply into tidy phrases, in model order
fn parse_suggestion_list(text: &str) -> Vec<String> {
    text.lines()
        .map(tidy_suggestion_line)
        .filter(|line| !line.is_empty())
        .take(MAX_LIST_SUGGESTIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WayfarerError;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    /// Canned generative client that records every prompt and token it
    /// was handed
    struct FakeClient {
        reply: Mutex<Option<Result<String>>>,
        prompts: Mutex<Vec<String>>,
        tokens: Mutex<Vec<Option<String>>>,
    }

    impl FakeClient {
        fn replying(text: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Ok(text.to_string()))),
                prompts: Mutex::new(Vec::new()),
                tokens: Mutex::new(Vec::new()),
            })
        }

        fn failing(error: WayfarerError) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(Some(Err(error.into()))),
                prompts: Mutex::new(Vec::new()),
                tokens: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl GenerativeClient for FakeClient {
        async fn generate(&self, prompt: &str, token: Option<&IdentityToken>) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.tokens
                .lock()
                .unwrap()
                .push(token.map(|t| t.token.clone()));
            self.reply
                .lock()
                .unwrap()
                .take()
                .unwrap_or_else(|| Ok(String::new()))
        }
    }

    struct FakeIdentity {
        calls: AtomicUsize,
    }

    impl FakeIdentity {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeIdentity {
        async fn ensure_signed_in(&self) -> Result<IdentityToken> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(IdentityToken {
                user_id: "fake-user".to_string(),
                token: format!("fake-token-{}", call),
                expires_at: Instant::now() + Duration::from_secs(3600),
            })
        }
    }

    struct FailingIdentity;

    #[async_trait]
    impl IdentityProvider for FailingIdentity {
        async fn ensure_signed_in(&self) -> Result<IdentityToken> {
            Err(WayfarerError::Identity("no session".to_string()).into())
        }
    }

    #[test]
    fn test_tidy_strips_each_bullet_kind() {
        assert_eq!(tidy_suggestion_line("• Louvre Museum"), "Louvre Museum");
        assert_eq!(tidy_suggestion_line("- Louvre Museum"), "Louvre Museum");
        assert_eq!(tidy_suggestion_line("* Louvre Museum"), "Louvre Museum");
        assert_eq!(tidy_suggestion_line("  Louvre Museum  "), "Louvre Museum");
    }

    #[test]
    fn test_tidy_keeps_sentinel_intact() {
        assert_eq!(
            tidy_suggestion_line(NO_SUGGESTIONS_SENTINEL),
            NO_SUGGESTIONS_SENTINEL
        );
    }

    #[test]
    fn test_parse_drops_blank_lines_and_strips_bullets() {
        let parsed =
            parse_suggestion_list("• Louvre Museum\n• Seine River Cruise\n\n• Eiffel Tower");
        assert_eq!(
            parsed,
            vec!["Louvre Museum", "Seine River Cruise", "Eiffel Tower"]
        );
    }

    #[test]
    fn test_parse_preserves_model_order() {
        let parsed = parse_suggestion_list("- Zoo\n- Aquarium\n- Beach");
        assert_eq!(parsed, vec!["Zoo", "Aquarium", "Beach"]);
    }

    #[test]
    fn test_parse_caps_the_list() {
        let text = (1..=8)
            .map(|i| format!("• Stop {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let parsed = parse_suggestion_list(&text);
        assert_eq!(parsed.len(), MAX_LIST_SUGGESTIONS);
        assert_eq!(parsed[0], "Stop 1");
        assert_eq!(parsed[4], "Stop 5");
    }

    #[tokio::test]
    async fn test_single_tidies_the_reply() {
        let client = FakeClient::replying("  • Louvre Museum \n");
        let service = SuggestionService::new(client, None);

        let suggestion = service
            .request_single(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();
        assert_eq!(suggestion, "Louvre Museum");
    }

    #[tokio::test]
    async fn test_single_empty_reply_becomes_sentinel() {
        let client = FakeClient::replying("   \n  ");
        let service = SuggestionService::new(client, None);

        let suggestion = service
            .request_single(&SuggestionRequest::new("Atlantis"))
            .await
            .unwrap();
        assert_eq!(suggestion, NO_SUGGESTIONS_SENTINEL);
    }

    #[tokio::test]
    async fn test_single_sentinel_passes_verbatim() {
        let client = FakeClient::replying(NO_SUGGESTIONS_SENTINEL);
        let service = SuggestionService::new(client, None);

        let suggestion = service
            .request_single(&SuggestionRequest::new("Atlantis"))
            .await
            .unwrap();
        assert_eq!(suggestion, NO_SUGGESTIONS_SENTINEL);
    }

    #[tokio::test]
    async fn test_single_failure_becomes_fallback() {
        let client = FakeClient::failing(WayfarerError::Generation("boom".to_string()));
        let service = SuggestionService::new(client, None);

        let suggestion = service
            .request_single(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();
        assert_eq!(suggestion, GENERATION_FALLBACK);
    }

    #[tokio::test]
    async fn test_single_stopped_generation_becomes_fallback() {
        let client = FakeClient::failing(WayfarerError::GenerationStopped {
            reason: "MAX_TOKENS".to_string(),
        });
        let service = SuggestionService::new(client, None);

        let suggestion = service
            .request_single(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();
        assert_eq!(suggestion, GENERATION_FALLBACK);
    }

    #[tokio::test]
    async fn test_single_serializes_exclusions_into_prompt() {
        let client = FakeClient::replying("Musée d'Orsay");
        let service = SuggestionService::new(Arc::clone(&client) as Arc<dyn GenerativeClient>, None);

        let request = SuggestionRequest::new("Paris")
            .with_exclusions(vec!["Eiffel Tower".to_string(), "Louvre Museum".to_string()]);
        service.request_single(&request).await.unwrap();

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(
            "Do NOT suggest one of the following suggestions: Eiffel Tower, Louvre Museum"
        ));
    }

    #[tokio::test]
    async fn test_identity_failure_aborts_before_generation() {
        let client = FakeClient::replying("never used");
        let service = SuggestionService::new(
            Arc::clone(&client) as Arc<dyn GenerativeClient>,
            Some(Arc::new(FailingIdentity)),
        );

        let result = service.request_single(&SuggestionRequest::new("Paris")).await;
        assert!(result.is_err());
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_identity_token_is_attached() {
        let client = FakeClient::replying("Louvre Museum");
        let service = SuggestionService::new(
            Arc::clone(&client) as Arc<dyn GenerativeClient>,
            Some(FakeIdentity::new()),
        );

        service
            .request_single(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();

        let tokens = client.tokens.lock().unwrap();
        assert_eq!(tokens.as_slice(), [Some("fake-token-1".to_string())]);
    }

    #[tokio::test]
    async fn test_unauthenticated_when_no_identity_configured() {
        let client = FakeClient::replying("Louvre Museum");
        let service = SuggestionService::new(Arc::clone(&client) as Arc<dyn GenerativeClient>, None);

        service
            .request_single(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();

        assert_eq!(client.tokens.lock().unwrap().as_slice(), [None]);
    }

    #[tokio::test]
    async fn test_list_parses_reply_lines() {
        let client = FakeClient::replying("• Louvre Museum\n• Seine River Cruise\n\n• Eiffel Tower");
        let service = SuggestionService::new(client, None);

        let suggestions = service
            .request_list(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();
        assert_eq!(
            suggestions,
            vec!["Louvre Museum", "Seine River Cruise", "Eiffel Tower"]
        );
    }

    #[tokio::test]
    async fn test_list_empty_reply_becomes_sentinel_vector() {
        let client = FakeClient::replying("");
        let service = SuggestionService::new(client, None);

        let suggestions = service
            .request_list(&SuggestionRequest::new("Atlantis"))
            .await
            .unwrap();
        assert_eq!(suggestions, vec![NO_SUGGESTIONS_SENTINEL.to_string()]);
    }

    #[tokio::test]
    async fn test_list_failure_becomes_fallback_vector() {
        let client = FakeClient::failing(WayfarerError::Generation("boom".to_string()));
        let service = SuggestionService::new(client, None);

        let suggestions = service
            .request_list(&SuggestionRequest::new("Paris"))
            .await
            .unwrap();
        assert_eq!(suggestions, vec![GENERATION_FALLBACK.to_string()]);
    }

    #[test]
    fn test_request_builder_sets_every_field() {
        let request = SuggestionRequest::new("Porto")
            .with_country("Portugal")
            .with_dates(Some(1), Some(2))
            .with_exclusions(vec!["Ribeira".to_string()]);

        assert_eq!(request.place, "Porto");
        assert_eq!(request.country.as_deref(), Some("Portugal"));
        assert_eq!(request.start_date, Some(1));
        assert_eq!(request.end_date, Some(2));
        assert_eq!(request.exclusions, vec!["Ribeira".to_string()]);
    }
}
