//! Chat-completion client used to enrich documents with a summary and tags.
//!
//! [`ChatClient::chat_completion`] is the only operation that can fail. The
//! two enrichment operations built on it ([`ChatClient::generate_summary`]
//! and [`ChatClient::generate_tags`]) log every failure and return a defined
//! fallback instead, so callers never see an error from them.

mod prompt;
mod types;

use pressmark_shared::{EnrichmentSettings, PressError, Result};
use reqwest::Client;
use tracing::{debug, instrument, warn};

pub use prompt::{PromptStyle, SUMMARY_MAX_CHARS, TAGS_MAX_CHARS};
pub use types::{ChatMessage, ChatRequest, ChatResponse, Choice, ResponseMessage, Role, Usage};

/// Default chat-completion API base URL.
pub const DEFAULT_BASE_URL: &str = "https://api.siliconflow.cn/v1";

/// Model used when the caller does not pick one.
pub const DEFAULT_MODEL: &str = "Qwen/Qwen3-8B";

/// Returned when the call succeeded but the model replied with nothing.
pub const SUMMARY_UNAVAILABLE: &str = "Unable to generate a summary";

/// Returned when the summary call failed.
pub const SUMMARY_FAILED: &str = "Summary generation failed";

/// User-Agent string for API requests.
const USER_AGENT: &str = concat!("Pressmark/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// ChatClient
// ---------------------------------------------------------------------------

/// Stateless HTTP client for a chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct ChatClient {
    http: Client,
    base_url: String,
    style: PromptStyle,
}

impl ChatClient {
    /// Create a client for the API rooted at `base_url` (e.g. `https://host/v1`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: build_client()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            style: PromptStyle::default(),
        })
    }

    /// Use a different prompt language / tag delimiter.
    pub fn with_style(mut self, style: PromptStyle) -> Self {
        self.style = style;
        self
    }

    pub fn style(&self) -> &PromptStyle {
        &self.style
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Send one chat-completion request.
    ///
    /// Fails with [`PressError::Config`] before any I/O when `api_key` is
    /// empty, [`PressError::Upstream`] on a non-success status or an
    /// unparseable body, and [`PressError::Network`] on transport failure.
    #[instrument(skip_all, fields(model = %request.model))]
    pub async fn chat_completion(&self, api_key: &str, request: &ChatRequest) -> Result<ChatResponse> {
        if api_key.trim().is_empty() {
            return Err(PressError::config("chat-completion API key is not configured"));
        }

        let url = self.endpoint();
        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| PressError::Network(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PressError::upstream(
                Some(status.as_u16()),
                status.canonical_reason().unwrap_or("unknown status"),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| PressError::Network(format!("{url}: failed to read body: {e}")))?;

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            PressError::upstream(
                Some(status.as_u16()),
                format!(
                    "invalid chat-completion response: {e} (got: {})",
                    prompt::truncate_chars(&body, 200)
                ),
            )
        })?;

        debug!(
            id = %parsed.id,
            choices = parsed.choices.len(),
            total_tokens = parsed.usage.total_tokens,
            "chat completion received"
        );

        Ok(parsed)
    }

    /// Summarize `content` in roughly a hundred characters.
    ///
    /// Never fails: an empty reply yields [`SUMMARY_UNAVAILABLE`], any error
    /// yields [`SUMMARY_FAILED`].
    #[instrument(skip_all, fields(content_len = content.len()))]
    pub async fn generate_summary(&self, api_key: &str, content: &str, model: Option<&str>) -> String {
        let request = prompt::summary_request(&self.style, model.unwrap_or(DEFAULT_MODEL), content);

        match self.chat_completion(api_key, &request).await {
            Ok(response) => match response.first_content().map(str::trim) {
                Some(summary) if !summary.is_empty() => summary.to_string(),
                _ => {
                    warn!("model returned an empty summary");
                    SUMMARY_UNAVAILABLE.to_string()
                }
            },
            Err(e) => {
                warn!(error = %e, "summary generation failed");
                SUMMARY_FAILED.to_string()
            }
        }
    }

    /// Generate 3-5 tags for an article.
    ///
    /// Never fails: any error yields an empty list.
    #[instrument(skip_all, fields(title = %title))]
    pub async fn generate_tags(
        &self,
        api_key: &str,
        title: &str,
        content: &str,
        model: Option<&str>,
    ) -> Vec<String> {
        let request =
            prompt::tags_request(&self.style, model.unwrap_or(DEFAULT_MODEL), title, content);

        match self.chat_completion(api_key, &request).await {
            Ok(response) => {
                let tags = prompt::split_tags(
                    response.first_content().unwrap_or_default(),
                    self.style.tag_delimiter(),
                );
                debug!(count = tags.len(), "tags generated");
                tags
            }
            Err(e) => {
                warn!(error = %e, "tag generation failed");
                Vec::new()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// EnrichmentClient
// ---------------------------------------------------------------------------

/// A [`ChatClient`] bound to one API key and model.
#[derive(Clone)]
pub struct EnrichmentClient {
    chat: ChatClient,
    api_key: String,
    model: String,
}

impl std::fmt::Debug for EnrichmentClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentClient")
            .field("chat", &self.chat)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl EnrichmentClient {
    pub fn new(chat: ChatClient, api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            chat,
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    /// Build a client from settings resolved at startup.
    pub fn from_settings(settings: &EnrichmentSettings) -> Result<Self> {
        let chat = ChatClient::new(&settings.base_url)?
            .with_style(PromptStyle::new(&settings.language, &settings.tag_delimiter));
        Ok(Self::new(chat, &settings.api_key, &settings.model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// See [`ChatClient::generate_summary`].
    pub async fn summarize(&self, content: &str) -> String {
        self.chat
            .generate_summary(&self.api_key, content, Some(&self.model))
            .await
    }

    /// See [`ChatClient::generate_tags`].
    pub async fn tags(&self, title: &str, content: &str) -> Vec<String> {
        self.chat
            .generate_tags(&self.api_key, title, content, Some(&self.model))
            .await
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a reqwest client with appropriate settings.
fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| PressError::Network(format!("failed to build HTTP client: {e}")))
}
