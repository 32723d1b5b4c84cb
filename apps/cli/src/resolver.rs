//! Cover image resolvers available from the command line.

use pressmark_core::ImageResolver;
use pressmark_shared::{Document, PressError, Result};
use reqwest::Client;
use tracing::debug;
use url::Url;

/// How cover images are resolved when no image host is configured.
#[derive(Debug, Clone)]
pub(crate) enum CoverResolver {
    /// Keep the source string as the hosted URL, relative paths included.
    Passthrough,
    /// Keep the source URL, but fail unless it is absolute and a `HEAD`
    /// request succeeds.
    Verify(Client),
}

impl CoverResolver {
    pub(crate) fn verifying() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("Pressmark/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PressError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::Verify(client))
    }
}

impl ImageResolver for CoverResolver {
    async fn upload_image_from_url(&self, url: &str, doc: &Document) -> Result<String> {
        let Self::Verify(client) = self else {
            return Ok(url.to_string());
        };

        let parsed = Url::parse(url).map_err(|e| PressError::resolution(url, e.to_string()))?;
        let response = client
            .head(parsed)
            .send()
            .await
            .map_err(|e| PressError::resolution(url, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PressError::resolution(url, format!("HTTP {status}")));
        }
        debug!(url, title = %doc.title, "cover verified");

        Ok(url.to_string())
    }
}
