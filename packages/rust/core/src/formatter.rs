//! Document formatter: turns one fetched document into a publish-ready one.
//!
//! The pipeline runs these steps in order:
//! 1. Resolve the cover image through the injected [`ImageResolver`]
//! 2. Normalize `publishDate`
//! 3. Enrich with a description and tags (only when an [`Enricher`] is set)
//! 4. Normalize `updatedDate`
//! 5. Expand single newlines in the body into blank-line paragraph breaks
//! 6. Hand the document to the injected [`Serializer`]
//!
//! Cover resolution failures abort formatting. Enrichment failures never do,
//! including an enricher that panics (with the default `panic = "unwind"`).

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use chrono::Utc;
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use pressmark_enrichment::EnrichmentClient;
use pressmark_markdown::MatterMarkdownAdapter;
use pressmark_shared::types::{COVER, DESCRIPTION, TAGS};
use pressmark_shared::{Document, EnrichmentSettings, PressError, Result};

use crate::dates;

// ---------------------------------------------------------------------------
// Collaborator seams
// ---------------------------------------------------------------------------

/// Uploads a remote image to the publishing host.
pub trait ImageResolver: Send + Sync {
    /// Return the hosted URL for the image at `url`, referenced by `doc`.
    fn upload_image_from_url(
        &self,
        url: &str,
        doc: &Document,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Produces the final artifact from a normalized document.
pub trait Serializer {
    type Output;

    fn adapt(&self, doc: Document) -> Result<Self::Output>;
}

impl Serializer for MatterMarkdownAdapter {
    type Output = String;

    fn adapt(&self, doc: Document) -> Result<String> {
        self.render(&doc)
    }
}

/// AI-generated metadata for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    pub description: String,
    pub tags: Vec<String>,
}

/// Produces a description and tags from a document's title and body.
pub trait Enricher: Send + Sync {
    fn enrich(&self, title: &str, body: &str) -> impl Future<Output = Result<Enrichment>> + Send;
}

impl Enricher for EnrichmentClient {
    /// Summary first, then tags; the tag request is not sent until the
    /// summary call has finished.
    async fn enrich(&self, title: &str, body: &str) -> Result<Enrichment> {
        let description = self.summarize(body).await;
        let tags = self.tags(title, body).await;
        Ok(Enrichment { description, tags })
    }
}

// ---------------------------------------------------------------------------
// Formatter
// ---------------------------------------------------------------------------

/// The formatting pipeline, parameterized by an optional enrichment stage.
#[derive(Debug, Clone)]
pub struct Formatter<S, E = EnrichmentClient> {
    serializer: S,
    enricher: Option<E>,
}

impl<S: Serializer> Formatter<S, EnrichmentClient> {
    /// Build the production formatter. `None` settings disable enrichment.
    pub fn from_settings(serializer: S, settings: Option<&EnrichmentSettings>) -> Result<Self> {
        let enricher = settings.map(EnrichmentClient::from_settings).transpose()?;
        if let Some(client) = &enricher {
            info!(model = client.model(), "AI enrichment enabled");
        }
        Ok(Self {
            serializer,
            enricher,
        })
    }

    /// Formatter that never calls an enrichment backend.
    pub fn without_enrichment(serializer: S) -> Self {
        Self {
            serializer,
            enricher: None,
        }
    }
}

impl<S: Serializer, E: Enricher> Formatter<S, E> {
    pub fn new(serializer: S, enricher: Option<E>) -> Self {
        Self {
            serializer,
            enricher,
        }
    }

    pub fn enrichment_enabled(&self) -> bool {
        self.enricher.is_some()
    }

    /// Normalize one document and serialize it.
    ///
    /// Fails only when the cover image cannot be resolved or the serializer
    /// rejects the document.
    #[instrument(skip_all, fields(title = %doc.title))]
    pub async fn format<R: ImageResolver>(&self, mut doc: Document, resolver: &R) -> Result<S::Output> {
        resolve_cover(&mut doc, resolver).await?;

        dates::normalize_publish_date(&mut doc.properties, Utc::now());

        if let Some(enricher) = &self.enricher {
            enrich(enricher, &mut doc).await;
        }

        dates::normalize_updated_date(&mut doc.properties);

        doc.body = expand_newlines(&doc.body);

        debug!(properties = doc.properties.len(), "document normalized");
        self.serializer.adapt(doc)
    }
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

async fn resolve_cover<R: ImageResolver>(doc: &mut Document, resolver: &R) -> Result<()> {
    let Some(cover) = doc.cover().map(String::from) else {
        return Ok(());
    };

    let hosted = resolver
        .upload_image_from_url(&cover, doc)
        .await
        .map_err(|e| match e {
            PressError::Resolution { .. } => e,
            other => PressError::resolution(&cover, other.to_string()),
        })?;

    debug!(from = %cover, to = %hosted, "cover resolved");
    doc.properties.insert(COVER.into(), Value::String(hosted));
    Ok(())
}

/// Write description and tags. Errors and panics are logged and swallowed.
///
/// An empty tag list is the client's failure fallback, so it does not
/// overwrite tags the document already carries.
async fn enrich<E: Enricher>(enricher: &E, doc: &mut Document) {
    let outcome = AssertUnwindSafe(enricher.enrich(&doc.title, &doc.body))
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(Enrichment { description, tags })) => {
            debug!(tags = tags.len(), "enrichment complete");
            doc.properties
                .insert(DESCRIPTION.into(), Value::String(description));
            if !tags.is_empty() {
                let tags = tags.into_iter().map(Value::String).collect();
                doc.properties.insert(TAGS.into(), Value::Array(tags));
            }
        }
        Ok(Err(e)) => {
            warn!(error = %e, "enrichment failed, continuing without it");
        }
        Err(payload) => {
            warn!(
                panic = panic_message(payload.as_ref()),
                "enrichment panicked, continuing without it"
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Turn every newline into a blank line. Not idempotent.
fn expand_newlines(body: &str) -> String {
    body.replace('\n', "\n\n")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::DateTime;
    use pressmark_enrichment::{ChatClient, SUMMARY_FAILED};
    use pressmark_shared::types::{DATE, PUBLISH_DATE, UPDATED, UPDATED_DATE};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Serializer that hands back the normalized document.
    struct Identity;

    impl Serializer for Identity {
        type Output = Document;

        fn adapt(&self, doc: Document) -> Result<Document> {
            Ok(doc)
        }
    }

    struct FixedResolver {
        hosted: &'static str,
        calls: AtomicUsize,
    }

    impl FixedResolver {
        fn new(hosted: &'static str) -> Self {
            Self {
                hosted,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl ImageResolver for FixedResolver {
        async fn upload_image_from_url(&self, _url: &str, _doc: &Document) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.hosted.to_string())
        }
    }

    struct FailingResolver;

    impl ImageResolver for FailingResolver {
        async fn upload_image_from_url(&self, url: &str, _doc: &Document) -> Result<String> {
            Err(PressError::Network(format!("{url}: connection reset")))
        }
    }

    /// Enricher that records what it saw and replies with a fixed result.
    struct StubEnricher {
        result: Result<Enrichment>,
        seen_body: Mutex<Option<String>>,
    }

    impl StubEnricher {
        fn ok(description: &str, tags: &[&str]) -> Self {
            Self {
                result: Ok(Enrichment {
                    description: description.into(),
                    tags: tags.iter().map(|t| t.to_string()).collect(),
                }),
                seen_body: Mutex::new(None),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(PressError::Enrichment("backend exploded".into())),
                seen_body: Mutex::new(None),
            }
        }
    }

    impl Enricher for StubEnricher {
        async fn enrich(&self, _title: &str, body: &str) -> Result<Enrichment> {
            *self.seen_body.lock().unwrap() = Some(body.to_string());
            match &self.result {
                Ok(enrichment) => Ok(enrichment.clone()),
                Err(e) => Err(PressError::Enrichment(e.to_string())),
            }
        }
    }

    struct PanickingEnricher;

    impl Enricher for PanickingEnricher {
        async fn enrich(&self, _title: &str, _body: &str) -> Result<Enrichment> {
            panic!("enricher blew up");
        }
    }

    fn plain() -> Formatter<Identity> {
        Formatter::without_enrichment(Identity)
    }

    fn sample() -> Document {
        Document::new("T", "line1\nline2")
            .with_property(DATE, "2024-05-01")
            .with_property(COVER, "http://x/img.png")
    }

    #[tokio::test]
    async fn end_to_end_without_enrichment() {
        let resolver = FixedResolver::new("https://cdn.example.com/img.png");
        let doc = plain().format(sample(), &resolver).await.unwrap();

        assert_eq!(doc.properties[PUBLISH_DATE], "2024-05-01T00:00:00.000Z");
        assert!(!doc.properties.contains_key(DATE));
        assert_eq!(doc.properties[COVER], "https://cdn.example.com/img.png");
        assert_eq!(doc.body, "line1\n\nline2");
        assert!(!doc.properties.contains_key(DESCRIPTION));
        assert!(!doc.properties.contains_key(TAGS));
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn no_cover_means_no_resolver_call() {
        let resolver = FixedResolver::new("unused");
        let doc = Document::new("T", "body");
        plain().format(doc, &resolver).await.unwrap();
        assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cover_failure_is_fatal() {
        let err = plain().format(sample(), &FailingResolver).await.unwrap_err();
        match err {
            PressError::Resolution { url, message } => {
                assert_eq!(url, "http://x/img.png");
                assert!(message.contains("connection reset"));
            }
            other => panic!("expected Resolution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn date_takes_precedence_over_publish_date() {
        let doc = Document::new("T", "")
            .with_property(DATE, "2024-01-01")
            .with_property(PUBLISH_DATE, "2099-01-01");
        let doc = plain()
            .format(doc, &FixedResolver::new("unused"))
            .await
            .unwrap();
        assert_eq!(doc.properties[PUBLISH_DATE], "2024-01-01T00:00:00.000Z");
        assert!(!doc.properties.contains_key(DATE));
    }

    #[tokio::test]
    async fn missing_dates_default_to_now() {
        let before = Utc::now();
        let doc = plain()
            .format(Document::new("T", ""), &FixedResolver::new("unused"))
            .await
            .unwrap();
        let after = Utc::now();

        let written = doc.properties[PUBLISH_DATE].as_str().unwrap();
        let parsed = DateTime::parse_from_rfc3339(written)
            .unwrap()
            .with_timezone(&Utc);
        // Millisecond truncation can put the value just before `before`.
        assert!(parsed >= before - chrono::Duration::milliseconds(1));
        assert!(parsed <= after);
    }

    #[tokio::test]
    async fn updated_dates_keep_their_asymmetry() {
        let resolver = FixedResolver::new("unused");

        let legacy = Document::new("T", "").with_property(UPDATED, "2024-02-03");
        let doc = plain().format(legacy, &resolver).await.unwrap();
        assert_eq!(doc.properties[UPDATED_DATE], "2024-02-03T00:00:00.000Z");
        assert!(!doc.properties.contains_key(UPDATED));

        let canonical = Document::new("T", "").with_property(UPDATED_DATE, "2024/02/03");
        let doc = plain().format(canonical, &resolver).await.unwrap();
        assert_eq!(doc.properties[UPDATED_DATE], "2024/02/03");
    }

    #[tokio::test]
    async fn body_expansion_is_not_idempotent() {
        let resolver = FixedResolver::new("unused");
        let once = plain()
            .format(Document::new("T", "a\nb"), &resolver)
            .await
            .unwrap();
        assert_eq!(once.body, "a\n\nb");

        let twice = plain().format(once, &resolver).await.unwrap();
        assert_eq!(twice.body, "a\n\n\n\nb");
    }

    #[tokio::test]
    async fn enrichment_writes_description_and_tags() {
        let enricher = StubEnricher::ok("A summary.", &["rust", "cli"]);
        let formatter = Formatter::new(Identity, Some(enricher));
        assert!(formatter.enrichment_enabled());

        let doc = formatter
            .format(sample(), &FixedResolver::new("hosted"))
            .await
            .unwrap();

        assert_eq!(doc.properties[DESCRIPTION], "A summary.");
        assert_eq!(doc.properties[TAGS], json!(["rust", "cli"]));
        // Enrichment sees the body before newline expansion.
        let seen = formatter.enricher.as_ref().unwrap().seen_body.lock().unwrap().clone();
        assert_eq!(seen.as_deref(), Some("line1\nline2"));
    }

    #[tokio::test]
    async fn empty_tags_keep_existing_tags() {
        let formatter = Formatter::new(Identity, Some(StubEnricher::ok("S", &[])));
        let doc = Document::new("T", "").with_property(TAGS, json!(["source"]));
        let doc = formatter
            .format(doc, &FixedResolver::new("unused"))
            .await
            .unwrap();
        assert_eq!(doc.properties[TAGS], json!(["source"]));
    }

    #[tokio::test]
    async fn enrichment_failure_does_not_abort_formatting() {
        let formatter = Formatter::new(Identity, Some(StubEnricher::failing()));
        let doc = formatter
            .format(sample(), &FixedResolver::new("hosted"))
            .await
            .unwrap();

        assert!(!doc.properties.contains_key(DESCRIPTION));
        assert!(!doc.properties.contains_key(TAGS));
        assert_eq!(doc.body, "line1\n\nline2");
        assert_eq!(doc.properties[PUBLISH_DATE], "2024-05-01T00:00:00.000Z");
    }

    #[tokio::test]
    async fn panicking_enricher_does_not_abort_formatting() {
        let formatter = Formatter::new(Identity, Some(PanickingEnricher));
        let doc = formatter
            .format(sample(), &FixedResolver::new("hosted"))
            .await
            .unwrap();

        assert!(!doc.properties.contains_key(DESCRIPTION));
        assert_eq!(doc.properties[COVER], "hosted");
        assert_eq!(doc.body, "line1\n\nline2");
    }

    #[test]
    fn panic_message_reads_common_payloads() {
        let literal: Box<dyn Any + Send> = Box::new("static");
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let other: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(literal.as_ref()), "static");
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }

    fn completion(content: &str) -> serde_json::Value {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000u64,
            "model": "test-model",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 1, "completion_tokens": 1, "total_tokens": 2}
        })
    }

    fn client_for(server: &MockServer) -> EnrichmentClient {
        EnrichmentClient::new(ChatClient::new(server.uri()).unwrap(), "sk-test", "test-model")
    }

    #[tokio::test]
    async fn enrichment_client_runs_summary_then_tags() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"max_tokens": 150})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("Short summary.")))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(json!({"max_tokens": 100})))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion("rust, async")))
            .expect(1)
            .mount(&server)
            .await;

        let formatter = Formatter::new(MatterMarkdownAdapter::default(), Some(client_for(&server)));
        let out = formatter
            .format(sample(), &FixedResolver::new("https://cdn/img.png"))
            .await
            .unwrap();

        assert!(out.contains("description: \"Short summary.\"\n"));
        assert!(out.contains("tags:\n  - \"rust\"\n  - \"async\"\n"));
        assert!(out.ends_with("line1\n\nline2"));

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 2);
        let first: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
        let second: serde_json::Value = serde_json::from_slice(&requests[1].body).unwrap();
        assert_eq!(first["max_tokens"], 150);
        assert_eq!(second["max_tokens"], 100);
    }

    #[tokio::test]
    async fn failing_backend_still_publishes_with_placeholder() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let formatter = Formatter::new(Identity, Some(client_for(&server)));
        let doc = formatter
            .format(sample(), &FixedResolver::new("hosted"))
            .await
            .unwrap();

        assert_eq!(doc.properties[DESCRIPTION], SUMMARY_FAILED);
        assert!(!doc.properties.contains_key(TAGS));
    }

    #[test]
    fn from_settings_without_key_disables_enrichment() {
        let formatter = Formatter::from_settings(Identity, None).unwrap();
        assert!(!formatter.enrichment_enabled());
    }
}
