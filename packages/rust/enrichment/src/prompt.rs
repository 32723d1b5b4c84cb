//! Prompt construction and reply parsing for the two enrichment tasks.

use crate::types::{ChatMessage, ChatRequest};

/// Maximum characters of article content sent for summarization.
pub const SUMMARY_MAX_CHARS: usize = 4_000;

/// Maximum characters of article content sent for tag generation.
pub const TAGS_MAX_CHARS: usize = 2_000;

/// Target summary length requested from the model, in characters.
const SUMMARY_TARGET_CHARS: usize = 100;

/// Delimiter used when none (or an empty one) is configured.
const DEFAULT_TAG_DELIMITER: &str = ",";

/// Language and tag delimiter the prompts are written for.
///
/// The delimiter named in the tag prompt and the one used to split the reply
/// both come from here, so editing one cannot silently break the other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptStyle {
    language: String,
    tag_delimiter: String,
}

impl PromptStyle {
    pub fn new(language: impl Into<String>, tag_delimiter: impl Into<String>) -> Self {
        let tag_delimiter = tag_delimiter.into();
        let tag_delimiter = if tag_delimiter.trim().is_empty() {
            DEFAULT_TAG_DELIMITER.to_string()
        } else {
            tag_delimiter
        };
        Self {
            language: language.into(),
            tag_delimiter,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn tag_delimiter(&self) -> &str {
        &self.tag_delimiter
    }
}

impl Default for PromptStyle {
    fn default() -> Self {
        Self::new("Simplified Chinese", DEFAULT_TAG_DELIMITER)
    }
}

/// Build the summarization request. `content` is truncated before use.
pub(crate) fn summary_request(style: &PromptStyle, model: &str, content: &str) -> ChatRequest {
    let system = format!(
        "You are a professional editor who writes concise, accurate article summaries. \
         Keep the summary within {SUMMARY_TARGET_CHARS} characters and focus on the \
         article's core viewpoint. Write the summary in {}.",
        style.language
    );
    let user = format!(
        "Summarize the following article:\n\n{}",
        truncate_chars(content, SUMMARY_MAX_CHARS)
    );

    ChatRequest::new(model, vec![ChatMessage::system(system), ChatMessage::user(user)])
        .max_tokens(150)
        .temperature(0.7)
}

/// Build the tag-generation request. `content` is truncated before use.
pub(crate) fn tags_request(
    style: &PromptStyle,
    model: &str,
    title: &str,
    content: &str,
) -> ChatRequest {
    let system = format!(
        "You are a professional editor who tags articles based on their title and content. \
         Reply with the 3-5 most relevant tags separated by \"{}\" and nothing else. \
         Keep each tag short and write the tags in {}.",
        style.tag_delimiter, style.language
    );
    let user = format!(
        "Title: {title}\n\nContent: {}",
        truncate_chars(content, TAGS_MAX_CHARS)
    );

    ChatRequest::new(model, vec![ChatMessage::system(system), ChatMessage::user(user)])
        .max_tokens(100)
        .temperature(0.5)
}

/// Split a tag reply on the configured delimiter, keeping order and duplicates.
pub(crate) fn split_tags(reply: &str, delimiter: &str) -> Vec<String> {
    reply
        .trim()
        .split(delimiter)
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Truncate to at most `max_chars` characters, never splitting a code point.
pub(crate) fn truncate_chars(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &content[..byte_idx],
        None => content,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Role;

    #[test]
    fn truncate_short_content() {
        assert_eq!(truncate_chars("short text", 100), "short text");
    }

    #[test]
    fn truncate_counts_characters_not_bytes() {
        let content = "字".repeat(10);
        let truncated = truncate_chars(&content, 4);
        assert_eq!(truncated.chars().count(), 4);
        assert_eq!(truncated, "字字字字");
    }

    #[test]
    fn summary_request_truncates_before_sending() {
        let content = "x".repeat(SUMMARY_MAX_CHARS + 500);
        let request = summary_request(&PromptStyle::default(), "m", &content);

        assert_eq!(request.messages.len(), 2);
        assert_eq!(request.messages[0].role, Role::System);
        let user = &request.messages[1].content;
        assert_eq!(user.matches('x').count(), SUMMARY_MAX_CHARS);
        assert_eq!(request.max_tokens, Some(150));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[test]
    fn tags_request_carries_title_and_delimiter() {
        let style = PromptStyle::new("English", "，");
        let content = "b".repeat(TAGS_MAX_CHARS * 2);
        let request = tags_request(&style, "m", "My Title", &content);

        assert!(request.messages[0].content.contains("\"，\""));
        assert!(request.messages[0].content.contains("English"));
        let user = &request.messages[1].content;
        assert!(user.starts_with("Title: My Title"));
        assert_eq!(user.matches('b').count(), TAGS_MAX_CHARS);
        assert_eq!(request.temperature, Some(0.5));
    }

    #[test]
    fn split_tags_trims_and_drops_empties() {
        assert_eq!(
            split_tags("tag1, tag2, tag3", ","),
            vec!["tag1", "tag2", "tag3"]
        );
        assert_eq!(split_tags(" a,, b ,", ","), vec!["a", "b"]);
        assert!(split_tags("", ",").is_empty());
    }

    #[test]
    fn split_tags_keeps_duplicates_and_order() {
        assert_eq!(split_tags("rust,go,rust", ","), vec!["rust", "go", "rust"]);
    }

    #[test]
    fn mismatched_delimiter_yields_single_tag() {
        assert_eq!(split_tags("前端，性能", ","), vec!["前端，性能"]);
        assert_eq!(split_tags("前端，性能", "，"), vec!["前端", "性能"]);
    }

    #[test]
    fn empty_delimiter_falls_back_to_comma() {
        assert_eq!(PromptStyle::new("English", "").tag_delimiter(), ",");
    }
}
