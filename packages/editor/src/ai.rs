//! # AI Collaborator
//!
//! Prompt construction and response parsing around an external completion
//! service. The service itself is a black box behind [`CompletionService`].
//!
//! ## Design
//!
//! A request is built from the live document:
//!
//! - Element scope: the target's outer markup plus a bounded excerpt of its
//!   parent (and, when the budget allows, its grandparent)
//! - Document scope: the whole serialized document
//!
//! The reply must wrap the replacement markup in `@&file` markers; a fenced
//! code block is accepted as a fallback. Anything else is
//! [`AiError::Unparseable`].
//!
//! Nothing here mutates the session: a successful request yields an
//! [`AiProposal`] that the caller applies explicitly.
//!
//! ```rust,ignore
//! let proposal = session.request_ai_edit(&service, ReplacementScope::Document, "Fix typos").await?;
//! session.apply_ai_proposal(&proposal);
//! ```

use crate::session::ReplacementScope;
use folio_dom::{Document, Element};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::OnceLock;
use thiserror::Error;

/// Budget for the ancestor context excerpt, in characters
pub const MAX_PARENT_CONTEXT: usize = 2500;

pub const GRANDPARENT_SEPARATOR: &str =
    "\n\n<!-- Broader Context: Grandparent Element (for reference) -->\n";

const ELLIPSIS: &str = "...";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("The API key is invalid or lacks permission")]
    InvalidCredential,

    #[error("Rate limit reached, try again shortly")]
    RateLimited,

    #[error("Quota exceeded or billing problem")]
    QuotaExceeded,

    #[error("Request blocked by the service: {0}")]
    Blocked(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("The response did not contain usable markup")]
    Unparseable,

    #[error("Nothing to edit: element {0} not found")]
    MissingTarget(String),

    #[error("Service error: {0}")]
    Service(String),
}

impl AiError {
    /// Categorise a failed call from its status code and message
    pub fn classify(status: Option<u16>, message: &str) -> AiError {
        let lower = message.to_lowercase();
        if matches!(status, Some(401 | 403)) || lower.contains("api key") {
            AiError::InvalidCredential
        } else if status == Some(429) || lower.contains("rate limit") {
            AiError::RateLimited
        } else if lower.contains("quota") || lower.contains("billing") || lower.contains("insufficient_quota") {
            AiError::QuotaExceeded
        } else {
            AiError::Service(message.to_string())
        }
    }
}

/// Prompt sent to the completion service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiRequest {
    pub system_prompt: String,
    pub instruction: String,
}

/// Replacement markup ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AiProposal {
    pub scope: ReplacementScope,
    pub markup: String,
}

/// External completion service
pub trait CompletionService {
    fn complete(&self, request: &AiRequest) -> impl Future<Output = Result<String, AiError>> + Send;
}

/// Build the prompt for `scope`; `None` when an element target is missing
pub fn build_prompt(doc: &Document, scope: &ReplacementScope, instruction: &str) -> Option<AiRequest> {
    let system_prompt = match scope {
        ReplacementScope::Element(identity) => {
            let path = doc.find_path(identity).filter(|p| !p.is_empty())?;
            let target = doc.body.element_at(&path)?.outer_html();
            let context = ancestor_context(&doc.body, &path);
            element_prompt(&target, &context, instruction)
        }
        ReplacementScope::Document => document_prompt(&doc.to_html(), instruction),
    };
    Some(AiRequest {
        system_prompt,
        instruction: instruction.to_string(),
    })
}

/// Parent markup, plus grandparent markup behind a separator while the
/// budget allows, capped at [`MAX_PARENT_CONTEXT`] characters
pub fn ancestor_context(body: &Element, path: &[usize]) -> String {
    let Some(parent_path) = path.split_last().map(|(_, p)| p) else {
        return String::new();
    };
    if parent_path.is_empty() {
        return String::new();
    }
    let Some(parent) = body.element_at(parent_path) else {
        return String::new();
    };

    let mut context = parent.outer_html();
    let parent_len = context.chars().count();
    let grandparent_path = &parent_path[..parent_path.len() - 1];

    if !grandparent_path.is_empty() && parent_len * 4 < MAX_PARENT_CONTEXT * 3 {
        let available = MAX_PARENT_CONTEXT.saturating_sub(parent_len);
        if available > GRANDPARENT_SEPARATOR.chars().count() + 50 {
            if let Some(grandparent) = body.element_at(grandparent_path) {
                let addition = format!("{}{}", GRANDPARENT_SEPARATOR, grandparent.outer_html());
                context.push_str(&truncate_chars(&addition, available));
            }
        }
    }
    truncate_chars(&context, MAX_PARENT_CONTEXT)
}

/// Cut `text` to `limit` characters, ending in `...` when cut
pub fn truncate_chars(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(ELLIPSIS.len())).collect();
    format!("{}{}", kept, ELLIPSIS)
}

/// Whether the text contains Arabic-script (Persian) characters
pub fn is_persian(text: &str) -> bool {
    static ARABIC_SCRIPT: OnceLock<Regex> = OnceLock::new();
    ARABIC_SCRIPT
        .get_or_init(|| Regex::new(r"[\x{0600}-\x{06FF}]").expect("static pattern"))
        .is_match(text)
}

fn language_note(instruction: &str) -> &'static str {
    if is_persian(instruction) {
        "\nThe user wrote in Persian. Keep any text you write in Persian and keep right-to-left layout intact.\n"
    } else {
        ""
    }
}

fn element_prompt(target: &str, context: &str, instruction: &str) -> String {
    let mut prompt = String::from(
        "You are an expert HTML editor. Modify ONLY the target element below according to the user's request.\n\
         Return the complete, modified target element wrapped between @&file markers, like:\n\
         @&file\n<div>...</div>\n@&file\n\
         Keep existing data-editor-id attributes unchanged. Do not include the surrounding context in your answer.\n",
    );
    prompt.push_str(language_note(instruction));
    if !context.is_empty() {
        prompt.push_str("\nSurrounding context (read-only):\n```html\n");
        prompt.push_str(context);
        prompt.push_str("\n```\n");
    }
    prompt.push_str("\nTarget element:\n```html\n");
    prompt.push_str(target);
    prompt.push_str("\n```\n\nUser's Request: ");
    prompt.push_str(instruction);
    prompt
}

fn document_prompt(document: &str, instruction: &str) -> String {
    let mut prompt = String::from(
        "You are an expert HTML editor. Modify the document below according to the user's request.\n\
         Return the complete, modified document wrapped between @&file markers.\n",
    );
    prompt.push_str(language_note(instruction));
    prompt.push_str("\nDocument:\n```html\n");
    prompt.push_str(document);
    prompt.push_str("\n```\n\nUser's Request: ");
    prompt.push_str(instruction);
    prompt
}

/// Extract replacement markup from a completion
pub fn parse_completion(text: &str) -> Result<String, AiError> {
    static MARKERS: OnceLock<Regex> = OnceLock::new();
    static FENCE: OnceLock<Regex> = OnceLock::new();

    let markers = MARKERS.get_or_init(|| Regex::new(r"@&file\s*([\s\S]*?)\s*@&file").expect("static pattern"));
    let fence = FENCE.get_or_init(|| {
        RegexBuilder::new(r"```(?:html|xml)?\s*([\s\S]*?)\s*```")
            .case_insensitive(true)
            .build()
            .expect("static pattern")
    });

    markers
        .captures(text)
        .or_else(|| fence.captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|markup| !markup.is_empty())
        .ok_or(AiError::Unparseable)
}

/// Text of the first candidate in a Gemini-style JSON response
pub fn extract_candidate_text(response: &serde_json::Value) -> Result<String, AiError> {
    if let Some(reason) = response
        .pointer("/promptFeedback/blockReason")
        .and_then(|v| v.as_str())
    {
        return Err(AiError::Blocked(reason.to_string()));
    }
    let candidate = response
        .pointer("/candidates/0")
        .ok_or_else(|| AiError::MalformedResponse("no candidates".to_string()))?;
    if let Some(reason) = candidate
        .get("finishReason")
        .and_then(|v| v.as_str())
        .filter(|r| matches!(*r, "SAFETY" | "BLOCKLIST" | "PROHIBITED_CONTENT"))
    {
        return Err(AiError::Blocked(reason.to_string()));
    }
    candidate
        .pointer("/content/parts/0/text")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| AiError::MalformedResponse("candidate has no text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_dom::parse_document;

    #[test]
    fn test_parse_markers() {
        let reply = "Sure!\n@&file\n  <p>new</p>\n@&file\nDone.";
        assert_eq!(parse_completion(reply).unwrap(), "<p>new</p>");
    }

    #[test]
    fn test_parse_fenced_fallback() {
        assert_eq!(parse_completion("```HTML\n<b>x</b>\n```").unwrap(), "<b>x</b>");
        assert_eq!(parse_completion("```\n<i>y</i>\n```").unwrap(), "<i>y</i>");
    }

    #[test]
    fn test_parse_failure() {
        assert_eq!(parse_completion("I cannot help with that."), Err(AiError::Unparseable));
        assert_eq!(parse_completion("@&file\n\n@&file"), Err(AiError::Unparseable));
    }

    #[test]
    fn test_classify_errors() {
        assert_eq!(AiError::classify(Some(401), "nope"), AiError::InvalidCredential);
        assert_eq!(AiError::classify(None, "API key not valid"), AiError::InvalidCredential);
        assert_eq!(AiError::classify(Some(429), ""), AiError::RateLimited);
        assert_eq!(AiError::classify(None, "insufficient_quota"), AiError::QuotaExceeded);
        assert_eq!(
            AiError::classify(Some(500), "boom"),
            AiError::Service("boom".to_string())
        );
    }

    #[test]
    fn test_extract_candidate_text() {
        let ok = serde_json::json!({
            "candidates": [{ "content": { "parts": [{ "text": "@&file<p/>@&file" }] } }]
        });
        assert_eq!(extract_candidate_text(&ok).unwrap(), "@&file<p/>@&file");

        let blocked = serde_json::json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert_eq!(
            extract_candidate_text(&blocked),
            Err(AiError::Blocked("SAFETY".to_string()))
        );

        let empty = serde_json::json!({ "candidates": [] });
        assert!(matches!(
            extract_candidate_text(&empty),
            Err(AiError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("abcdef", 10), "abcdef");
        assert_eq!(truncate_chars("abcdefghij", 6), "abc...");
        assert_eq!(truncate_chars("ضضضضض", 4), "ض...");
    }

    #[test]
    fn test_context_includes_small_grandparent() {
        let doc = parse_document(
            r#"<section data-editor-id="g"><div data-editor-id="p"><span data-editor-id="t">x</span></div><p>sibling</p></section>"#,
        );
        let path = doc.find_path("t").unwrap();
        let context = ancestor_context(&doc.body, &path);
        assert!(context.starts_with(r#"<div data-editor-id="p">"#));
        assert!(context.contains(GRANDPARENT_SEPARATOR));
        assert!(context.ends_with("</section>"));
    }

    #[test]
    fn test_context_is_capped() {
        let long = "y".repeat(4000);
        let doc = parse_document(&format!(
            r#"<div data-editor-id="p"><span data-editor-id="t">x</span>{}</div>"#,
            long
        ));
        let path = doc.find_path("t").unwrap();
        let context = ancestor_context(&doc.body, &path);
        assert_eq!(context.chars().count(), MAX_PARENT_CONTEXT);
        assert!(context.ends_with("..."));
        assert!(!context.contains(GRANDPARENT_SEPARATOR));
    }

    #[test]
    fn test_element_prompt_embeds_target() {
        let doc = parse_document(r#"<div data-editor-id="p"><h1 data-editor-id="t">Hi</h1></div>"#);
        let request = build_prompt(&doc, &ReplacementScope::Element("t".into()), "سلام").unwrap();
        assert!(request.system_prompt.contains(r#"<h1 data-editor-id="t">Hi</h1>"#));
        assert!(request.system_prompt.contains("Persian"));
        assert!(request.system_prompt.ends_with("User's Request: سلام"));
        assert!(build_prompt(&doc, &ReplacementScope::Element("gone".into()), "x").is_none());
    }

    #[test]
    fn test_document_prompt_embeds_document() {
        let doc = parse_document("<p>whole</p>");
        let request = build_prompt(&doc, &ReplacementScope::Document, "shorter").unwrap();
        assert!(request.system_prompt.contains("<body><p>whole</p></body>"));
        assert!(!request.system_prompt.contains("Persian"));
    }
}
