//! Language-model collaborator.
//!
//! Every agent talks to the model through [`LanguageModel`], which always
//! hands back a plain, trimmed string. Whatever shape the backend returns is
//! normalized here, once, so nothing downstream inspects raw model output.

pub mod ollama;

pub use ollama::{OllamaClient, OllamaConfig};

use crate::error::LlmError;
use async_trait::async_trait;
use serde_json::Value;

/// A text-in, text-out language model.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model name, for logs and report metadata.
    fn name(&self) -> &str;

    /// Send a filled prompt and return the normalized completion.
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Flatten a message `content` value into plain text.
///
/// Accepts a bare string, an array of parts (strings or objects with a
/// `text` field), or an object carrying `text` / `content`.
pub fn normalize_content(content: &Value) -> String {
    let raw = match content {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(parts) => parts
            .iter()
            .map(normalize_content)
            .filter(|p| !p.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Object(map) => map
            .get("text")
            .or_else(|| map.get("content"))
            .map(normalize_content)
            .unwrap_or_default(),
        other => other.to_string(),
    };

    strip_reasoning(&raw).trim().to_string()
}

/// Drop `<think>...</think>` blocks some local models emit before the answer.
fn strip_reasoning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("<think>") {
        out.push_str(&rest[..start]);
        match rest[start..].find("</think>") {
            Some(end) => rest = &rest[start + end + "</think>".len()..],
            None => {
                rest = "";
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Strip a surrounding Markdown code fence, if any.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match body.find('\n') {
        Some(newline) => &body[newline + 1..],
        None => body,
    };
    body.strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_normalize_string() {
        assert_eq!(normalize_content(&json!("  hello \n")), "hello");
    }

    #[test]
    fn test_normalize_parts() {
        let content = json!([{"type": "text", "text": "first"}, "second", {"type": "image"}]);
        assert_eq!(normalize_content(&content), "first\nsecond");
    }

    #[test]
    fn test_normalize_object() {
        assert_eq!(normalize_content(&json!({"content": "inner"})), "inner");
        assert_eq!(normalize_content(&Value::Null), "");
    }

    #[test]
    fn test_strip_reasoning() {
        let content = json!("<think>let me see</think>\nAnswer");
        assert_eq!(normalize_content(&content), "Answer");
        assert_eq!(strip_reasoning("a<think>unterminated"), "a");
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("plain"), "plain");
    }
}
