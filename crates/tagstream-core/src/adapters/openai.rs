//! OpenAI-compatible frame adapter
//!
//! Parses the chat completions streaming payload:
//! ```text
//! data: {"id":"chatcmpl-xxx","object":"chat.completion.chunk","model":"gpt-4","choices":[{"index":0,"delta":{"content":"token"},"finish_reason":null}]}
//! ```
//! Agent platforms add a top-level `agent_metadata` field for side-channel
//! events; it is surfaced as frame metadata.

use crate::stream_adapter::FrameAdapter;
use crate::{FrameMetadata, Result, StreamFrame};
use serde::Deserialize;

/// OpenAI chat completions frame adapter
#[derive(Debug, Clone, Default)]
pub struct OpenAiAdapter;

impl OpenAiAdapter {
    /// Create a new OpenAI adapter
    pub fn new() -> Self {
        Self
    }
}

impl FrameAdapter for OpenAiAdapter {
    fn name(&self) -> &str {
        "openai"
    }

    fn parse_frame(&self, payload: &str) -> Result<StreamFrame> {
        let chunk: OpenAiChunk = serde_json::from_str(payload)?;

        let (fragment, finish_reason) = match chunk.choices.into_iter().next() {
            Some(choice) => (choice.delta.content, choice.finish_reason),
            None => (None, None),
        };

        Ok(StreamFrame::with_metadata(
            fragment.unwrap_or_default(),
            FrameMetadata::combine(finish_reason, chunk.agent_metadata),
        ))
    }
}

// =============================================================================
// OpenAI Response Structures
// =============================================================================

#[derive(Debug, Deserialize)]
struct OpenAiChunk {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    agent_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    #[serde(default)]
    delta: OpenAiDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct OpenAiDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_content_frame() {
        let adapter = OpenAiAdapter::new();

        let payload = r#"{"id":"chatcmpl-123","object":"chat.completion.chunk","created":1234567890,"model":"gpt-4","choices":[{"index":0,"delta":{"content":"Hello"},"finish_reason":null}]}"#;

        let frame = adapter.parse_frame(payload).unwrap();
        assert_eq!(frame.content_fragment, "Hello");
        assert!(frame.metadata.is_none());
    }

    #[test]
    fn test_parse_finish_frame() {
        let adapter = OpenAiAdapter::new();

        let payload = r#"{"choices":[{"index":0,"delta":{},"finish_reason":"stop"}]}"#;

        let frame = adapter.parse_frame(payload).unwrap();
        assert_eq!(frame.content_fragment, "");
        assert_eq!(
            frame.metadata.as_ref().and_then(|m| m.finish_reason()),
            Some("stop")
        );
    }

    #[test]
    fn test_parse_agent_metadata() {
        let adapter = OpenAiAdapter::new();

        let payload = r#"{"choices":[{"delta":{"content":"hi"}}],"agent_metadata":{"type":"tool_call"}}"#;

        let frame = adapter.parse_frame(payload).unwrap();
        assert_eq!(frame.content_fragment, "hi");
        let meta = frame.metadata.unwrap();
        assert_eq!(meta.get("type"), Some(&json!("tool_call")));
        assert_eq!(meta.finish_reason(), None);
    }

    #[test]
    fn test_unknown_fields_and_missing_choices() {
        let adapter = OpenAiAdapter::new();

        let frame = adapter.parse_frame(r#"{"usage":{"total_tokens":12}}"#).unwrap();
        assert!(frame.is_empty());
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let adapter = OpenAiAdapter::new();
        assert!(adapter.parse_frame("{not json").is_err());
    }
}
