//! Configurable Frame Adapter
//!
//! A generic adapter that can be configured to parse provider payloads
//! using JSONPath-like field extraction.

use crate::stream_adapter::FrameAdapter;
use crate::{Error, FrameMetadata, Result, StreamFrame};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Configuration for a custom payload shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Adapter name
    pub name: String,

    /// Path to content field (dot-notation or simple JSONPath)
    /// Examples: "delta.text", "choices[0].delta.content", "message.content"
    pub content_path: String,

    /// Path to finish_reason field
    #[serde(default)]
    pub finish_reason_path: Option<String>,

    /// Path to provider/agent side-channel metadata
    #[serde(default)]
    pub metadata_path: Option<String>,
}

/// A configurable frame adapter
#[derive(Debug, Clone)]
pub struct ConfigurableAdapter {
    config: AdapterConfig,
}

impl ConfigurableAdapter {
    /// Create a new configurable adapter
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// The adapter configuration
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Extract value from JSON using a simple path notation
    fn extract_path<'a>(&self, value: &'a Value, path: &str) -> Option<&'a Value> {
        let mut current = value;

        for part in path.split('.') {
            // Handle array index notation: "choices[0]"
            if let Some(bracket_pos) = part.find('[') {
                let key = &part[..bracket_pos];
                let index_str = part[bracket_pos + 1..].strip_suffix(']')?;

                if !key.is_empty() {
                    current = current.get(key)?;
                }

                let index: usize = index_str.parse().ok()?;
                current = current.get(index)?;
            } else {
                current = current.get(part)?;
            }
        }

        Some(current)
    }

    fn extract_string(&self, value: &Value, path: Option<&str>) -> Option<String> {
        path.and_then(|p| self.extract_path(value, p))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl FrameAdapter for ConfigurableAdapter {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn parse_frame(&self, payload: &str) -> Result<StreamFrame> {
        let json: Value = serde_json::from_str(payload)?;
        if !json.is_object() {
            return Err(Error::frame(format!(
                "{}: expected a JSON object payload",
                self.config.name
            )));
        }

        let fragment = self
            .extract_string(&json, Some(self.config.content_path.as_str()))
            .unwrap_or_default();
        let finish_reason = self.extract_string(&json, self.config.finish_reason_path.as_deref());
        let agent_metadata = self
            .config
            .metadata_path
            .as_deref()
            .and_then(|p| self.extract_path(&json, p))
            .filter(|v| !v.is_null())
            .cloned();

        Ok(StreamFrame::with_metadata(
            fragment,
            FrameMetadata::combine(finish_reason, agent_metadata),
        ))
    }
}

// =============================================================================
// Pre-built Adapters
// =============================================================================

/// Create an Anthropic Messages API adapter
///
/// Anthropic format:
/// ```text
/// event: content_block_delta
/// data: {"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Hello"}}
///
/// event: message_delta
/// data: {"type": "message_delta", "delta": {"stop_reason": "end_turn"}}
/// ```
pub fn anthropic_adapter() -> ConfigurableAdapter {
    ConfigurableAdapter::new(AdapterConfig {
        name: "anthropic".to_string(),
        content_path: "delta.text".to_string(),
        finish_reason_path: Some("delta.stop_reason".to_string()),
        metadata_path: None,
    })
}
