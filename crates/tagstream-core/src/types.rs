//! Core types for TagStream

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key the finish reason is stored under inside [`FrameMetadata`]
pub const FINISH_REASON_KEY: &str = "finish_reason";

/// Key a non-object agent metadata value is stored under
pub const AGENT_METADATA_KEY: &str = "agent_metadata";

/// Out-of-band data carried by a frame next to (or instead of) its text
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameMetadata(Map<String, Value>);

impl FrameMetadata {
    /// Build metadata from an optional finish reason and optional agent metadata.
    ///
    /// Returns `None` when neither is present. Fields of an object-valued agent
    /// metadata are merged in directly; any other value is kept under
    /// [`AGENT_METADATA_KEY`]. The finish reason always wins its key.
    pub fn combine(finish_reason: Option<String>, agent_metadata: Option<Value>) -> Option<Self> {
        if finish_reason.is_none() && agent_metadata.is_none() {
            return None;
        }

        let mut fields = Map::new();
        match agent_metadata {
            Some(Value::Object(object)) => fields.extend(object),
            Some(other) => {
                fields.insert(AGENT_METADATA_KEY.to_string(), other);
            }
            None => {}
        }
        if let Some(reason) = finish_reason {
            fields.insert(FINISH_REASON_KEY.to_string(), Value::String(reason));
        }

        Some(Self(fields))
    }

    /// The finish reason, if the frame carried one
    pub fn finish_reason(&self) -> Option<&str> {
        self.0.get(FINISH_REASON_KEY).and_then(Value::as_str)
    }

    /// Look up a single metadata field
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// All metadata fields
    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Convert into a plain JSON value
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

/// A single decoded transport unit
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamFrame {
    /// Incremental model output (may be empty)
    pub content_fragment: String,

    /// Finish reason and/or provider side-channel data
    pub metadata: Option<FrameMetadata>,
}

impl StreamFrame {
    /// Create a text-only frame
    pub fn text(fragment: impl Into<String>) -> Self {
        Self {
            content_fragment: fragment.into(),
            metadata: None,
        }
    }

    /// Create a frame with metadata
    pub fn with_metadata(fragment: impl Into<String>, metadata: Option<FrameMetadata>) -> Self {
        Self {
            content_fragment: fragment.into(),
            metadata,
        }
    }

    /// True when the frame carries neither text nor metadata
    pub fn is_empty(&self) -> bool {
        self.content_fragment.is_empty() && self.metadata.is_none()
    }
}
