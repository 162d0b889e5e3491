//! Decoder configuration

use crate::adapters::{anthropic_adapter, AdapterConfig, ConfigurableAdapter, OpenAiAdapter};
use crate::stream_adapter::FrameAdapter;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Text encoding of the raw byte stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextEncoding {
    /// UTF-8; invalid sequences decode to U+FFFD
    #[default]
    #[serde(rename = "utf-8", alias = "utf8")]
    Utf8,
    /// ISO-8859-1, one byte per char
    #[serde(rename = "latin1", alias = "iso-8859-1")]
    Latin1,
}

impl std::str::FromStr for TextEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(Error::config(format!("unsupported encoding: {other}"))),
        }
    }
}

/// Which frame adapter parses the payloads
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AdapterKind {
    /// OpenAI chat completions chunks
    #[default]
    OpenAi,
    /// Anthropic Messages API events
    Anthropic,
    /// Path-configured custom payloads
    Configurable(AdapterConfig),
}

impl AdapterKind {
    /// Build the adapter this selection names
    pub fn build(&self) -> Box<dyn FrameAdapter> {
        match self {
            Self::OpenAi => Box::new(OpenAiAdapter::new()),
            Self::Anthropic => Box::new(anthropic_adapter()),
            Self::Configurable(config) => Box::new(ConfigurableAdapter::new(config.clone())),
        }
    }
}

impl std::str::FromStr for AdapterKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(Error::config(format!("unknown adapter: {other}"))),
        }
    }
}

/// Frame decoder configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Prefix marking an event-data line
    #[serde(default = "default_data_prefix")]
    pub data_prefix: String,

    /// Literal that terminates the stream when it appears in a line
    #[serde(default = "default_done_sentinel")]
    pub done_sentinel: String,

    /// Byte stream encoding
    #[serde(default)]
    pub encoding: TextEncoding,

    /// Payload adapter
    #[serde(default)]
    pub adapter: AdapterKind,
}

impl DecoderConfig {
    /// Reject configurations the decoder cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.data_prefix.is_empty() {
            return Err(Error::config("data_prefix must not be empty"));
        }
        if self.done_sentinel.is_empty() {
            return Err(Error::config("done_sentinel must not be empty"));
        }
        if let AdapterKind::Configurable(adapter) = &self.adapter {
            if adapter.content_path.is_empty() {
                return Err(Error::config("adapter content_path must not be empty"));
            }
        }
        Ok(())
    }
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            data_prefix: default_data_prefix(),
            done_sentinel: default_done_sentinel(),
            encoding: TextEncoding::default(),
            adapter: AdapterKind::default(),
        }
    }
}

fn default_data_prefix() -> String {
    "data: ".to_string()
}

fn default_done_sentinel() -> String {
    "[DONE]".to_string()
}
