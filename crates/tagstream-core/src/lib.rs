//! TagStream Core
//!
//! Core types and the transport decoding layer for TagStream.
//!
//! This crate provides:
//! - Frame types and metadata for decoded stream events
//! - Error types and result handling
//! - Frame adapters for provider-specific payload shapes
//! - Incremental text decoding that survives split multi-byte characters
//! - [`FrameDecoder`], which turns a raw SSE byte stream into text fragments

pub mod adapters;
pub mod config;
pub mod decoder;
pub mod error;
pub mod stream_adapter;
pub mod text;
pub mod types;

pub use adapters::{anthropic_adapter, AdapterConfig, ConfigurableAdapter, OpenAiAdapter};
pub use config::{AdapterKind, DecoderConfig, TextEncoding};
pub use decoder::{trace_progress, FrameDecoder};
pub use error::{Error, Result};
pub use stream_adapter::{AdapterRegistry, FrameAdapter};
pub use text::TextDecoder;
pub use types::{FrameMetadata, StreamFrame};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::DecoderConfig;
    pub use crate::decoder::FrameDecoder;
    pub use crate::error::{Error, Result};
    pub use crate::stream_adapter::FrameAdapter;
    pub use crate::types::{FrameMetadata, StreamFrame};
}
