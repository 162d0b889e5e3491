//! Frame Adapter System
//!
//! Provides a pluggable system for turning the JSON payload of one
//! `data:` line into a [`StreamFrame`] (OpenAI chat completions, custom
//! provider shapes, etc.)

use crate::{Result, StreamFrame};
use std::collections::HashMap;
use std::fmt::Debug;

/// Trait for parsing provider-specific frame payloads
///
/// Implementations only see the payload with the event-data prefix already
/// stripped. Line framing, the terminal sentinel and text decoding are the
/// decoder's job.
pub trait FrameAdapter: Send + Sync + Debug {
    /// Name of this adapter (for logging/debugging)
    fn name(&self) -> &str;

    /// Parse one payload into a frame
    ///
    /// # Errors
    /// Returns [`crate::Error::Frame`] or [`crate::Error::Serialization`] when
    /// the payload is not valid for this format. The decoder logs and skips
    /// such lines.
    fn parse_frame(&self, payload: &str) -> Result<StreamFrame>;
}

/// Registry of available frame adapters
#[derive(Debug, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<String, Box<dyn FrameAdapter>>,
}

impl AdapterRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter
    pub fn register(&mut self, name: impl Into<String>, adapter: Box<dyn FrameAdapter>) {
        self.adapters.insert(name.into(), adapter);
    }

    /// Get an adapter by name
    pub fn get(&self, name: &str) -> Option<&dyn FrameAdapter> {
        self.adapters.get(name).map(|a| a.as_ref())
    }

    /// Remove an adapter, handing ownership back to the caller
    pub fn take(&mut self, name: &str) -> Option<Box<dyn FrameAdapter>> {
        self.adapters.remove(name)
    }

    /// List all registered adapters
    pub fn list(&self) -> Vec<&str> {
        self.adapters.keys().map(|s| s.as_str()).collect()
    }
}
