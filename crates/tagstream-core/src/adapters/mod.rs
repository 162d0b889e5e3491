//! Frame Adapters
//!
//! Pluggable adapters for parsing the payloads of various LLM backends.

pub mod configurable;
mod openai;

pub use configurable::{anthropic_adapter, AdapterConfig, ConfigurableAdapter};
pub use openai::OpenAiAdapter;

use crate::stream_adapter::AdapterRegistry;

/// Create a default adapter registry with built-in adapters
pub fn default_registry() -> AdapterRegistry {
    let mut registry = AdapterRegistry::new();

    registry.register("openai", Box::new(OpenAiAdapter::new()));
    registry.register("anthropic", Box::new(anthropic_adapter()));

    registry
}
