//! CLI configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tagstream_classifier::MarkerConfig;
use tagstream_core::{AdapterKind, DecoderConfig, TextEncoding};

/// Complete configuration for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Transport decoding
    #[serde(default)]
    pub decoder: DecoderConfig,

    /// Marker tokens for classification
    #[serde(default)]
    pub markers: MarkerConfig,
}

impl StreamConfig {
    /// Load configuration from file and CLI overrides
    pub fn load(config_path: &str, cli: &crate::Cli) -> anyhow::Result<Self> {
        // Try to load from file, or use defaults
        let mut config: Self = if Path::new(config_path).exists() {
            let content = std::fs::read_to_string(config_path)?;
            serde_yaml::from_str(&content)?
        } else {
            tracing::debug!(path = config_path, "config file not found, using defaults");
            Self::default()
        };

        // Apply CLI overrides
        if let Some(encoding) = &cli.encoding {
            config.decoder.encoding = encoding.parse::<TextEncoding>()?;
        }

        if let Some(adapter) = &cli.adapter {
            config.decoder.adapter = adapter.parse::<AdapterKind>()?;
        }

        if let Some(token) = &cli.think_start {
            config.markers.think_start = token.clone();
        }

        if let Some(token) = &cli.think_end {
            config.markers.think_end = token.clone();
        }

        if let Some(token) = &cli.fence_start {
            config.markers.fence_start = token.clone();
        }

        if let Some(token) = &cli.fence_end {
            config.markers.fence_end = token.clone();
        }

        config.decoder.validate()?;
        config.markers.validate()?;
        Ok(config)
    }
}
