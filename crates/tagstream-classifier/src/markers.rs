//! Marker token configuration

use serde::{Deserialize, Serialize};
use tagstream_core::{Error, Result};

/// Literal tokens that delimit thinking and deliverable regions
///
/// Providers disagree on these, so every classifier carries its own set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Opens a thinking block
    #[serde(default = "default_think_start")]
    pub think_start: String,

    /// Closes a thinking block
    #[serde(default = "default_think_end")]
    pub think_end: String,

    /// Opens a fenced deliverable block
    #[serde(default = "default_fence_start")]
    pub fence_start: String,

    /// Closes a fenced deliverable block
    #[serde(default = "default_fence_end")]
    pub fence_end: String,

    /// End-of-sequence literal stripped from one-shot output
    #[serde(default = "default_end_of_output")]
    pub end_of_output: Option<String>,
}

impl MarkerConfig {
    /// Reject marker sets the state machine cannot work with
    pub fn validate(&self) -> Result<()> {
        for (name, token) in [
            ("think_start", &self.think_start),
            ("think_end", &self.think_end),
            ("fence_start", &self.fence_start),
            ("fence_end", &self.fence_end),
        ] {
            if token.is_empty() {
                return Err(Error::config(format!("marker {name} must not be empty")));
            }
        }
        if self.think_start == self.think_end {
            return Err(Error::config("think_start and think_end must differ"));
        }
        if matches!(&self.end_of_output, Some(eos) if eos.is_empty()) {
            return Err(Error::config("end_of_output must not be empty when set"));
        }
        Ok(())
    }

    /// Markers that can open or close something while in `FREE`
    pub(crate) fn free_markers(&self) -> [&str; 3] {
        [
            self.think_start.as_str(),
            self.think_end.as_str(),
            self.fence_start.as_str(),
        ]
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            think_start: default_think_start(),
            think_end: default_think_end(),
            fence_start: default_fence_start(),
            fence_end: default_fence_end(),
            end_of_output: default_end_of_output(),
        }
    }
}

fn default_think_start() -> String {
    "<think>".to_string()
}

fn default_think_end() -> String {
    "</think>".to_string()
}

fn default_fence_start() -> String {
    "```markdown".to_string()
}

fn default_fence_end() -> String {
    "```".to_string()
}

fn default_end_of_output() -> Option<String> {
    Some("<|im_end|>".to_string())
}
