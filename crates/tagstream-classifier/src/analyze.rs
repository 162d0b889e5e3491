//! One-shot think/content extraction for text that is already complete.
//!
//! Independent of the streaming state machine: it only shares the marker
//! configuration.

use crate::markers::MarkerConfig;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tagstream_core::Result;

/// Result of a one-shot analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Leading thinking block body
    pub think: String,
    /// Deliverable text
    pub content: String,
}

/// Compiled one-shot extractor
#[derive(Debug, Clone)]
pub struct Analyzer {
    thinking: Regex,
    fenced: Regex,
    end_of_output: Option<String>,
}

impl Analyzer {
    /// Compile the patterns for a marker set
    pub fn new(markers: &MarkerConfig) -> Result<Self> {
        markers.validate()?;

        // Leading block: optional open, lazy body, mandatory close
        let thinking = Regex::new(&format!(
            r"(?s)\A\s*(?:{})?(.*?){}\s*",
            regex::escape(&markers.think_start),
            regex::escape(&markers.think_end),
        ))?;
        // An unclosed fence runs to the end of the text
        let fenced = Regex::new(&format!(
            r"(?s){}(.*?)(?:{}|\z)",
            regex::escape(&markers.fence_start),
            regex::escape(&markers.fence_end),
        ))?;

        Ok(Self {
            thinking,
            fenced,
            end_of_output: markers.end_of_output.clone(),
        })
    }

    /// Split complete text into think and content
    pub fn analyze(&self, text: &str) -> Analysis {
        let (think, candidate) = match self.thinking.captures(text) {
            Some(caps) => {
                let body = caps.get(1).map_or("", |m| m.as_str());
                let rest = caps.get(0).map_or(text, |m| &text[m.end()..]);
                (body.trim(), rest)
            }
            None => ("", text),
        };

        let candidate = self.strip_end_of_output(candidate);
        let content = match self.fenced.captures(candidate) {
            Some(caps) => caps.get(1).map_or("", |m| m.as_str()),
            None => candidate,
        };

        Analysis {
            think: think.to_string(),
            content: self.strip_end_of_output(content).trim().to_string(),
        }
    }

    fn strip_end_of_output<'a>(&self, text: &'a str) -> &'a str {
        let trimmed = text.trim_end();
        match &self.end_of_output {
            Some(eos) => trimmed.strip_suffix(eos.as_str()).unwrap_or(trimmed),
            None => trimmed,
        }
    }
}
