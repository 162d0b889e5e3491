//! Think/content state machine
//!
//! [`ClassifierCore`] owns the unconsumed buffer, the current state and the
//! two accumulators. [`ClassifierCore::drain`] is the step function: it peels
//! off every region whose boundary is already unambiguous and keeps a trailing
//! partial marker (e.g. `"<thi"`) in the buffer until the next fragment
//! decides it.
//!
//! At any point, every byte ever pushed is in exactly one of: `think`,
//! `content`, the buffer, or a consumed marker.

use crate::markers::MarkerConfig;
use serde::{Deserialize, Serialize};

/// Which region the classifier is currently in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassifierState {
    /// Outside any block
    #[default]
    Free,
    /// Inside a thinking block
    Thinking,
    /// Inside a fenced deliverable block
    Generating,
}

/// Payload delivered to subscribers on every flush
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifierUpdate {
    /// Buffer empty and state `FREE`
    pub done: bool,
    /// Accumulated reasoning text
    pub think: String,
    /// Accumulated deliverable text
    pub content: String,
}

/// Owned classification state for one session
#[derive(Debug, Clone, Default)]
pub struct ClassifierCore {
    buffer: String,
    state: ClassifierState,
    think: String,
    content: String,
    input_closed: bool,
}

impl ClassifierCore {
    /// Create an empty core in `FREE`
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fragment to the unconsumed buffer.
    ///
    /// New input means the stream was not finished after all, so a previous
    /// [`close_input`](Self::close_input) no longer applies.
    pub fn push(&mut self, fragment: &str) {
        self.input_closed = false;
        self.buffer.push_str(fragment);
    }

    /// Declare that no more fragments will arrive.
    ///
    /// Until the next [`push`](Self::push), a trailing partial marker is
    /// released as plain text instead of being held back.
    pub fn close_input(&mut self) {
        self.input_closed = true;
    }

    /// Whether [`close_input`](Self::close_input) has been called
    pub fn is_input_closed(&self) -> bool {
        self.input_closed
    }

    /// Current state
    pub fn state(&self) -> ClassifierState {
        self.state
    }

    /// Text not yet resolved into think/content
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Accumulated reasoning text
    pub fn think(&self) -> &str {
        &self.think
    }

    /// Accumulated deliverable text
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Buffer empty and state `FREE`
    pub fn is_done(&self) -> bool {
        self.buffer.is_empty() && self.state == ClassifierState::Free
    }

    /// Current payload for subscribers
    pub fn snapshot(&self) -> ClassifierUpdate {
        ClassifierUpdate {
            done: self.is_done(),
            think: self.think.clone(),
            content: self.content.clone(),
        }
    }

    /// Return to the initial state, dropping all text
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Resolve as much of the buffer as the markers allow.
    ///
    /// Stops when the buffer is empty or only a possible partial marker
    /// remains.
    pub fn drain(&mut self, markers: &MarkerConfig) {
        while !self.buffer.is_empty() {
            let progressed = match self.state {
                ClassifierState::Free => self.step_free(markers),
                ClassifierState::Thinking => self.step_thinking(markers),
                ClassifierState::Generating => self.step_generating(markers),
            };
            if !progressed {
                break;
            }
        }
    }

    fn step_free(&mut self, markers: &MarkerConfig) -> bool {
        let start = self.buffer.find(markers.think_start.as_str());
        let end = self.buffer.find(markers.think_end.as_str());

        // A close with no open before it: everything so far was reasoning
        if let Some(end_at) = end {
            if start.map_or(true, |start_at| end_at <= start_at) {
                let mut folded = std::mem::take(&mut self.content);
                folded.push_str(&self.buffer[..end_at]);
                self.think.push_str(&folded);
                self.advance(end_at + markers.think_end.len());
                return true;
            }
        }

        let fence = self.buffer.find(markers.fence_start.as_str());
        match (start, fence) {
            (Some(start_at), Some(fence_at)) if fence_at < start_at => {
                self.content.push_str(&self.buffer[..fence_at]);
                self.advance(fence_at + markers.fence_start.len());
                self.state = ClassifierState::Generating;
            }
            (Some(start_at), _) => {
                self.content.push_str(&self.buffer[..start_at]);
                self.advance(start_at + markers.think_start.len());
                self.state = ClassifierState::Thinking;
            }
            (None, Some(fence_at)) => {
                self.content.push_str(&self.buffer[..fence_at]);
                self.advance(fence_at + markers.fence_start.len());
                self.state = ClassifierState::Generating;
            }
            (None, None) => {
                let emit = self.emittable_len(&markers.free_markers());
                self.content.push_str(&self.buffer[..emit]);
                self.advance(emit);
                return emit > 0;
            }
        }
        true
    }

    fn step_thinking(&mut self, markers: &MarkerConfig) -> bool {
        match self.buffer.find(markers.think_end.as_str()) {
            Some(end_at) => {
                self.think.push_str(&self.buffer[..end_at]);
                self.advance(end_at + markers.think_end.len());
                self.state = ClassifierState::Free;
                true
            }
            None => {
                let emit = self.emittable_len(&[markers.think_end.as_str()]);
                self.think.push_str(&self.buffer[..emit]);
                self.advance(emit);
                emit > 0
            }
        }
    }

    /// Closing a fence moves the whole block, plus any content streamed
    /// before it, into `think`; only text after the fence stays content.
    /// Compatibility quirk: a closed fence counts as a draft. Do not change
    /// it to keep the fenced block as content.
    fn step_generating(&mut self, markers: &MarkerConfig) -> bool {
        match self.buffer.find(markers.fence_end.as_str()) {
            Some(end_at) => {
                // Text after the fence is scanned again in FREE
                let mut folded = std::mem::take(&mut self.content);
                folded.push_str(&self.buffer[..end_at]);
                self.think.push_str(&folded);
                self.advance(end_at + markers.fence_end.len());
                self.state = ClassifierState::Free;
                true
            }
            None => {
                let emit = self.emittable_len(&[markers.fence_end.as_str()]);
                self.content.push_str(&self.buffer[..emit]);
                self.advance(emit);
                emit > 0
            }
        }
    }

    /// Length of the buffer prefix that can be released without cutting a
    /// marker that may still be completed by the next fragment.
    fn emittable_len(&self, markers: &[&str]) -> usize {
        if self.input_closed {
            return self.buffer.len();
        }
        let held = markers
            .iter()
            .map(|marker| partial_marker_len(&self.buffer, marker))
            .max()
            .unwrap_or(0);
        self.buffer.len() - held
    }

    fn advance(&mut self, n: usize) {
        self.buffer.drain(..n);
    }
}

/// Longest suffix of `text` that is a proper prefix of `marker`
fn partial_marker_len(text: &str, marker: &str) -> usize {
    let max = text.len().min(marker.len().saturating_sub(1));
    (1..=max)
        .rev()
        .find(|&n| {
            let at = text.len() - n;
            text.is_char_boundary(at) && text.as_bytes()[at..] == marker.as_bytes()[..n]
        })
        .unwrap_or(0)
}
