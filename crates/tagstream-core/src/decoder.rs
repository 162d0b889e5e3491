//! Frame decoder
//!
//! Turns a raw SSE-style byte stream into `(fragment, metadata)` events:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//! : keep-alive
//! data: [DONE]
//! ```
//!
//! Reads may split lines (and multi-byte characters) anywhere. Only
//! terminated lines are processed; the rest waits for the next read.

use crate::config::DecoderConfig;
use crate::stream_adapter::FrameAdapter;
use crate::text::TextDecoder;
use crate::{Error, FrameMetadata, Result, StreamFrame};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::fmt::Display;
use std::ops::ControlFlow;

/// Progress callback that only traces what it receives
pub fn trace_progress(text: &str, metadata: Option<&FrameMetadata>) {
    tracing::trace!(fragment = text, metadata = ?metadata, "frame decoded");
}

/// Incremental decoder for one streamed completion
#[derive(Debug)]
pub struct FrameDecoder {
    config: DecoderConfig,
    adapter: Box<dyn FrameAdapter>,
    text: TextDecoder,
    lines: String,
    output: String,
    finished: bool,
}

impl FrameDecoder {
    /// Create a decoder using the adapter named in the config
    pub fn new(config: DecoderConfig) -> Result<Self> {
        let adapter = config.adapter.build();
        Self::with_adapter(config, adapter)
    }

    /// Create a decoder with an explicit adapter
    pub fn with_adapter(config: DecoderConfig, adapter: Box<dyn FrameAdapter>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            text: TextDecoder::new(config.encoding),
            config,
            adapter,
            lines: String::new(),
            output: String::new(),
            finished: false,
        })
    }

    /// True once the terminal sentinel has been seen or [`finish`](Self::finish) ran
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Text of every non-empty fragment reported so far
    pub fn text(&self) -> &str {
        &self.output
    }

    /// Consume the decoder, returning the concatenated fragments
    pub fn into_text(self) -> String {
        self.output
    }

    /// Decode one read and report every frame in the lines it completes.
    ///
    /// Returns `ControlFlow::Break` once the terminal sentinel is seen; any
    /// bytes after it are ignored.
    pub fn push<F>(&mut self, bytes: &[u8], on_frame: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        if self.finished {
            return ControlFlow::Break(());
        }

        metrics::counter!("tagstream_bytes_total").increment(bytes.len() as u64);
        let decoded = self.text.decode(bytes);
        self.lines.push_str(&decoded);
        self.drain_lines(on_frame)
    }

    /// Flush the decoder at end of stream.
    ///
    /// Held-back bytes are decoded and an unterminated final line is
    /// processed as if it had been terminated.
    pub fn finish<F>(&mut self, on_frame: &mut F)
    where
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        if self.finished {
            return;
        }

        let tail = self.text.finish();
        self.lines.push_str(&tail);
        if self.drain_lines(on_frame).is_continue() && !self.lines.is_empty() {
            let last = std::mem::take(&mut self.lines);
            let _ = self.process_line(strip_cr(&last), on_frame);
        }

        self.lines.clear();
        self.finished = true;
        tracing::debug!(chars = self.output.len(), "frame stream finished");
    }

    /// Read a source to its end, reporting frames as they are decoded.
    ///
    /// The source is polled until it ends, yields the sentinel line, or
    /// fails. A failed read (e.g. the caller aborted the request) ends the
    /// loop like end-of-stream and the running total is returned.
    pub async fn read<S, B, E, F>(mut self, source: S, mut on_frame: F) -> Result<String>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        let mut source = std::pin::pin!(source);

        while !self.finished {
            match source.next().await {
                Some(Ok(chunk)) => {
                    if self.push(chunk.as_ref(), &mut on_frame).is_break() {
                        break;
                    }
                }
                Some(Err(e)) => {
                    tracing::warn!(
                        error = %e,
                        chars = self.output.len(),
                        "byte source read failed, returning text decoded so far"
                    );
                    break;
                }
                None => break,
            }
        }

        self.finish(&mut on_frame);
        Ok(self.into_text())
    }

    /// Like [`read`](Self::read), for a body the transport may not have supplied
    pub async fn read_body<S, B, E, F>(self, source: Option<S>, on_frame: F) -> Result<String>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        match source {
            Some(source) => self.read(source, on_frame).await,
            None => Err(Error::MissingSource),
        }
    }

    /// Expose the decoded frames of a source as a stream.
    ///
    /// Frames that carry neither text nor metadata are not yielded. A read
    /// failure ends the stream the same way end-of-stream does.
    pub fn frames<S, B, E>(self, source: S) -> impl Stream<Item = StreamFrame>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Display,
    {
        let state = FrameStreamState {
            decoder: self,
            source: Box::pin(source),
            pending: VecDeque::new(),
            exhausted: false,
        };

        stream::unfold(state, |mut st| async move {
            loop {
                if let Some(frame) = st.pending.pop_front() {
                    return Some((frame, st));
                }
                if st.exhausted {
                    return None;
                }
                if st.decoder.is_finished() {
                    st.exhausted = true;
                    continue;
                }

                let mut collect = |text: &str, metadata: Option<&FrameMetadata>| {
                    st.pending
                        .push_back(StreamFrame::with_metadata(text, metadata.cloned()));
                };
                match st.source.next().await {
                    Some(Ok(chunk)) => {
                        let _ = st.decoder.push(chunk.as_ref(), &mut collect);
                    }
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "byte source read failed, ending frame stream");
                        st.decoder.finish(&mut collect);
                        st.exhausted = true;
                    }
                    None => {
                        st.decoder.finish(&mut collect);
                        st.exhausted = true;
                    }
                }
            }
        })
    }

    fn drain_lines<F>(&mut self, on_frame: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        while let Some(pos) = self.lines.find('\n') {
            let line: String = self.lines.drain(..=pos).collect();
            let line = strip_cr(&line[..line.len() - 1]);

            if self.process_line(line, on_frame).is_break() {
                self.lines.clear();
                self.finished = true;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    fn process_line<F>(&mut self, line: &str, on_frame: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        if line.contains(self.config.done_sentinel.as_str()) {
            tracing::debug!(sentinel = %self.config.done_sentinel, "terminal sentinel received");
            return ControlFlow::Break(());
        }

        let Some(payload) = line.strip_prefix(self.config.data_prefix.as_str()) else {
            if !line.is_empty() {
                tracing::trace!(line, "skipping non-data line");
            }
            return ControlFlow::Continue(());
        };

        match self.adapter.parse_frame(payload) {
            Ok(frame) => {
                metrics::counter!("tagstream_frames_total").increment(1);
                self.report(frame, on_frame);
            }
            Err(e) => {
                metrics::counter!("tagstream_frames_malformed_total").increment(1);
                tracing::warn!(
                    adapter = self.adapter.name(),
                    error = %e,
                    "skipping malformed frame"
                );
            }
        }
        ControlFlow::Continue(())
    }

    fn report<F>(&mut self, frame: StreamFrame, on_frame: &mut F)
    where
        F: FnMut(&str, Option<&FrameMetadata>),
    {
        let StreamFrame {
            content_fragment,
            metadata,
        } = frame;

        if metadata.is_some() || !content_fragment.is_empty() {
            on_frame(&content_fragment, metadata.as_ref());
        }
        self.output.push_str(&content_fragment);
    }
}

struct FrameStreamState<S> {
    decoder: FrameDecoder,
    source: std::pin::Pin<Box<S>>,
    pending: VecDeque<StreamFrame>,
    exhausted: bool,
}

fn strip_cr(line: &str) -> &str {
    line.strip_suffix('\r').unwrap_or(line)
}
