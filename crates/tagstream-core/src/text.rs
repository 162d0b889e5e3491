//! Incremental text decoding
//!
//! Bytes arrive in arbitrarily sized reads, so a multi-byte character can be
//! split across two reads. [`TextDecoder`] keeps the incomplete tail until the
//! rest of the sequence arrives.

use crate::config::TextEncoding;

const REPLACEMENT: char = '\u{FFFD}';

/// Stateful byte-to-text decoder
#[derive(Debug, Default)]
pub struct TextDecoder {
    encoding: TextEncoding,
    pending: Vec<u8>,
}

impl TextDecoder {
    /// Create a decoder for the given encoding
    pub fn new(encoding: TextEncoding) -> Self {
        Self {
            encoding,
            pending: Vec::new(),
        }
    }

    /// Decode the next read, holding back an incomplete trailing sequence
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        match self.encoding {
            TextEncoding::Latin1 => bytes.iter().map(|&b| char::from(b)).collect(),
            TextEncoding::Utf8 => self.decode_utf8(bytes),
        }
    }

    /// Flush whatever is still held back at end of stream
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }

    /// Number of bytes waiting for the rest of their sequence
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn decode_utf8(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);

        let mut out = String::with_capacity(self.pending.len());
        let mut input: &[u8] = &self.pending;

        loop {
            match std::str::from_utf8(input) {
                Ok(text) => {
                    out.push_str(text);
                    input = &[];
                    break;
                }
                Err(e) => {
                    let (valid, rest) = input.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            out.push(REPLACEMENT);
                            input = &rest[len..];
                        }
                        // Incomplete sequence at the end: wait for more bytes
                        None => {
                            input = rest;
                            break;
                        }
                    }
                }
            }
        }

        let held = input.to_vec();
        self.pending = held;
        out
    }
}
