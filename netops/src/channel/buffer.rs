//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. For a large `show | compare` or a full
//! `display set` this keeps prompt detection cheap.

use std::fmt;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use log::warn;
use regex::bytes::Regex;

/// Buffer for accumulating output and efficiently searching for patterns.
pub struct PatternBuffer {
    /// The accumulated output buffer.
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    /// Escape stripper kept across reads so a sequence split between two
    /// SSH packets is still removed. It drops `\r` as well.
    stripper: strip_ansi_escapes::Writer<Cleaned>,

    /// Output side of `stripper`.
    cleaned: Cleaned,
}

/// Bytes let through by the stripper, waiting to be appended.
#[derive(Clone, Default)]
struct Cleaned(Arc<Mutex<Vec<u8>>>);

impl Cleaned {
    fn drain_into(&self, target: &mut Vec<u8>) {
        if let Ok(mut pending) = self.0.lock() {
            target.append(&mut pending);
        }
    }
}

impl Write for Cleaned {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut pending = self
            .0
            .lock()
            .map_err(|_| io::Error::other("stripped output lock poisoned"))?;
        pending.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        let cleaned = Cleaned::default();
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            stripper: strip_ansi_escapes::Writer::new(cleaned.clone()),
            cleaned,
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        if let Err(e) = self.stripper.write_all(data) {
            warn!("dropping unparsable device output: {}", e);
        }
        self.cleaned.drain_into(&mut self.buffer);
    }

    /// Search only the tail of the buffer for the pattern.
    ///
    /// Returns the match if found, with byte offsets relative to the
    /// start of the search region (not the full buffer).
    pub fn search_tail(&self, pattern: &Regex) -> Option<regex::bytes::Match<'_>> {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        let tail = &self.buffer[start..];
        pattern.find(tail)
    }

    /// Check if the tail contains a pattern match.
    pub fn tail_contains(&self, pattern: &Regex) -> bool {
        self.search_tail(pattern).is_some()
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for PatternBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternBuffer")
            .field("len", &self.buffer.len())
            .field("search_depth", &self.search_depth)
            .finish_non_exhaustive()
    }
}
