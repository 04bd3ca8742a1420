//! PTY channel abstraction for interactive CLI sessions.

use std::time::Duration;

use log::trace;
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};

use super::buffer::PatternBuffer;
use crate::error::{ChannelError, Result};

/// Configuration for PTY channel behavior.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Default timeout for read operations.
    pub timeout: Duration,

    /// Search depth for pattern matching.
    pub search_depth: usize,
}

impl Default for PtyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            search_depth: 1000,
        }
    }
}

/// High-level PTY channel for interactive device sessions.
///
/// Wraps the russh session channel and provides pattern-based reads with
/// timeout handling. Output is accumulated in a [`PatternBuffer`] with ANSI
/// escapes already removed.
pub struct PtyChannel {
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    config: PtyConfig,
}

impl PtyChannel {
    /// Wrap an already opened shell channel.
    pub fn new(channel: Channel<Msg>, config: PtyConfig) -> Self {
        Self {
            channel,
            buffer: PatternBuffer::new(config.search_depth),
            config,
        }
    }

    /// Get the default timeout.
    pub fn timeout(&self) -> Duration {
        self.config.timeout
    }

    /// Set the default timeout.
    pub fn set_timeout(&mut self, timeout: Duration) {
        self.config.timeout = timeout;
    }

    /// Send one line of input followed by a newline.
    pub async fn send(&mut self, input: &str) -> Result<()> {
        let line = format!("{input}\n");
        self.channel
            .data(line.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    /// Read until `pattern` appears in the tail of the buffer.
    ///
    /// Returns everything accumulated up to and including the match and
    /// leaves the buffer empty.
    pub async fn read_until(&mut self, pattern: &Regex, timeout: Duration) -> Result<Vec<u8>> {
        if self.buffer.tail_contains(pattern) {
            return Ok(self.buffer.take());
        }

        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            let msg = tokio::time::timeout_at(deadline, self.channel.wait())
                .await
                .map_err(|_| ChannelError::PatternTimeout(timeout))?;

            match msg {
                Some(ChannelMsg::Data { ref data }) => self.buffer.extend(data),
                Some(ChannelMsg::ExtendedData { ref data, .. }) => self.buffer.extend(data),
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    return Err(ChannelError::Closed.into());
                }
                Some(other) => {
                    trace!("ignoring channel message {:?}", other);
                    continue;
                }
            }

            if self.buffer.tail_contains(pattern) {
                return Ok(self.buffer.take());
            }
        }
    }

    /// Read using the channel's default timeout.
    pub async fn read_until_default(&mut self, pattern: &Regex) -> Result<Vec<u8>> {
        let timeout = self.config.timeout;
        self.read_until(pattern, timeout).await
    }

    /// Close the channel.
    pub async fn close(self) -> Result<()> {
        self.channel.close().await.map_err(ChannelError::Ssh)?;
        Ok(())
    }
}
