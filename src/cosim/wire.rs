//! Text framing of token groups exchanged with a peer.
//!
//! A message is the decimal text of each token separated by single spaces;
//! multiple groups are joined with `" | "`. Messages are newline-terminated in
//! both directions. A received message also ends when the receive buffer
//! fills up or the peer closes the stream.

use crate::cosim::transport::Transport;
use crate::core::errors::{Result, SimError};
use std::fmt::Display;
use std::io::{self, ErrorKind};
use std::str::FromStr;

pub const GROUP_SEPARATOR: &str = " | ";

/// Render token groups as one newline-terminated message
pub fn encode_groups<T: Display>(groups: &[Vec<T>]) -> String {
    let mut message = groups
        .iter()
        .map(|group| group.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" "))
        .collect::<Vec<_>>()
        .join(GROUP_SEPARATOR);
    message.push('\n');
    message
}

/// Parse the first `expected` whitespace-separated tokens of `raw`
pub fn decode_tokens<T: FromStr>(process: &str, raw: &str, expected: usize) -> Result<Vec<T>> {
    let tokens: Vec<&str> = raw.split_whitespace().take(expected).collect();
    if tokens.len() < expected {
        return Err(SimError::Underflow {
            process: process.to_string(),
            expected,
            got: tokens.len(),
            raw: raw.to_string(),
        });
    }
    tokens
        .into_iter()
        .map(|token| {
            token.parse::<T>().map_err(|_| SimError::Decode {
                process: process.to_string(),
                token: token.to_string(),
                raw: raw.to_string(),
            })
        })
        .collect()
}

/// Splits a byte stream into messages, keeping bytes that arrive after a
/// terminator for the next call
pub struct MessageReader {
    buffer_size: usize,
    carry: Vec<u8>,
}

impl MessageReader {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size: buffer_size.max(1),
            carry: Vec::new(),
        }
    }

    pub fn read_message(&mut self, transport: &mut dyn Transport) -> io::Result<String> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(line);
            }
            if self.carry.len() >= self.buffer_size {
                return Ok(self.take_all());
            }
            let mut chunk = vec![0u8; self.buffer_size - self.carry.len()];
            let n = match transport.recv(&mut chunk) {
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                return Ok(self.take_all());
            }
            self.carry.extend_from_slice(&chunk[..n]);
        }
    }

    /// Bytes received but not yet returned as a message
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.carry.iter().position(|&b| b == b'\n')?;
        let line: Vec<u8> = self.carry.drain(..=end).collect();
        let text = String::from_utf8_lossy(&line[..end]);
        Some(text.trim_end_matches('\r').to_string())
    }

    fn take_all(&mut self) -> String {
        let bytes = std::mem::take(&mut self.carry);
        String::from_utf8_lossy(&bytes).into_owned()
    }
}
