//! Chat message payloads.
//!
//! A message is an opaque byte string of at most [`MAX_MESSAGE_LEN`] bytes.
//! It carries no sender or timestamp; the only thing the pipeline ever
//! inspects is whether it is the end-of-chat sentinel.

use std::fmt;

use crate::error::Error;

/// Largest payload a single message (and a single datagram) may carry.
pub const MAX_MESSAGE_LEN: usize = 1024;

/// Prefix that marks the end-of-chat message.
pub const SENTINEL: &[u8] = b"!\n";

/// An immutable chat message.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    /// Create a message, rejecting payloads longer than [`MAX_MESSAGE_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, Error> {
        let bytes = bytes.into();
        if bytes.len() > MAX_MESSAGE_LEN {
            return Err(Error::Message(format!(
                "message is {} bytes, maximum is {}",
                bytes.len(),
                MAX_MESSAGE_LEN
            )));
        }
        Ok(Self { bytes })
    }

    /// The end-of-chat message.
    pub fn sentinel() -> Self {
        Self {
            bytes: SENTINEL.to_vec(),
        }
    }

    /// Decode the first `len` bytes of a receive buffer.
    ///
    /// The payload is capped at [`MAX_MESSAGE_LEN`] and cut at the first NUL,
    /// so peers that send a zero-padded fixed-size buffer read back as the
    /// text they actually typed. Short datagrams are never padded.
    pub fn from_datagram(buf: &[u8], len: usize) -> Self {
        let end = len.min(MAX_MESSAGE_LEN).min(buf.len());
        let payload = &buf[..end];
        let payload = match payload.iter().position(|&b| b == 0) {
            Some(nul) => &payload[..nul],
            None => payload,
        };
        Self {
            bytes: payload.to_vec(),
        }
    }

    /// Whether this message ends the chat. Only the first two bytes count.
    pub fn is_sentinel(&self) -> bool {
        self.bytes.starts_with(SENTINEL)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Lossy UTF-8 view, for logs.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

impl fmt::Debug for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Message({:?})", self.text())
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

impl TryFrom<&str> for Message {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Message::new(value.as_bytes())
    }
}
