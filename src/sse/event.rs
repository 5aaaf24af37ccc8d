//! A single SSE record.
//!
//! A record is rendered as one `data:` line per line of the payload, an
//! optional `event:` line, and one terminating blank line:
//!
//! ```text
//! data: {"type":"ping"}
//! event: error
//!
//! ```
//!
//! The `event:` line is placed after the data lines; existing clients depend
//! on that ordering.

use std::io;

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Payload of the synthesized error event.
pub const INTERNAL_ERROR_DATA: &str = r#"{"message": "Internal Server Error"}"#;

/// Event type of the synthesized error event.
pub const ERROR_EVENT_TYPE: &str = "error";

/// An SSE event waiting to be written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Event {
    /// Event type label. `None` or empty means the default `message` type.
    pub event_type: Option<String>,

    /// Payload, usually one JSON document. May contain newlines.
    pub data: Bytes,
}

impl Event {
    /// Event with the default type carrying `data`.
    pub fn data(data: impl Into<Bytes>) -> Self {
        Self {
            event_type: None,
            data: data.into(),
        }
    }

    /// Event of type `error` carrying `data`.
    pub fn error(data: impl Into<Bytes>) -> Self {
        Self {
            event_type: Some(ERROR_EVENT_TYPE.to_string()),
            data: data.into(),
        }
    }

    /// The generic error notice sent once the stream is open.
    pub fn internal_error() -> Self {
        Self::error(Bytes::from_static(INTERNAL_ERROR_DATA.as_bytes()))
    }

    /// The event type, if set and non-empty.
    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref().filter(|t| !t.is_empty())
    }

    /// Render the record into memory. Empty data renders to nothing.
    pub fn encode(&self) -> Bytes {
        if self.data.is_empty() {
            return Bytes::new();
        }

        let lines = self.data[..].split(|b| *b == b'\n');
        let mut buf = BytesMut::with_capacity(self.data.len() + 16);

        for line in lines {
            buf.put_slice(b"data: ");
            buf.put_slice(line);
            buf.put_u8(b'\n');
        }

        if let Some(event_type) = self.event_type() {
            buf.put_slice(b"event: ");
            buf.put_slice(event_type.as_bytes());
            buf.put_u8(b'\n');
        }

        buf.put_u8(b'\n');
        buf.freeze()
    }

    /// Write the record to `sink` and flush it.
    ///
    /// Empty data is a no-op: nothing is written and the sink is not flushed.
    /// The first write error aborts the record and is returned; nothing is
    /// retried.
    pub async fn write_to<W>(&self, sink: &mut W) -> io::Result<()>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        if self.data.is_empty() {
            return Ok(());
        }

        if let Some(event_type) = self.event_type() {
            if event_type.contains(['\n', '\r']) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "SSE event type must be a single line",
                ));
            }
        }

        sink.write_all(&self.encode()).await?;
        sink.flush().await
    }
}
