//! Server-Sent Events framing.
//!
//! - [`event`]: the wire record and its line-oriented encoding
//! - [`writer`]: an `AsyncWrite` sink that hands flushed records to an HTTP body

pub mod event;
pub mod writer;

pub use event::Event;
pub use writer::{channel, BodyStream, ChannelWriter};
