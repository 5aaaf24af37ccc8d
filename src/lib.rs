//! chat-gateway: streams a language-model provider's reply to HTTP clients
//! as Server-Sent Events.
//!
//! A client posts one chat message to `POST /chat`. The gateway issues a
//! single streaming call to the upstream provider and relays every provider
//! event as a framed SSE record, flushed as soon as it is written. Failures
//! after the stream has opened are reported in-band as `error` events.

pub mod config;
pub mod metrics;
pub mod server;
pub mod sse;
pub mod upstream;
