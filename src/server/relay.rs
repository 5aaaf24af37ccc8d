//! Bridge between an upstream provider and an SSE sink.
//!
//! The provider runs in its own task and pushes events into a bounded
//! channel; this side is the single writer for the response. Events are
//! written in the order received, each followed by a flush.

use std::future::Future;
use std::io;
use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::sse::Event;
use crate::upstream::{ChatProvider, ChatRequest, ProviderError};

/// Counts for one relayed stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Provider events written as data events.
    pub relayed: usize,
    /// Synthesized `error` events written.
    pub error_events: usize,
}

/// How a stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// The provider finished and every event was written.
    Completed(RelayStats),
    /// The provider failed; a terminal `error` event was written.
    UpstreamFailed(RelayStats),
    /// The client went away, detected by a failed write or the sink's
    /// close signal. Nothing more was written.
    Disconnected(RelayStats),
}

impl RelayOutcome {
    pub fn stats(&self) -> RelayStats {
        match self {
            RelayOutcome::Completed(s)
            | RelayOutcome::UpstreamFailed(s)
            | RelayOutcome::Disconnected(s) => *s,
        }
    }
}

/// Write every event from `events` to `sink` until the channel closes.
///
/// An event that fails to serialize is replaced by one internal-error event
/// and dropped; relaying continues. A write error stops relaying and is
/// returned.
pub async fn relay_events<E, W>(
    events: &mut mpsc::Receiver<E>,
    sink: &mut W,
    stats: &mut RelayStats,
) -> io::Result<()>
where
    E: Serialize,
    W: AsyncWrite + Unpin + ?Sized,
{
    while let Some(event) = events.recv().await {
        match serde_json::to_vec(&event) {
            Ok(json) => {
                Event::data(json).write_to(sink).await?;
                stats.relayed += 1;
            }
            Err(e) => {
                warn!(error = %e, "Unable to serialize event");
                Event::internal_error().write_to(sink).await?;
                stats.error_events += 1;
            }
        }
    }
    Ok(())
}

/// Run one upstream generation and stream it to `sink`.
///
/// `client_gone` resolves when the client disconnects; the upstream call is
/// then cancelled even if it is not currently producing events. Sinks with
/// no disconnect signal pass `std::future::pending()`.
pub async fn stream_chat<W, F>(
    provider: Arc<dyn ChatProvider>,
    request: ChatRequest,
    sink: &mut W,
    buffer: usize,
    client_gone: F,
) -> RelayOutcome
where
    W: AsyncWrite + Unpin + ?Sized,
    F: Future<Output = ()>,
{
    let (tx, mut rx) = mpsc::channel(buffer.max(1));
    let upstream = tokio::spawn(async move { provider.chat_stream(request, tx).await });

    let mut stats = RelayStats::default();
    let relayed = tokio::select! {
        res = relay_events(&mut rx, sink, &mut stats) => res,
        () = client_gone => Err(io::Error::new(io::ErrorKind::BrokenPipe, "SSE client disconnected")),
    };

    if let Err(e) = relayed {
        debug!(error = %e, "Client went away, abandoning stream");
        upstream.abort();
        return RelayOutcome::Disconnected(stats);
    }

    // The channel only closes once the provider has returned.
    let result = match upstream.await {
        Ok(result) => result,
        Err(e) => Err(ProviderError::Stream(format!("upstream task failed: {e}"))),
    };

    match result {
        Ok(()) => RelayOutcome::Completed(stats),
        Err(e) => {
            error!(error = %e, "Unable to chat");
            match Event::internal_error().write_to(sink).await {
                Ok(()) => {
                    stats.error_events += 1;
                    RelayOutcome::UpstreamFailed(stats)
                }
                Err(write_err) => {
                    debug!(error = %write_err, "Client write failed while reporting upstream error");
                    RelayOutcome::Disconnected(stats)
                }
            }
        }
    }
}
