//! Channel-backed SSE sink.
//!
//! [`ChannelWriter`] buffers written bytes and hands them to the HTTP response
//! body only on flush, so each flushed SSE record reaches the client as one
//! chunk. The body side is a plain stream suitable for
//! `axum::body::Body::from_stream`.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::{Bytes, BytesMut};
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::PollSender;

/// Stream of flushed chunks consumed by the response body.
pub type BodyStream = ReceiverStream<io::Result<Bytes>>;

/// Create a writer/body pair. `capacity` bounds the number of flushed
/// records waiting for the client.
pub fn channel(capacity: usize) -> (ChannelWriter, BodyStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let writer = ChannelWriter {
        buf: BytesMut::new(),
        tx: PollSender::new(tx),
    };
    (writer, ReceiverStream::new(rx))
}

/// `AsyncWrite` half of an SSE response body.
///
/// Once the body is dropped (client went away) every write and flush fails
/// with `BrokenPipe`.
pub struct ChannelWriter {
    buf: BytesMut,
    tx: PollSender<io::Result<Bytes>>,
}

impl ChannelWriter {
    /// Whether the receiving body has been dropped or the writer shut down.
    pub fn is_closed(&self) -> bool {
        self.tx.get_ref().map_or(true, |tx| tx.is_closed())
    }

    /// Resolves once the receiving body is dropped.
    ///
    /// The returned future holds its own sender handle only while it is
    /// alive, so drop it before expecting the body to end.
    pub fn closed(&self) -> impl Future<Output = ()> + Send + 'static {
        let tx = self.tx.get_ref().cloned();
        async move {
            if let Some(tx) = tx {
                tx.closed().await;
            }
        }
    }
}

fn broken_pipe() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "SSE client disconnected")
}

impl AsyncWrite for ChannelWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.is_closed() {
            return Poll::Ready(Err(broken_pipe()));
        }
        this.buf.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.buf.is_empty() {
            return Poll::Ready(Ok(()));
        }

        ready!(this.tx.poll_reserve(cx)).map_err(|_| broken_pipe())?;
        let chunk = this.buf.split().freeze();
        this.tx.send_item(Ok(chunk)).map_err(|_| broken_pipe())?;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(self.as_mut().poll_flush(cx))?;
        self.get_mut().tx.close();
        Poll::Ready(Ok(()))
    }
}
