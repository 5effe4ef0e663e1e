//! The boundary to whatever serves container logs.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use logtail_core::{Result, TailRequest};
use tokio::io::{AsyncRead, ReadBuf};

/// An open, followable log stream.
///
/// Reads block until the remote side produces bytes. `close` releases the
/// remote request; reads after a close report end of stream.
#[async_trait]
pub trait LogStream: AsyncRead + Send + Unpin {
    /// Release the underlying request.
    async fn close(&mut self);
}

/// Opens log streams for tail requests.
#[async_trait]
pub trait LogSource: Send + Sync + 'static {
    /// Open a stream for `request`. May block until the remote side answers.
    async fn open(&self, request: &TailRequest) -> Result<Box<dyn LogStream>>;
}

/// Adapts any async reader into a [`LogStream`]; closing drops the reader.
pub struct ReaderLogStream<R> {
    reader: Option<R>,
}

impl<R> ReaderLogStream<R> {
    /// Wrap `reader`.
    pub const fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
        }
    }

    /// Whether the stream has been closed.
    pub const fn is_closed(&self) -> bool {
        self.reader.is_none()
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ReaderLogStream<R> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.get_mut().reader.as_mut() {
            Some(reader) => Pin::new(reader).poll_read(cx, buf),
            None => Poll::Ready(Ok(())),
        }
    }
}

#[async_trait]
impl<R: AsyncRead + Send + Unpin> LogStream for ReaderLogStream<R> {
    async fn close(&mut self) {
        self.reader = None;
    }
}
