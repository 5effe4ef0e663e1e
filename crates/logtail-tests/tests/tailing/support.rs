//! In-memory log sources for driving the engine.

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use logtail_core::{Error, Result, TailConfig, TailRequest};
use logtail_stream::{LineReceiver, LogSource, LogStream, ReaderLogStream};
use tokio::io::{AsyncRead, DuplexStream, ReadBuf};

pub const WAIT: Duration = Duration::from_secs(2);

pub fn request() -> TailRequest {
    TailRequest::new("default", "web-0", "nginx").with_line_limit(100)
}

pub fn config(grace_ms: u64, capacity: usize) -> TailConfig {
    TailConfig {
        open_grace: Duration::from_millis(grace_ms),
        channel_capacity: capacity,
        ..TailConfig::default()
    }
}

/// Counts how often the engine closes a stream.
#[derive(Clone, Default)]
pub struct CloseCounter(Arc<AtomicUsize>);

impl CloseCounter {
    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct TrackedStream<R> {
    inner: ReaderLogStream<R>,
    closes: CloseCounter,
}

impl<R: AsyncRead + Unpin> AsyncRead for TrackedStream<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

#[async_trait]
impl<R: AsyncRead + Send + Unpin> LogStream for TrackedStream<R> {
    async fn close(&mut self) {
        self.inner.close().await;
        self.closes.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// A stream whose remote end stays with the test.
pub fn remote_stream() -> (DuplexStream, Box<dyn LogStream>, CloseCounter) {
    let (remote, local) = tokio::io::duplex(4096);
    let (stream, closes) = tracked(local);
    (remote, stream, closes)
}

pub fn tracked<R: AsyncRead + Send + Unpin + 'static>(
    reader: R,
) -> (Box<dyn LogStream>, CloseCounter) {
    let closes = CloseCounter::default();
    let stream = TrackedStream {
        inner: ReaderLogStream::new(reader),
        closes: closes.clone(),
    };
    (Box::new(stream), closes)
}

/// Yields `data`, then fails every further read.
pub struct FailingReader {
    data: Option<&'static [u8]>,
}

impl FailingReader {
    pub const fn new(data: &'static [u8]) -> Self {
        Self { data: Some(data) }
    }
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        match self.data.take() {
            Some(data) => {
                buf.put_slice(data);
                Poll::Ready(Ok(()))
            }
            None => Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset",
            ))),
        }
    }
}

/// What the next open call does.
pub enum Open {
    Stream(Box<dyn LogStream>),
    Fail(&'static str),
    Hang,
}

/// Serves one scripted open, optionally after a delay.
pub struct FakeSource {
    next: Mutex<Option<Open>>,
    delay: Duration,
    opens: AtomicUsize,
}

impl FakeSource {
    pub fn new(open: Open) -> Self {
        Self {
            next: Mutex::new(Some(open)),
            delay: Duration::ZERO,
            opens: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSource for FakeSource {
    async fn open(&self, _request: &TailRequest) -> Result<Box<dyn LogStream>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;

        let next = self.next.lock().unwrap().take();
        match next {
            Some(Open::Stream(stream)) => Ok(stream),
            Some(Open::Fail(reason)) => Err(Error::Stream(reason.to_string())),
            Some(Open::Hang) | None => std::future::pending().await,
        }
    }
}

/// Drain the channel until it closes, failing if that takes longer than [`WAIT`].
pub async fn collect(rx: &mut LineReceiver) -> Vec<String> {
    tokio::time::timeout(WAIT, async {
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    })
    .await
    .expect("channel should close")
}
