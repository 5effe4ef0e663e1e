//! Caller cancellation and consumer disconnects.

use std::time::Duration;

use anyhow::Result;
use logtail_core::Error;
use logtail_stream::{CancelHandle, CancelReason, TailEngine};
use tokio::io::AsyncWriteExt;

use super::support::{FakeSource, Open, WAIT, collect, config, remote_stream, request};

#[tokio::test]
async fn test_cancel_after_first_line() -> Result<()> {
    let (mut remote, stream, closes) = remote_stream();
    let engine = TailEngine::new(FakeSource::new(Open::Stream(stream)), config(500, 4))?;
    let (tx, mut rx) = engine.line_channel();
    let cancel = engine.start_tail(request(), tx).await?;

    remote.write_all(b"a\n").await?;
    let first = tokio::time::timeout(WAIT, rx.recv()).await?;
    assert_eq!(first.as_deref(), Some("a"));

    cancel.cancel();
    assert!(collect(&mut rx).await.is_empty());

    // The remote side still has more to say; nobody is listening.
    remote.write_all(b"b\n").await.ok();
    assert_eq!(rx.recv().await, None);

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(closes.count(), 1);
    assert_eq!(cancel.reason(), Some(CancelReason::Caller));

    Ok(())
}

#[tokio::test]
async fn test_double_cancel_is_harmless() -> Result<()> {
    let (_remote, stream, closes) = remote_stream();
    let engine = TailEngine::new(FakeSource::new(Open::Stream(stream)), config(500, 4))?;
    let (tx, mut rx) = engine.line_channel();
    let cancel = engine.start_tail(request(), tx).await?;

    cancel.cancel();
    cancel.cancel();
    cancel.clone().cancel();

    assert!(collect(&mut rx).await.is_empty());
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(closes.count(), 1);
    assert_eq!(cancel.reason(), Some(CancelReason::Caller));

    Ok(())
}

#[tokio::test]
async fn test_cancel_while_open_is_pending() -> Result<()> {
    let engine = TailEngine::new(FakeSource::new(Open::Hang), config(10_000, 4))?;
    let (tx, mut rx) = engine.line_channel();
    let cancel = CancelHandle::new();

    let pending = {
        let cancel = cancel.clone();
        tokio::spawn(async move { engine.start_tail_with(request(), tx, cancel).await })
    };

    tokio::time::sleep(Duration::from_millis(20)).await;
    cancel.cancel();

    let result = tokio::time::timeout(WAIT, pending).await??;
    assert!(matches!(result, Err(Error::Cancelled)));
    assert!(collect(&mut rx).await.is_empty());
    assert_eq!(cancel.reason(), Some(CancelReason::Caller));

    Ok(())
}

#[tokio::test]
async fn test_consumer_disconnect_tears_down() -> Result<()> {
    let (mut remote, stream, closes) = remote_stream();
    let engine = TailEngine::new(FakeSource::new(Open::Stream(stream)), config(500, 1))?;
    let (tx, rx) = engine.line_channel();
    let cancel = engine.start_tail(request(), tx).await?;

    drop(rx);
    remote.write_all(b"into the void\n").await?;

    tokio::time::timeout(WAIT, cancel.cancelled()).await?;
    assert_eq!(cancel.reason(), Some(CancelReason::StreamEnded));
    assert_eq!(closes.count(), 1);

    Ok(())
}

#[tokio::test]
async fn test_cancel_unblocks_full_channel() -> Result<()> {
    let (mut remote, stream, closes) = remote_stream();
    let engine = TailEngine::new(FakeSource::new(Open::Stream(stream)), config(500, 1))?;
    let (tx, mut rx) = engine.line_channel();
    let cancel = engine.start_tail(request(), tx).await?;

    // One line fills the channel, the next one blocks the bridge on send.
    remote.write_all(b"one\ntwo\nthree\n").await?;
    tokio::time::sleep(Duration::from_millis(20)).await;

    cancel.cancel();
    let drained = collect(&mut rx).await;
    assert!(drained.len() <= 2, "got {drained:?}");
    assert_eq!(drained.first().map(String::as_str), Some("one"));

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(closes.count(), 1);

    Ok(())
}
