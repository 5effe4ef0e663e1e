//! Moves an open log stream into the line channel.

use std::io;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, warn};

use crate::cancel::{CancelHandle, CancelReason};
use crate::channel::LineSender;
use crate::source::LogStream;

/// Why the bridge stopped reading.
#[derive(Debug)]
pub enum StopReason {
    /// The stream reported end of data.
    EndOfStream,
    /// Reading from the stream failed.
    ReadFailed(io::Error),
    /// Cancellation fired.
    Cancelled,
    /// The consumer dropped its receiver.
    ConsumerGone,
}

pub(crate) fn spawn(
    stream: Box<dyn LogStream>,
    lines: LineSender,
    cancel: CancelHandle,
    max_line_bytes: usize,
) -> JoinHandle<StopReason> {
    tokio::spawn(run(stream, lines, cancel, max_line_bytes).in_current_span())
}

/// Stream lines until a stop condition, then clean up exactly once:
/// close the channel, close the stream, fire cancellation.
pub(crate) async fn run(
    mut stream: Box<dyn LogStream>,
    lines: LineSender,
    cancel: CancelHandle,
    max_line_bytes: usize,
) -> StopReason {
    let (reason, delivered) = pump(&mut *stream, &lines, &cancel, max_line_bytes).await;

    drop(lines);
    stream.close().await;
    cancel.fire(CancelReason::StreamEnded);

    match &reason {
        StopReason::ReadFailed(err) => warn!(error = %err, delivered, "log stream read failed"),
        other => debug!(reason = ?other, delivered, "log stream closed"),
    }
    reason
}

async fn pump(
    stream: &mut dyn LogStream,
    lines: &LineSender,
    cancel: &CancelHandle,
    max_line_bytes: usize,
) -> (StopReason, u64) {
    let limit = u64::try_from(max_line_bytes).unwrap_or(u64::MAX);
    let mut reader = BufReader::new(stream);
    let mut buf = Vec::new();
    let mut delivered = 0;

    loop {
        buf.clear();
        let mut bounded = (&mut reader).take(limit);
        let read = tokio::select! {
            biased;
            () = cancel.cancelled() => return (StopReason::Cancelled, delivered),
            read = bounded.read_until(b'\n', &mut buf) => read,
        };
        match read {
            Ok(0) => return (StopReason::EndOfStream, delivered),
            Ok(n) if n >= max_line_bytes && buf.last() != Some(&b'\n') => {
                let err = io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("line exceeds {max_line_bytes} bytes"),
                );
                return (StopReason::ReadFailed(err), delivered);
            }
            Ok(_) => {}
            Err(err) => return (StopReason::ReadFailed(err), delivered),
        }

        let line = decode_line(&buf);
        tokio::select! {
            biased;
            () = cancel.cancelled() => return (StopReason::Cancelled, delivered),
            sent = lines.send(line) => {
                if !sent {
                    return (StopReason::ConsumerGone, delivered);
                }
            }
        }
        delivered += 1;

        if cancel.is_cancelled() {
            return (StopReason::Cancelled, delivered);
        }
    }
}

/// Strip the `\n` or `\r\n` terminator and decode, replacing invalid UTF-8.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}
