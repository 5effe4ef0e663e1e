//! Container log tailing for logtail.
//!
//! This crate opens a container's log stream, guards the open call with a
//! watchdog, and bridges the stream into a bounded channel of lines with a
//! single, idempotent teardown.

mod bridge;
mod cancel;
mod channel;
mod docker;
mod engine;
mod source;
mod watchdog;

pub use bridge::StopReason;
pub use cancel::{CancelHandle, CancelReason};
pub use channel::{LineReceiver, LineSender, line_channel};
pub use docker::DockerLogSource;
pub use engine::TailEngine;
pub use source::{LogSource, LogStream, ReaderLogStream};
