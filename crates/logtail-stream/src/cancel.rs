//! One-shot cancellation shared by the watchdog, the bridge and the caller.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use tokio_util::sync::CancellationToken;

/// Which actor fired a session's cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller asked for the tail to stop.
    Caller,
    /// The log stream did not open within the grace period.
    Watchdog,
    /// The open call failed.
    OpenFailed,
    /// The bridge finished streaming.
    StreamEnded,
}

impl CancelReason {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Caller => 1,
            Self::Watchdog => 2,
            Self::OpenFailed => 3,
            Self::StreamEnded => 4,
        }
    }

    const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Caller),
            2 => Some(Self::Watchdog),
            3 => Some(Self::OpenFailed),
            4 => Some(Self::StreamEnded),
            _ => None,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Caller => "caller",
            Self::Watchdog => "watchdog",
            Self::OpenFailed => "open failed",
            Self::StreamEnded => "stream ended",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Default)]
struct Inner {
    fired: AtomicBool,
    reason: AtomicU8,
    token: CancellationToken,
}

/// Handle to a tail session's cancellation signal.
///
/// The signal moves from armed to fired at most once. Clones share the same
/// signal, and firing an already-fired handle does nothing.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    inner: Arc<Inner>,
}

impl CancelHandle {
    /// Create an armed handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the tail. Safe to call any number of times.
    pub fn cancel(&self) {
        self.fire(CancelReason::Caller);
    }

    /// Fire the signal on behalf of `reason`.
    ///
    /// Returns `true` only for the call that moved the signal to fired.
    pub fn fire(&self, reason: CancelReason) -> bool {
        if self.inner.fired.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.inner.reason.store(reason.to_u8(), Ordering::Release);
        self.inner.token.cancel();
        true
    }

    /// Whether the signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// The actor that fired the signal, once it has fired.
    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_u8(self.inner.reason.load(Ordering::Acquire))
    }

    /// Resolves once the signal has fired.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await;
    }
}
