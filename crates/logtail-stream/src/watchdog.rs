//! Open gate and the watchdog that guards it.
//!
//! The gate is the single place the race between "the stream opened" and
//! "the grace period ran out" is decided. Whoever resolves it first takes the
//! line sender; the loser finds the gate resolved and backs off.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{Instrument, debug};

use crate::cancel::{CancelHandle, CancelReason};
use crate::channel::LineSender;

/// Resolution of the open race.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum GateState {
    Pending,
    Opened,
    TimedOut,
    Abandoned,
}

impl GateState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Pending,
            1 => Self::Opened,
            2 => Self::TimedOut,
            _ => Self::Abandoned,
        }
    }

    const fn to_u8(self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Opened => 1,
            Self::TimedOut => 2,
            Self::Abandoned => 3,
        }
    }
}

pub(crate) struct OpenGate {
    state: AtomicU8,
    lines: Mutex<Option<LineSender>>,
}

impl OpenGate {
    pub(crate) fn new(lines: LineSender) -> Self {
        Self {
            state: AtomicU8::new(GateState::Pending.to_u8()),
            lines: Mutex::new(Some(lines)),
        }
    }

    pub(crate) fn state(&self) -> GateState {
        GateState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Claim the sender for the bridge. `None` if the gate was already resolved.
    pub(crate) fn mark_opened(&self) -> Option<LineSender> {
        self.resolve(GateState::Opened)
    }

    /// Resolve as timed out, closing the channel. `true` if this call won.
    pub(crate) fn time_out(&self) -> bool {
        self.resolve(GateState::TimedOut).is_some()
    }

    /// Resolve as abandoned, closing the channel. `true` if this call won.
    pub(crate) fn abandon(&self) -> bool {
        self.resolve(GateState::Abandoned).is_some()
    }

    fn resolve(&self, to: GateState) -> Option<LineSender> {
        self.state
            .compare_exchange(
                GateState::Pending.to_u8(),
                to.to_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .ok()?;
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

/// Arm the watchdog for one open call.
///
/// When `grace` elapses with the gate still pending, the channel is closed and
/// cancellation fires. A resolved gate leaves the watchdog inert; a fired
/// cancellation retires it early.
pub(crate) fn spawn(gate: Arc<OpenGate>, cancel: CancelHandle, grace: Duration) -> JoinHandle<()> {
    tokio::spawn(
        async move {
            tokio::select! {
                () = tokio::time::sleep(grace) => {}
                () = cancel.cancelled() => return,
            }

            if gate.time_out() {
                debug!(?grace, "log stream did not open in time, closing channel");
                cancel.fire(CancelReason::Watchdog);
            }
        }
        .in_current_span(),
    )
}
