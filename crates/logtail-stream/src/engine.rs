//! Tail coordinator: opens the stream, arms the watchdog, launches the bridge.

use std::sync::Arc;

use logtail_core::{Error, Result, TailConfig, TailRequest};
use tracing::{Instrument, debug, info_span, warn};
use uuid::Uuid;

use crate::bridge;
use crate::cancel::{CancelHandle, CancelReason};
use crate::channel::{LineReceiver, LineSender, line_channel};
use crate::source::LogSource;
use crate::watchdog::{self, GateState, OpenGate};

/// Starts log tails against a [`LogSource`].
pub struct TailEngine<S> {
    source: S,
    config: TailConfig,
}

impl<S: LogSource> TailEngine<S> {
    /// Create an engine, rejecting unusable settings.
    pub fn new(source: S, config: TailConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { source, config })
    }

    /// Settings this engine runs with.
    pub const fn config(&self) -> &TailConfig {
        &self.config
    }

    /// The log source streams are opened from.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Create a delivery channel sized by the configured capacity.
    pub fn line_channel(&self) -> (LineSender, LineReceiver) {
        line_channel(self.config.channel_capacity)
    }

    /// Start tailing `request` into `lines`.
    ///
    /// Returns once the open call has resolved. On success the bridge runs in
    /// the background and the returned handle stops it. If the stream did not
    /// open within the grace period the tail counts as ended: the handle comes
    /// back already fired and the channel is closed. On failure the channel is
    /// already closed.
    pub async fn start_tail(
        &self,
        request: TailRequest,
        lines: LineSender,
    ) -> Result<CancelHandle> {
        let cancel = CancelHandle::new();
        self.start_tail_with(request, lines, cancel.clone()).await?;
        Ok(cancel)
    }

    /// Like [`start_tail`](Self::start_tail), with a handle the caller created
    /// up front and can fire while the open call is still pending.
    pub async fn start_tail_with(
        &self,
        request: TailRequest,
        lines: LineSender,
        cancel: CancelHandle,
    ) -> Result<()> {
        let span = info_span!("tail", id = %Uuid::new_v4(), container = %request);
        self.open_and_bridge(&request, lines, cancel)
            .instrument(span)
            .await
    }

    async fn open_and_bridge(
        &self,
        request: &TailRequest,
        lines: LineSender,
        cancel: CancelHandle,
    ) -> Result<()> {
        if let Err(err) = request.validate() {
            drop(lines);
            cancel.fire(CancelReason::OpenFailed);
            return Err(err);
        }

        let gate = Arc::new(OpenGate::new(lines));
        watchdog::spawn(gate.clone(), cancel.clone(), self.config.open_grace);

        let opened = tokio::select! {
            opened = self.source.open(request) => opened,
            () = cancel.cancelled() => {
                gate.abandon();
                return self.unopened(&gate);
            }
        };

        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                gate.abandon();
                cancel.fire(CancelReason::OpenFailed);
                warn!(error = %err, "log stream open failed");
                return Err(err);
            }
        };

        if cancel.is_cancelled() {
            gate.abandon();
        }
        let Some(lines) = gate.mark_opened() else {
            // Lost the race: the channel is closed, nothing may write to it.
            stream.close().await;
            return self.unopened(&gate);
        };

        debug!("log stream opened");
        bridge::spawn(stream, lines, cancel, self.config.max_line_bytes);
        Ok(())
    }

    /// A watchdog timeout ends the tail like an empty stream; only a caller
    /// cancellation is reported as an error.
    fn unopened(&self, gate: &OpenGate) -> Result<()> {
        if gate.state() == GateState::TimedOut {
            warn!(grace = ?self.config.open_grace, "log stream did not open in time");
            Ok(())
        } else {
            Err(Error::Cancelled)
        }
    }
}
