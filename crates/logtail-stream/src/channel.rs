//! Bounded delivery channel for log lines.

use tokio::sync::mpsc;

/// Consumer end of a tail. `recv` returning `None` means the tail finished.
pub type LineReceiver = mpsc::Receiver<String>;

/// Producer end of a tail.
///
/// Deliberately not `Clone`: the engine holds the only sender, so dropping it
/// closes the channel and can only happen once.
#[derive(Debug)]
pub struct LineSender {
    tx: mpsc::Sender<String>,
}

impl LineSender {
    /// Send one line, waiting while the channel is full.
    ///
    /// Returns `false` once the receiver is gone.
    pub(crate) async fn send(&self, line: String) -> bool {
        self.tx.send(line).await.is_ok()
    }
}

/// Create a bounded line channel. A capacity of zero is raised to one.
pub fn line_channel(capacity: usize) -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LineSender { tx }, rx)
}
