//! Transfer completion notifications

use std::sync::mpsc::Sender;

/// Callbacks of a [`ChunkedTransferSession`](super::ChunkedTransferSession).
///
/// For one session exactly one of the two fires, at most once.
pub trait TransferObserver: Send {
    /// The end marker arrived; `payload` is every chunk in arrival order.
    fn on_transfer_complete(&mut self, payload: &[u8]) {
        let _ = payload;
    }

    /// The transfer stopped early; partial data has been discarded.
    fn on_transfer_aborted(&mut self, reason: &str) {
        let _ = reason;
    }
}

/// No-op observer.
impl TransferObserver for () {}

/// Events emitted by the [`Sender<TransferEvent>`] observer adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferEvent {
    Completed(Vec<u8>),
    Aborted(String),
}

impl TransferObserver for Sender<TransferEvent> {
    fn on_transfer_complete(&mut self, payload: &[u8]) {
        let _ = self.send(TransferEvent::Completed(payload.to_vec()));
    }

    fn on_transfer_aborted(&mut self, reason: &str) {
        let _ = self.send(TransferEvent::Aborted(reason.to_string()));
    }
}
