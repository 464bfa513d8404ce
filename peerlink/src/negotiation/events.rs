//! Negotiator notifications and cross-thread close.

use super::description::Candidate;
use super::state::ConnectionState;
use crate::media::RemoteStream;
use crate::transport::DataChannel;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};

/// Receives everything a negotiator pushes to its application.
///
/// Cardinality per negotiator:
/// - `on_local_candidate`: zero or more, only after a local description exists
/// - `on_state_change`: once per transition
/// - `on_data_channel_ready`: at most once, when `Connected` is reached
/// - `on_remote_media`: at most once, on `Connected`, when the remote side sends audio or video
pub trait NegotiationObserver: Send {
    fn on_local_candidate(&mut self, candidate: Candidate) {
        let _ = candidate;
    }

    fn on_state_change(&mut self, state: ConnectionState) {
        let _ = state;
    }

    fn on_data_channel_ready(&mut self, channel: DataChannel) {
        let _ = channel;
    }

    fn on_remote_media(&mut self, stream: RemoteStream) {
        let _ = stream;
    }
}

/// No-op observer.
impl NegotiationObserver for () {}

/// Negotiator notifications as values, for the [`Sender`] observer adapter.
#[derive(Debug, Clone)]
pub enum NegotiatorEvent {
    LocalCandidate(Candidate),
    StateChanged(ConnectionState),
    DataChannelReady(DataChannel),
    RemoteMedia(RemoteStream),
}

impl NegotiationObserver for Sender<NegotiatorEvent> {
    fn on_local_candidate(&mut self, candidate: Candidate) {
        let _ = self.send(NegotiatorEvent::LocalCandidate(candidate));
    }

    fn on_state_change(&mut self, state: ConnectionState) {
        let _ = self.send(NegotiatorEvent::StateChanged(state));
    }

    fn on_data_channel_ready(&mut self, channel: DataChannel) {
        let _ = self.send(NegotiatorEvent::DataChannelReady(channel));
    }

    fn on_remote_media(&mut self, stream: RemoteStream) {
        let _ = self.send(NegotiatorEvent::RemoteMedia(stream));
    }
}

#[derive(Default)]
struct CloseShared {
    requested: AtomicBool,
    channel: Mutex<Option<DataChannel>>,
}

/// Closes a negotiator from another thread.
///
/// [`close`](Self::close) immediately closes the data channel, waking any
/// transfer suspended on it; the negotiator itself moves to `Closed` the
/// next time it is called.
#[derive(Clone, Default)]
pub struct CloseHandle {
    shared: Arc<CloseShared>,
}

impl CloseHandle {
    pub fn close(&self) {
        self.shared.requested.store(true, Ordering::SeqCst);
        let channel = self.lock_channel().take();
        if let Some(channel) = channel {
            channel.close();
        }
    }

    pub fn is_requested(&self) -> bool {
        self.shared.requested.load(Ordering::SeqCst)
    }

    /// Registers the open channel; closes it at once if a close was already requested.
    pub(crate) fn attach(&self, channel: DataChannel) {
        let mut slot = self.lock_channel();
        if self.is_requested() {
            channel.close();
        } else {
            *slot = Some(channel);
        }
    }

    fn lock_channel(&self) -> std::sync::MutexGuard<'_, Option<DataChannel>> {
        self.shared.channel.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for CloseHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloseHandle")
            .field("requested", &self.is_requested())
            .finish()
    }
}
