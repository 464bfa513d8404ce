//! Transports and message channels.
//!
//! A [`PeerTransport`] is what a negotiator drives: it gathers local
//! candidates, runs connectivity checks and, once a candidate pair works,
//! yields a [`DataChannel`]. Two implementations ship with the crate:
//!
//! - [`MemoryTransport`]: in-process endpoints on a shared [`LoopbackNetwork`]
//! - [`TcpTransport`]: TCP host candidates with a framed wire format

pub mod frame;
pub mod memory;
mod queue;
pub mod tcp;

pub use frame::Frame;
pub use memory::{LoopbackNetwork, MemoryChannel, MemoryTransport};
pub use tcp::{TcpChannel, TcpTransport};

use crate::error::Result;
use crate::transfer::TransferMessage;
use ice::{Candidate, CandidatePair, IceCredentials};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Shared handle to an open message channel.
pub type DataChannel = Arc<dyn MessageChannel>;

/// Why [`MessageChannel::try_send`] did not take a message. The message is handed back.
#[derive(Debug, PartialEq, Eq)]
pub enum TrySendError {
    /// The send buffer is over its limit; wait and retry.
    Full(TransferMessage),
    Closed(TransferMessage),
}

/// Outcome of [`MessageChannel::wait_writable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Writable {
    Ready,
    TimedOut,
    Closed,
}

/// Why [`MessageChannel::recv_timeout`] returned no message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecvError {
    Timeout,
    /// Closed and fully drained.
    Closed,
    /// The remote sent a frame that could not be decoded; the channel is closed.
    Malformed(String),
}

impl fmt::Display for RecvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecvError::Timeout => write!(f, "receive timed out"),
            RecvError::Closed => write!(f, "channel closed"),
            RecvError::Malformed(reason) => write!(f, "malformed frame: {reason}"),
        }
    }
}

/// An ordered, reliable, message-oriented channel between the two peers.
///
/// Every method takes `&self`: one thread may be suspended in
/// [`wait_writable`](Self::wait_writable) while another calls
/// [`close`](Self::close).
pub trait MessageChannel: Send + Sync {
    fn label(&self) -> &str;

    /// Queues `msg` without blocking.
    fn try_send(&self, msg: TransferMessage) -> std::result::Result<(), TrySendError>;

    /// Waits until a message of `len` bytes would be accepted.
    fn wait_writable(&self, len: usize, timeout: Duration) -> Writable;

    /// Waits up to `timeout` for the next inbound message.
    fn recv_timeout(&self, timeout: Duration) -> std::result::Result<TransferMessage, RecvError>;

    /// Bytes accepted by `try_send` but not yet handed to the remote side.
    fn buffered_amount(&self) -> usize;

    fn is_closed(&self) -> bool;

    /// Closes both directions. Messages already queued are still delivered.
    fn close(&self);
}

impl fmt::Debug for dyn MessageChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageChannel")
            .field("label", &self.label())
            .field("buffered_amount", &self.buffered_amount())
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// The network side of a negotiator.
///
/// Every method except `gather_candidates` is non-blocking; the negotiator
/// calls [`poll_channel`](Self::poll_channel) from its own `poll`.
pub trait PeerTransport: Send {
    /// Starts listening and returns the local candidates.
    fn gather_candidates(
        &mut self,
        credentials: &IceCredentials,
        timeout: Duration,
    ) -> Result<Vec<Candidate>>;

    /// Starts a connectivity check from `pair.local` to `pair.remote`
    /// (controlling side only).
    fn start_check(
        &mut self,
        pair: &CandidatePair,
        local: &IceCredentials,
        remote: &IceCredentials,
        timeout: Duration,
    ) -> Result<()>;

    /// Returns an open channel once an outbound check succeeded or an
    /// inbound check presenting `local`/`remote` credentials was accepted.
    fn poll_channel(
        &mut self,
        local: &IceCredentials,
        remote: &IceCredentials,
    ) -> Result<Option<DataChannel>>;

    /// Stops listening and abandons pending checks. Open channels are not affected.
    fn close(&mut self);
}

/// Username and password a connectivity check toward the owner of `remote` carries.
pub(crate) fn check_credentials(local: &IceCredentials, remote: &IceCredentials) -> (String, String) {
    (local.check_username(remote), remote.pwd.clone())
}

/// Whether an inbound check presents the credentials `local` expects from `remote`.
pub(crate) fn check_matches(
    username: &str,
    password: &str,
    local: &IceCredentials,
    remote: &IceCredentials,
) -> bool {
    username == remote.check_username(local) && password == local.pwd
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_credentials_match_on_the_other_side() {
        let dialer = IceCredentials::generate();
        let acceptor = IceCredentials::generate();

        let (username, password) = check_credentials(&dialer, &acceptor);
        assert_eq!(username, format!("{}:{}", acceptor.ufrag, dialer.ufrag));
        assert!(check_matches(&username, &password, &acceptor, &dialer));
        assert!(!check_matches(&username, &password, &dialer, &acceptor));
    }
}
