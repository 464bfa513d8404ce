//! Signaling: the side channel that carries descriptions and candidates
//!
//! The negotiator never talks to a [`SignalChannel`] itself; a
//! [`Peer`](crate::Peer) pumps messages between the two.

mod channel;
mod message;

pub use channel::{MemorySignalChannel, SignalChannel, TcpSignalChannel};
pub use message::{DecodeError, SignalKind, SignalMessage};
