//! PeerLink - two-party session negotiation and chunked payload transfer
//!
//! A [`ConnectionNegotiator`] drives one side of an offer/answer/candidate
//! exchange over a [`SignalChannel`] until a [`PeerTransport`] yields a data
//! channel. A [`ChunkedTransferSession`] then moves a byte payload across that
//! channel in bounded chunks followed by a typed end marker.
//!
//! Media capture, rendering and file persistence stay outside the crate and
//! are reached through the traits in [`media`] and [`sink`].

pub mod config;
pub mod error;
pub mod media;
pub mod negotiation;
pub mod peer;
pub mod signaling;
pub mod sink;
pub mod source;
pub mod transfer;
pub mod transport;

pub use config::{LoggingConfig, NegotiationConfig, PeerConfig, TransferConfig};
pub use error::{PeerError, Result};
pub use media::{MediaSink, MediaSource, RemoteStream, Track, TrackKind};
pub use negotiation::{
    Candidate, CloseHandle, ConnectionNegotiator, ConnectionState, NegotiationObserver,
    NegotiationRole, NegotiatorEvent, SdpKind, SessionDescription,
};
pub use peer::Peer;
pub use signaling::{DecodeError, MemorySignalChannel, SignalChannel, SignalKind, SignalMessage, TcpSignalChannel};
pub use sink::{CompletedTransferSink, DirectorySink};
pub use source::{FileByteSource, FileSource};
pub use transfer::{
    ChunkedTransferSession, TransferEvent, TransferMessage, TransferObserver, TransferReport,
    TransferRole, TransferState, chunk_payload, reassemble,
};
pub use transport::{
    DataChannel, LoopbackNetwork, MemoryTransport, MessageChannel, PeerTransport, RecvError,
    TcpTransport, TrySendError, Writable,
};
