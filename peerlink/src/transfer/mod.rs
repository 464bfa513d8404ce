//! Chunked payload transfer over a message channel
//!
//! A sender slices a payload into chunks of at most `max_chunk_size` bytes,
//! submits them in order under channel back-pressure and finishes with a
//! single end marker. A receiver appends chunks in arrival order and hands
//! the concatenation to its observer when the marker arrives.

mod chunker;
mod event;
mod message;
mod session;
mod state;

pub use chunker::{chunk_payload, reassemble};
pub use event::{TransferEvent, TransferObserver};
pub use message::TransferMessage;
pub use session::{ChunkedTransferSession, TransferReport};
pub use state::{TransferRole, TransferState};
