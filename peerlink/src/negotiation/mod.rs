//! Session negotiation: descriptions, candidates and the connection state machine.

mod description;
mod events;
mod negotiator;
mod role;
mod state;

pub use description::{Candidate, SdpKind, SessionDescription};
pub use events::{CloseHandle, NegotiationObserver, NegotiatorEvent};
pub use negotiator::ConnectionNegotiator;
pub use role::NegotiationRole;
pub use state::ConnectionState;
