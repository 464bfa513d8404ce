//! Negotiation roles.

use std::fmt;

/// Which side of the offer/answer exchange a negotiator plays.
///
/// The initiator is also the controlling side of connectivity checks: it
/// dials the responder's candidates, while the responder only accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationRole {
    Initiator,
    Responder,
}

impl NegotiationRole {
    pub fn is_controlling(&self) -> bool {
        matches!(self, NegotiationRole::Initiator)
    }
}

impl fmt::Display for NegotiationRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NegotiationRole::Initiator => write!(f, "initiator"),
            NegotiationRole::Responder => write!(f, "responder"),
        }
    }
}
