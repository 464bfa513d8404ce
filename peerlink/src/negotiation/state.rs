//! Connection state types.

use std::fmt;

/// Lifecycle of one negotiator.
///
/// ```text
/// New -> Negotiating -> Connected -> Closed
///   \________\______________\-----> Failed
/// ```
///
/// `Closed` is reachable from every non-terminal state; the state never moves backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No description produced or applied yet
    #[default]
    New,
    /// A local description exists; waiting for a working candidate pair
    Negotiating,
    /// The data channel is open
    Connected,
    /// Closed by the application
    Closed,
    /// Unrecoverable negotiation error or timeout
    Failed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Closed | ConnectionState::Failed)
    }

    pub fn can_transition_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (New, Negotiating)
                | (Negotiating, Connected)
                | (New | Negotiating | Connected, Closed)
                | (New | Negotiating | Connected, Failed)
        )
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Negotiating => write!(f, "negotiating"),
            Self::Connected => write!(f, "connected"),
            Self::Closed => write!(f, "closed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
