//! Whether a description is an offer or an answer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SdpType {
    /// Proposed by the initiator.
    Offer,
    /// Accepted by the responder.
    Answer,
}

impl SdpType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SdpType::Offer => "offer",
            SdpType::Answer => "answer",
        }
    }
}

impl fmt::Display for SdpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
