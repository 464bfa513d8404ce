//! ICE candidate types.

use crate::errors::IceError;
use std::fmt;

/// Represents the type of ICE candidate according to RFC 5245.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CandidateType {
    /// Host candidate - local interface address
    #[default]
    Host,
    /// Server Reflexive candidate - NAT-mapped address from STUN
    Srflx,
    /// Relay candidate - address from TURN server
    Relay,
    /// Peer Reflexive candidate - discovered during checks
    Prflx,
}

impl CandidateType {
    /// Parses the `typ` token of a candidate line.
    pub fn parse(s: &str) -> Result<Self, IceError> {
        match s {
            "host" => Ok(CandidateType::Host),
            "srflx" => Ok(CandidateType::Srflx),
            "relay" => Ok(CandidateType::Relay),
            "prflx" => Ok(CandidateType::Prflx),
            _ => Err(IceError::InvalidCandidateType(s.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateType::Host => "host",
            CandidateType::Srflx => "srflx",
            CandidateType::Relay => "relay",
            CandidateType::Prflx => "prflx",
        }
    }

    /// Type preference from RFC 5245 section 4.1.2.2.
    pub fn preference(&self) -> u32 {
        match self {
            CandidateType::Host => 126,
            CandidateType::Prflx => 110,
            CandidateType::Srflx => 100,
            CandidateType::Relay => 0,
        }
    }
}

impl fmt::Display for CandidateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
