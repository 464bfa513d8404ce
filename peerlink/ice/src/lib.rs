//! ICE Module - Interactive Connectivity Establishment
//!
//! The subset of RFC 5245 a PeerLink negotiator needs: candidate lines as
//! exchanged over signaling, pair priorities for ordering connectivity
//! checks, and the username fragment / password pair advertised in session
//! descriptions.

pub mod candidate;
pub mod candidate_pair;
pub mod candidate_type;
pub mod credentials;
pub mod errors;

pub use candidate::{Candidate, Transport};
pub use candidate_pair::CandidatePair;
pub use candidate_type::CandidateType;
pub use credentials::IceCredentials;
pub use errors::IceError;
