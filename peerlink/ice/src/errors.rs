//! Error types for ICE operations.

/// Errors that can occur while handling ICE candidates and credentials.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IceError {
    /// Candidate line does not have the mandatory fields
    #[error("Invalid candidate format")]
    InvalidCandidateFormat,
    /// Unknown `typ` value
    #[error("Invalid candidate type: {0}")]
    InvalidCandidateType(String),
    /// Transport other than UDP or TCP
    #[error("Invalid transport protocol: {0}")]
    InvalidTransportProtocol(String),
    /// Priority is not a 32-bit unsigned integer
    #[error("Invalid priority value")]
    InvalidPriority,
    /// Port is not a 16-bit unsigned integer
    #[error("Invalid port number")]
    InvalidPort,
    /// Address is not an IPv4/IPv6 literal
    #[error("Invalid IP address")]
    InvalidIpAddress,
    /// Component ID must be 1 (RTP) or 2 (RTCP)
    #[error("Invalid component ID (must be 1 or 2)")]
    InvalidComponentId,
    /// Empty foundation
    #[error("Invalid foundation")]
    InvalidFoundation,
    /// ufrag/pwd outside the lengths allowed by RFC 5245
    #[error("Invalid ICE credentials: {0}")]
    InvalidCredentials(String),
}
