//! Error types for SDP parsing and validation.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SdpError {
    #[error("line must be in format 'type=value': {0:?}")]
    InvalidLineFormat(String),

    #[error("failed to parse version")]
    InvalidVersion,

    #[error("SDP version must be 0")]
    InvalidVersionNumber,

    #[error("invalid origin format")]
    InvalidOriginFormat,

    #[error("session ID cannot be 0")]
    InvalidSessionId,

    #[error("session name cannot be empty")]
    EmptySessionName,

    #[error("SDP must contain at least one media description")]
    NoMediaSections,

    #[error("invalid media type: {0}")]
    InvalidMediaType(String),

    #[error("invalid media description format")]
    InvalidMediaFormat,

    #[error("media description must have at least one format")]
    NoMediaFormats,

    #[error("invalid port number")]
    InvalidPort,

    #[error("invalid direction: {0}")]
    InvalidDirection(String),

    #[error("missing attribute: {0}")]
    MissingAttribute(&'static str),
}
