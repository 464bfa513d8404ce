//! Error types shared by every PeerLink component.

use std::io;
use thiserror::Error;

/// Errors returned by negotiation, transport and transfer operations.
#[derive(Debug, Error)]
pub enum PeerError {
    /// The operation is not allowed for the current role or state.
    #[error("{operation} is not valid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// The negotiator was closed; every later operation fails fast.
    #[error("connection is closed")]
    Closed,

    /// The message channel closed while an operation needed it.
    #[error("transport closed")]
    TransportClosed,

    #[error("timed out: {0}")]
    Timeout(String),

    /// A description, candidate or transfer frame could not be decoded.
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl PeerError {
    pub(crate) fn invalid_state(operation: &'static str, state: impl ToString) -> Self {
        PeerError::InvalidState {
            operation,
            state: state.to_string(),
        }
    }
}

impl From<ice::IceError> for PeerError {
    fn from(e: ice::IceError) -> Self {
        PeerError::MalformedMessage(e.to_string())
    }
}

impl From<sdp::SdpError> for PeerError {
    fn from(e: sdp::SdpError) -> Self {
        PeerError::MalformedMessage(e.to_string())
    }
}

impl From<config_loader::ConfigError> for PeerError {
    fn from(e: config_loader::ConfigError) -> Self {
        PeerError::Config(e.to_string())
    }
}

impl From<logging::LoggingError> for PeerError {
    fn from(e: logging::LoggingError) -> Self {
        PeerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, PeerError>;
