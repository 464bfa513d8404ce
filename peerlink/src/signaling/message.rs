//! Signal message JSON encoding

use crate::error::{PeerError, Result};
use crate::negotiation::{Candidate, SessionDescription};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A message exchanged over signaling.
///
/// JSON is internally tagged by `type`:
///
/// ```json
/// {"type":"offer","sdp":"v=0\r\n..."}
/// {"type":"candidate","candidate":"candidate:...","sdpMid":"0","sdpMLineIndex":0}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireMessage", from = "WireMessage")]
pub enum SignalMessage {
    Offer(SessionDescription),
    Answer(SessionDescription),
    Candidate(Candidate),
}

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum WireMessage {
    Offer { sdp: String },
    Answer { sdp: String },
    Candidate(Candidate),
}

impl From<SignalMessage> for WireMessage {
    fn from(msg: SignalMessage) -> Self {
        match msg {
            SignalMessage::Offer(desc) => WireMessage::Offer { sdp: desc.sdp },
            SignalMessage::Answer(desc) => WireMessage::Answer { sdp: desc.sdp },
            SignalMessage::Candidate(c) => WireMessage::Candidate(c),
        }
    }
}

impl From<WireMessage> for SignalMessage {
    fn from(wire: WireMessage) -> Self {
        match wire {
            WireMessage::Offer { sdp } => SignalMessage::Offer(SessionDescription::offer(sdp)),
            WireMessage::Answer { sdp } => SignalMessage::Answer(SessionDescription::answer(sdp)),
            WireMessage::Candidate(c) => SignalMessage::Candidate(c),
        }
    }
}

impl SignalMessage {
    /// Wraps a description in the variant matching its kind.
    pub fn description(desc: SessionDescription) -> Self {
        match desc.kind {
            crate::negotiation::SdpKind::Offer => SignalMessage::Offer(desc),
            crate::negotiation::SdpKind::Answer => SignalMessage::Answer(desc),
        }
    }

    pub fn kind(&self) -> SignalKind {
        match self {
            SignalMessage::Offer(_) => SignalKind::Offer,
            SignalMessage::Answer(_) => SignalKind::Answer,
            SignalMessage::Candidate(_) => SignalKind::Candidate,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| PeerError::MalformedMessage(e.to_string()))
    }

    /// Decodes one JSON message.
    ///
    /// When the `type` tag is readable but the body is not, the error
    /// carries the kind so the caller can tell a droppable candidate from a
    /// fatal description.
    pub fn from_json(text: &str) -> std::result::Result<Self, DecodeError> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DecodeError::new(None, e))?;
        let kind = value
            .get("type")
            .and_then(serde_json::Value::as_str)
            .and_then(|tag| tag.parse::<SignalKind>().ok());
        let Some(kind) = kind else {
            return Err(DecodeError::new(None, "missing or unknown \"type\""));
        };
        serde_json::from_value(value).map_err(|e| DecodeError::new(Some(kind), e))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalKind {
    Offer,
    Answer,
    Candidate,
}

impl SignalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalKind::Offer => "offer",
            SignalKind::Answer => "answer",
            SignalKind::Candidate => "candidate",
        }
    }
}

impl FromStr for SignalKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "offer" => Ok(SignalKind::Offer),
            "answer" => Ok(SignalKind::Answer),
            "candidate" => Ok(SignalKind::Candidate),
            _ => Err(()),
        }
    }
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A signal message that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed signal message: {message}")]
pub struct DecodeError {
    /// Kind named by the `type` tag, when it was readable.
    pub kind: Option<SignalKind>,
    pub message: String,
}

impl DecodeError {
    fn new(kind: Option<SignalKind>, message: impl ToString) -> Self {
        Self {
            kind,
            message: message.to_string(),
        }
    }

    /// Offers and answers cannot be skipped; candidates and unknown messages can.
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, Some(SignalKind::Offer | SignalKind::Answer))
    }
}

impl From<DecodeError> for PeerError {
    fn from(e: DecodeError) -> Self {
        PeerError::MalformedMessage(e.to_string())
    }
}
