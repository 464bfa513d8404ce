//! Signaling payloads: session descriptions and trickled candidates.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SdpKind {
    Offer,
    Answer,
}

impl SdpKind {
    pub(crate) fn sdp_type(&self) -> sdp::SdpType {
        match self {
            SdpKind::Offer => sdp::SdpType::Offer,
            SdpKind::Answer => sdp::SdpType::Answer,
        }
    }
}

impl fmt::Display for SdpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sdp_type().as_str())
    }
}

/// One side's offer or answer, as carried over signaling.
///
/// Serialized as `{"type": "offer", "sdp": "v=0\r\n..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub kind: SdpKind,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            kind: SdpKind::Answer,
            sdp: sdp.into(),
        }
    }

    /// Parses and validates the SDP body.
    pub fn parse(&self) -> Result<sdp::SessionDescription, sdp::SdpError> {
        sdp::SessionDescription::parse(self.kind.sdp_type(), &self.sdp)
    }
}

/// A trickled ICE candidate.
///
/// Serialized with browser field names:
/// `{"candidate": "candidate:1 1 UDP ...", "sdpMid": "0", "sdpMLineIndex": 0}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default)]
    pub sdp_mid: Option<String>,
    #[serde(rename = "sdpMLineIndex", default)]
    pub sdp_mline_index: Option<u16>,
}

impl Candidate {
    pub fn new(candidate: impl Into<String>) -> Self {
        Self {
            candidate: candidate.into(),
            sdp_mid: None,
            sdp_mline_index: None,
        }
    }

    /// Wraps a gathered candidate for the data channel section (`mid` 0).
    pub(crate) fn from_ice(candidate: &ice::Candidate) -> Self {
        Self {
            candidate: candidate.to_string(),
            sdp_mid: Some("0".to_string()),
            sdp_mline_index: Some(0),
        }
    }

    pub fn parse(&self) -> Result<ice::Candidate, ice::IceError> {
        ice::Candidate::parse(&self.candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_description_json_shape() {
        let desc = SessionDescription::offer("v=0\r\n");
        let json = serde_json::to_string(&desc).unwrap();
        assert_eq!(json, r#"{"type":"offer","sdp":"v=0\r\n"}"#);

        let back: SessionDescription = serde_json::from_str(&json).unwrap();
        assert_eq!(back, desc);
    }

    #[test]
    fn test_candidate_json_uses_browser_names() {
        let json = r#"{"candidate":"candidate:1 1 UDP 2130706431 127.0.0.1 5000 typ host","sdpMid":"0","sdpMLineIndex":0}"#;
        let candidate: Candidate = serde_json::from_str(json).unwrap();
        assert_eq!(candidate.sdp_mid.as_deref(), Some("0"));
        assert_eq!(candidate.sdp_mline_index, Some(0));
        assert_eq!(candidate.parse().unwrap().port, 5000);
    }

    #[test]
    fn test_candidate_optional_fields() {
        let candidate: Candidate =
            serde_json::from_str(r#"{"candidate":"garbage","sdpMid":null}"#).unwrap();
        assert_eq!(candidate.sdp_mid, None);
        assert_eq!(candidate.sdp_mline_index, None);
        assert!(candidate.parse().is_err());
    }
}
