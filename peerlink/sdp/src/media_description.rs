//! SDP media description (`m=`) sections.

use crate::{attribute::Attribute, errors::SdpError};
use std::fmt;
use std::str::FromStr;

/// Media types a PeerLink description may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Audio,
    Video,
    /// The data channel section.
    Application,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
            MediaKind::Application => "application",
        }
    }
}

impl FromStr for MediaKind {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "audio" => Ok(MediaKind::Audio),
            "video" => Ok(MediaKind::Video),
            "application" => Ok(MediaKind::Application),
            other => Err(SdpError::InvalidMediaType(other.to_string())),
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media direction attribute of a section (RFC 3264 section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    SendRecv,
    SendOnly,
    RecvOnly,
    Inactive,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::SendRecv => "sendrecv",
            Direction::SendOnly => "sendonly",
            Direction::RecvOnly => "recvonly",
            Direction::Inactive => "inactive",
        }
    }

    /// Whether the side advertising this direction will send media.
    pub fn sends(&self) -> bool {
        matches!(self, Direction::SendRecv | Direction::SendOnly)
    }
}

impl FromStr for Direction {
    type Err = SdpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sendrecv" => Ok(Direction::SendRecv),
            "sendonly" => Ok(Direction::SendOnly),
            "recvonly" => Ok(Direction::RecvOnly),
            "inactive" => Ok(Direction::Inactive),
            other => Err(SdpError::InvalidDirection(other.to_string())),
        }
    }
}

/// One `m=<media> <port> <proto> <fmt> ...` line and the attributes that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaDescription {
    pub kind: MediaKind,
    pub port: u16,
    pub protocol: String,
    pub formats: Vec<String>,
    pub attributes: Vec<Attribute>,
}

const DISCARD_PORT: u16 = 9;
const DATA_CHANNEL_PROTOCOL: &str = "UDP/DTLS/SCTP";
const RTP_PROTOCOL: &str = "UDP/TLS/RTP/SAVPF";

impl MediaDescription {
    pub fn new(kind: MediaKind, port: u16, protocol: impl Into<String>, formats: Vec<String>) -> Self {
        Self {
            kind,
            port,
            protocol: protocol.into(),
            formats,
            attributes: Vec::new(),
        }
    }

    /// `m=application 9 UDP/DTLS/SCTP webrtc-datachannel` tagged with `mid`.
    pub fn data_channel(mid: &str) -> Self {
        Self::new(
            MediaKind::Application,
            DISCARD_PORT,
            DATA_CHANNEL_PROTOCOL,
            vec!["webrtc-datachannel".to_string()],
        )
        .with_attribute(Attribute::with_value("mid", mid))
    }

    /// An audio or video section with the given direction.
    ///
    /// `msid` is `(stream id, track id)` and is only set when the side sends media.
    pub fn track(kind: MediaKind, mid: &str, direction: Direction, msid: Option<(&str, &str)>) -> Self {
        let format = match kind {
            MediaKind::Audio => "111",
            _ => "96",
        };
        let mut media = Self::new(kind, DISCARD_PORT, RTP_PROTOCOL, vec![format.to_string()])
            .with_attribute(Attribute::with_value("mid", mid))
            .with_attribute(Attribute::flag(direction.as_str()));
        if let Some((stream, track)) = msid {
            media = media.with_attribute(Attribute::with_value("msid", format!("{stream} {track}")));
        }
        media
    }

    pub fn with_attribute(mut self, attr: Attribute) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Parses the text after `m=`.
    pub fn parse(value: &str) -> Result<Self, SdpError> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(SdpError::InvalidMediaFormat);
        }

        let kind = parts[0].parse()?;
        let port = parts[1].parse().map_err(|_| SdpError::InvalidPort)?;

        Ok(Self::new(
            kind,
            port,
            parts[2],
            parts[3..].iter().map(|s| s.to_string()).collect(),
        ))
    }

    pub fn validate(&self) -> Result<(), SdpError> {
        if self.formats.is_empty() {
            return Err(SdpError::NoMediaFormats);
        }
        Ok(())
    }

    /// First value of the attribute called `name`.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }

    pub fn mid(&self) -> Option<&str> {
        self.attribute("mid")
    }

    /// Direction flag of the section; `sendrecv` when absent (RFC 3264).
    pub fn direction(&self) -> Direction {
        self.attributes
            .iter()
            .filter(|a| a.value.is_none())
            .find_map(|a| a.name.parse().ok())
            .unwrap_or(Direction::SendRecv)
    }

    /// `(stream id, track id)` from `a=msid`.
    pub fn msid(&self) -> Option<(&str, &str)> {
        self.attribute("msid")?.split_once(' ')
    }
}

impl fmt::Display for MediaDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "m={} {} {} {}\r\n",
            self.kind,
            self.port,
            self.protocol,
            self.formats.join(" ")
        )?;
        for attr in &self.attributes {
            write!(f, "{}", attr)?;
        }
        Ok(())
    }
}
