//! Media collaborator boundary.
//!
//! The crate negotiates which audio/video tracks each side sends and tells
//! the application when the remote side's stream is available. Capturing,
//! encoding, rendering and recording media happen behind these traits.

use std::fmt;
use std::sync::mpsc::Sender;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub(crate) fn media_kind(&self) -> sdp::MediaKind {
        match self {
            TrackKind::Audio => sdp::MediaKind::Audio,
            TrackKind::Video => sdp::MediaKind::Video,
        }
    }

    pub(crate) fn from_media_kind(kind: sdp::MediaKind) -> Option<Self> {
        match kind {
            sdp::MediaKind::Audio => Some(TrackKind::Audio),
            sdp::MediaKind::Video => Some(TrackKind::Video),
            sdp::MediaKind::Application => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.media_kind().as_str())
    }
}

/// One local or remote media track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Track {
    pub id: String,
    pub kind: TrackKind,
}

impl Track {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
        }
    }

    pub fn audio(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Audio)
    }

    pub fn video(id: impl Into<String>) -> Self {
        Self::new(id, TrackKind::Video)
    }
}

/// The tracks the remote side announced it sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStream {
    pub stream_id: String,
    pub tracks: Vec<Track>,
}

/// A live capture device (camera, microphone, screen).
pub trait MediaSource {
    fn tracks(&self) -> Vec<Track>;
}

/// A fixed track list; stands in for a capture device.
impl MediaSource for Vec<Track> {
    fn tracks(&self) -> Vec<Track> {
        self.clone()
    }
}

/// Where a remote stream is played or recorded.
pub trait MediaSink: Send {
    fn attach(&mut self, stream: RemoteStream);
}

impl MediaSink for Sender<RemoteStream> {
    fn attach(&mut self, stream: RemoteStream) {
        let _ = self.send(stream);
    }
}
