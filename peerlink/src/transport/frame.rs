//! TCP wire frames.
//!
//! ```text
//! +--------+----------------+-----------------+
//! | type:8 | length:32 (BE) | payload:length  |
//! +--------+----------------+-----------------+
//! ```

use crate::error::{PeerError, Result};
use crate::transfer::TransferMessage;
use std::io::{self, Read, Write};

/// Frame payloads above this are rejected before allocation.
pub const MAX_FRAME_PAYLOAD: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Chunk(Vec<u8>),
    End,
    /// Connectivity check: `"<username> <password>"`.
    Hello { username: String, password: String },
    HelloAck,
}

impl Frame {
    const TYPE_CHUNK: u8 = 0x01;
    const TYPE_END: u8 = 0x02;
    const TYPE_HELLO: u8 = 0x10;
    const TYPE_HELLO_ACK: u8 = 0x11;
    const HEADER_LEN: usize = 5;

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Frame::Chunk(data) => Self::encode(Self::TYPE_CHUNK, data),
            Frame::End => Self::encode(Self::TYPE_END, &[]),
            Frame::Hello { username, password } => {
                Self::encode(Self::TYPE_HELLO, format!("{username} {password}").as_bytes())
            }
            Frame::HelloAck => Self::encode(Self::TYPE_HELLO_ACK, &[]),
        }
    }

    fn encode(frame_type: u8, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::HEADER_LEN + payload.len());
        buf.push(frame_type);
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()
    }

    /// Reads one frame. `Ok(None)` means the stream ended cleanly between frames.
    ///
    /// # Errors
    ///
    /// `MalformedMessage` for an unknown type, a non-empty end or ack frame,
    /// an oversized length or a non-UTF-8 hello; `Io` for read failures,
    /// including a stream that ends mid-frame.
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Option<Frame>> {
        let mut header = [0u8; Self::HEADER_LEN];
        let mut filled = 0;
        while filled < header.len() {
            match reader.read(&mut header[filled..]) {
                Ok(0) if filled == 0 => return Ok(None),
                Ok(0) => return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into()),
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        let frame_type = header[0];
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        if len > MAX_FRAME_PAYLOAD {
            return Err(PeerError::MalformedMessage(format!(
                "frame length {len} exceeds {MAX_FRAME_PAYLOAD}"
            )));
        }

        match frame_type {
            Self::TYPE_CHUNK => Ok(Some(Frame::Chunk(Self::read_payload(reader, len)?))),
            Self::TYPE_END | Self::TYPE_HELLO_ACK if len != 0 => Err(PeerError::MalformedMessage(
                format!("frame type {frame_type:#04x} must be empty, got {len} bytes"),
            )),
            Self::TYPE_END => Ok(Some(Frame::End)),
            Self::TYPE_HELLO_ACK => Ok(Some(Frame::HelloAck)),
            Self::TYPE_HELLO => {
                let payload = Self::read_payload(reader, len)?;
                let text = String::from_utf8(payload)
                    .map_err(|_| PeerError::MalformedMessage("hello is not UTF-8".into()))?;
                let (username, password) = text.split_once(' ').ok_or_else(|| {
                    PeerError::MalformedMessage("hello must be '<username> <password>'".into())
                })?;
                Ok(Some(Frame::Hello {
                    username: username.to_string(),
                    password: password.to_string(),
                }))
            }
            other => Err(PeerError::MalformedMessage(format!(
                "unknown frame type {other:#04x}"
            ))),
        }
    }

    fn read_payload<R: Read>(reader: &mut R, len: usize) -> Result<Vec<u8>> {
        let mut payload = vec![0u8; len];
        reader.read_exact(&mut payload)?;
        Ok(payload)
    }
}

impl From<TransferMessage> for Frame {
    fn from(msg: TransferMessage) -> Self {
        match msg {
            TransferMessage::Chunk(data) => Frame::Chunk(data),
            TransferMessage::End => Frame::End,
        }
    }
}

impl TryFrom<Frame> for TransferMessage {
    type Error = PeerError;

    fn try_from(frame: Frame) -> Result<Self> {
        match frame {
            Frame::Chunk(data) => Ok(TransferMessage::Chunk(data)),
            Frame::End => Ok(TransferMessage::End),
            other => Err(PeerError::MalformedMessage(format!(
                "unexpected {other:?} on an open channel"
            ))),
        }
    }
}
