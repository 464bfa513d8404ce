//! Signal channel implementations

use super::message::{DecodeError, SignalMessage};
use crate::error::{PeerError, Result};
use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// An already-connected, bidirectional, message-oriented signaling link.
pub trait SignalChannel: Send {
    fn send(&mut self, message: &SignalMessage) -> Result<()>;

    /// Waits up to `timeout` for the next message. `None` on timeout or
    /// once the link is gone; `Some(Err(_))` for an undecodable message.
    fn recv_timeout(&mut self, timeout: Duration) -> Option<std::result::Result<SignalMessage, DecodeError>>;

    /// Whether the remote end has gone away.
    fn is_closed(&self) -> bool;
}

/// In-process signaling; messages still travel as JSON text.
pub struct MemorySignalChannel {
    tx: Sender<String>,
    rx: Receiver<String>,
    closed: bool,
}

impl MemorySignalChannel {
    /// Creates both ends of a link.
    pub fn pair() -> (Self, Self) {
        let (a_tx, b_rx) = mpsc::channel();
        let (b_tx, a_rx) = mpsc::channel();
        (
            Self {
                tx: a_tx,
                rx: a_rx,
                closed: false,
            },
            Self {
                tx: b_tx,
                rx: b_rx,
                closed: false,
            },
        )
    }

    /// Sends raw text as one message, bypassing encoding.
    pub fn send_raw(&mut self, text: &str) -> Result<()> {
        self.tx
            .send(text.to_string())
            .map_err(|_| PeerError::TransportClosed)
    }
}

impl SignalChannel for MemorySignalChannel {
    fn send(&mut self, message: &SignalMessage) -> Result<()> {
        let text = message.to_json()?;
        self.send_raw(&text)
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<std::result::Result<SignalMessage, DecodeError>> {
        match self.rx.recv_timeout(timeout) {
            Ok(text) => Some(SignalMessage::from_json(&text)),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Newline-delimited JSON over a TCP stream.
pub struct TcpSignalChannel {
    reader: BufReader<TcpStream>,
    writer: TcpStream,
    /// Bytes of a line whose newline has not arrived yet.
    pending: Vec<u8>,
    closed: bool,
}

impl TcpSignalChannel {
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        Self::from_stream(TcpStream::connect(addr)?)
    }

    /// Waits for one inbound connection on `listener`.
    pub fn accept(listener: &TcpListener) -> Result<Self> {
        let (stream, _) = listener.accept()?;
        Self::from_stream(stream)
    }

    pub fn from_stream(stream: TcpStream) -> Result<Self> {
        stream.set_nodelay(true)?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
            pending: Vec::new(),
            closed: false,
        })
    }

    fn take_line(&mut self) -> std::result::Result<SignalMessage, DecodeError> {
        let line = std::mem::take(&mut self.pending);
        let text = String::from_utf8_lossy(&line);
        SignalMessage::from_json(text.trim_end())
    }
}

impl SignalChannel for TcpSignalChannel {
    fn send(&mut self, message: &SignalMessage) -> Result<()> {
        let mut line = message.to_json()?;
        line.push('\n');
        self.writer.write_all(line.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }

    fn recv_timeout(&mut self, timeout: Duration) -> Option<std::result::Result<SignalMessage, DecodeError>> {
        if self.closed {
            return None;
        }
        // A zero read timeout is rejected by the socket API.
        let timeout = timeout.max(Duration::from_millis(1));
        if self.reader.get_ref().set_read_timeout(Some(timeout)).is_err() {
            self.closed = true;
            return None;
        }

        match self.reader.read_until(b'\n', &mut self.pending) {
            Ok(0) => {
                self.closed = true;
                None
            }
            Ok(_) if self.pending.ends_with(b"\n") => Some(self.take_line()),
            // EOF in the middle of a line.
            Ok(_) => {
                self.closed = true;
                None
            }
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => None,
            Err(e) if e.kind() == ErrorKind::Interrupted => None,
            Err(_) => {
                self.closed = true;
                None
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}
