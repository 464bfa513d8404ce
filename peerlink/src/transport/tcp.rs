//! TCP transport.
//!
//! Each side listens on one TCP host candidate. The controlling side dials
//! the remote candidates and sends a `Hello` frame carrying the check
//! credentials; the controlled side answers a matching check with
//! `HelloAck`, after which the stream carries transfer frames. Both halves
//! of a check run on their own threads, so `poll_channel` never blocks.
//! Every open channel runs one writer thread (outbound queue to socket) and
//! one reader thread (socket to inbound queue).

use super::frame::Frame;
use super::queue::MessageQueue;
use super::{
    DataChannel, MessageChannel, PeerTransport, RecvError, TrySendError, Writable,
    check_credentials, check_matches,
};
use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::transfer::TransferMessage;
use ice::{Candidate, CandidatePair, IceCredentials, Transport};
use logging::Logger;
use std::io::{self, ErrorKind};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

/// How long an accepted connection may take to present its `Hello`.
const HELLO_READ_TIMEOUT: Duration = Duration::from_secs(2);
/// Granularity of the reader thread's back-pressure wait.
const READER_WAIT_SLICE: Duration = Duration::from_millis(100);

/// A [`MessageChannel`] over a connected TCP stream.
#[derive(Debug)]
pub struct TcpChannel {
    label: String,
    peer_address: SocketAddr,
    outbound: Arc<MessageQueue>,
    inbound: Arc<MessageQueue>,
}

impl TcpChannel {
    /// Takes over a stream whose connectivity check already succeeded and
    /// starts its reader and writer threads.
    pub fn spawn(
        stream: TcpStream,
        label: &str,
        max_buffered: usize,
        logger: Logger,
    ) -> io::Result<Self> {
        stream.set_nodelay(true)?;
        stream.set_read_timeout(None)?;
        let peer_address = stream.peer_addr()?;
        let outbound = Arc::new(MessageQueue::new(max_buffered));
        let inbound = Arc::new(MessageQueue::new(max_buffered));

        let writer_stream = stream.try_clone()?;
        let writer_queue = Arc::clone(&outbound);
        let writer_inbound = Arc::clone(&inbound);
        let writer_logger = logger.clone();
        thread::Builder::new()
            .name("tcp-writer".to_string())
            .spawn(move || run_writer(writer_stream, writer_queue, writer_inbound, writer_logger))?;

        let reader_queue = Arc::clone(&inbound);
        let reader_outbound = Arc::clone(&outbound);
        thread::Builder::new()
            .name("tcp-reader".to_string())
            .spawn(move || run_reader(stream, reader_queue, reader_outbound, logger))?;

        Ok(Self {
            label: label.to_string(),
            peer_address,
            outbound,
            inbound,
        })
    }

    pub fn peer_address(&self) -> SocketAddr {
        self.peer_address
    }
}

impl MessageChannel for TcpChannel {
    fn label(&self) -> &str {
        &self.label
    }

    fn try_send(&self, msg: TransferMessage) -> std::result::Result<(), TrySendError> {
        self.outbound.try_push(msg)
    }

    fn wait_writable(&self, len: usize, timeout: Duration) -> Writable {
        self.outbound.wait_writable(len, timeout)
    }

    fn recv_timeout(&self, timeout: Duration) -> std::result::Result<TransferMessage, RecvError> {
        self.inbound.pop(Some(timeout))
    }

    fn buffered_amount(&self) -> usize {
        self.outbound.buffered_amount()
    }

    fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// The writer thread flushes what is already queued, then shuts the socket down.
    fn close(&self) {
        self.outbound.close();
        self.inbound.close();
    }
}

fn run_writer(
    mut stream: TcpStream,
    outbound: Arc<MessageQueue>,
    inbound: Arc<MessageQueue>,
    logger: Logger,
) {
    loop {
        match outbound.pop(None) {
            Ok(msg) => {
                if let Err(e) = Frame::from(msg).write_to(&mut stream) {
                    logger.warn(&format!("Write failed: {}", e));
                    outbound.close();
                    inbound.close();
                    break;
                }
            }
            Err(_) => break,
        }
    }
    let _ = stream.shutdown(Shutdown::Both);
    logger.debug("Writer thread finished");
}

fn run_reader(
    mut stream: TcpStream,
    inbound: Arc<MessageQueue>,
    outbound: Arc<MessageQueue>,
    logger: Logger,
) {
    loop {
        let frame = match Frame::read_from(&mut stream) {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                logger.debug("Remote closed the stream");
                break;
            }
            Err(PeerError::MalformedMessage(reason)) => {
                logger.warn(&format!("Malformed frame: {}", reason));
                inbound.fail(reason);
                break;
            }
            Err(e) => {
                if !inbound.is_closed() {
                    logger.warn(&format!("Read failed: {}", e));
                }
                break;
            }
        };

        let msg = match TransferMessage::try_from(frame) {
            Ok(msg) => msg,
            Err(e) => {
                logger.warn(&e.to_string());
                inbound.fail(e.to_string());
                break;
            }
        };
        if !push_with_backpressure(&inbound, msg) {
            break;
        }
    }
    inbound.close();
    outbound.close();
}

/// Waits for room in the inbound queue; `false` once the queue is closed.
fn push_with_backpressure(inbound: &MessageQueue, mut msg: TransferMessage) -> bool {
    loop {
        match inbound.try_push(msg) {
            Ok(()) => return true,
            Err(TrySendError::Closed(_)) => return false,
            Err(TrySendError::Full(returned)) => {
                if inbound.wait_writable(returned.len(), READER_WAIT_SLICE) == Writable::Closed {
                    return false;
                }
                msg = returned;
            }
        }
    }
}

struct CheckOutcome {
    remote: SocketAddr,
    result: io::Result<TcpStream>,
}

/// [`PeerTransport`] using TCP host candidates.
pub struct TcpTransport {
    bind_address: IpAddr,
    label: String,
    max_buffered: usize,
    listener: Option<TcpListener>,
    outcomes_tx: Sender<CheckOutcome>,
    outcomes_rx: Receiver<CheckOutcome>,
    logger: Logger,
}

impl TcpTransport {
    pub fn new(config: &PeerConfig, logger: Logger) -> Result<Self> {
        let bind_address = config.bind_address.parse().map_err(|_| {
            PeerError::Config(format!("invalid bind_address {:?}", config.bind_address))
        })?;
        let (outcomes_tx, outcomes_rx) = mpsc::channel();
        Ok(Self {
            bind_address,
            label: config.data_channel_label.clone(),
            max_buffered: config.max_buffered_amount,
            listener: None,
            outcomes_tx,
            outcomes_rx,
            logger,
        })
    }

    pub fn local_address(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    fn open_channel(&self, stream: TcpStream) -> Result<DataChannel> {
        let channel = TcpChannel::spawn(stream, &self.label, self.max_buffered, self.logger.clone())?;
        self.logger.info(&format!(
            "Channel '{}' open with {}",
            self.label,
            channel.peer_address()
        ));
        Ok(Arc::new(channel))
    }
}

/// Controlled half of a check: read the `Hello` and ack it if the credentials match.
///
/// Runs on its own thread, so a connection that never speaks only costs that
/// thread `HELLO_READ_TIMEOUT`.
fn answer_check(
    mut stream: TcpStream,
    local: &IceCredentials,
    remote: &IceCredentials,
) -> io::Result<TcpStream> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(HELLO_READ_TIMEOUT))?;

    match Frame::read_from(&mut stream) {
        Ok(Some(Frame::Hello { username, password }))
            if check_matches(&username, &password, local, remote) =>
        {
            Frame::HelloAck.write_to(&mut stream)?;
            Ok(stream)
        }
        Ok(Some(Frame::Hello { username, .. })) => Err(io::Error::new(
            ErrorKind::PermissionDenied,
            format!("rejected check with username {username}"),
        )),
        Ok(other) => Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("expected a connectivity check, got {other:?}"),
        )),
        Err(e) => Err(io::Error::other(e.to_string())),
    }
}

/// Controlling half of a check: connect, present credentials, await the ack.
fn dial_check(
    remote: SocketAddr,
    username: String,
    password: String,
    timeout: Duration,
) -> io::Result<TcpStream> {
    let mut stream = TcpStream::connect_timeout(&remote, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    Frame::Hello { username, password }.write_to(&mut stream)?;

    match Frame::read_from(&mut stream) {
        Ok(Some(Frame::HelloAck)) => Ok(stream),
        Ok(Some(other)) => Err(io::Error::new(
            ErrorKind::InvalidData,
            format!("expected HelloAck, got {other:?}"),
        )),
        Ok(None) => Err(io::Error::new(
            ErrorKind::ConnectionRefused,
            "check rejected",
        )),
        Err(e) => Err(io::Error::other(e.to_string())),
    }
}

impl PeerTransport for TcpTransport {
    fn gather_candidates(
        &mut self,
        _credentials: &IceCredentials,
        _timeout: Duration,
    ) -> Result<Vec<Candidate>> {
        if self.listener.is_none() {
            let listener = TcpListener::bind((self.bind_address, 0))?;
            listener.set_nonblocking(true)?;
            self.listener = Some(listener);
        }
        let address = self
            .local_address()
            .ok_or_else(|| PeerError::Transport("listener has no local address".into()))?;
        self.logger.info(&format!("Listening on {}", address));
        Ok(vec![Candidate::host("1", Transport::Tcp, address)])
    }

    fn start_check(
        &mut self,
        pair: &CandidatePair,
        local: &IceCredentials,
        remote: &IceCredentials,
        timeout: Duration,
    ) -> Result<()> {
        let target = pair.remote.socket_addr();
        let (username, password) = check_credentials(local, remote);
        let outcomes = self.outcomes_tx.clone();

        self.logger.debug(&format!("Checking {}", target));
        thread::Builder::new()
            .name("tcp-check".to_string())
            .spawn(move || {
                let result = dial_check(target, username, password, timeout);
                let _ = outcomes.send(CheckOutcome {
                    remote: target,
                    result,
                });
            })?;
        Ok(())
    }

    fn poll_channel(
        &mut self,
        local: &IceCredentials,
        remote: &IceCredentials,
    ) -> Result<Option<DataChannel>> {
        while let Ok(outcome) = self.outcomes_rx.try_recv() {
            match outcome.result {
                Ok(stream) => return self.open_channel(stream).map(Some),
                Err(e) => self
                    .logger
                    .debug(&format!("Check with {} failed: {}", outcome.remote, e)),
            }
        }

        let Some(listener) = self.listener.as_ref() else {
            return Ok(None);
        };
        loop {
            match listener.accept() {
                Ok((stream, from)) => {
                    self.logger.debug(&format!("Inbound check from {}", from));
                    let (local, remote) = (local.clone(), remote.clone());
                    let outcomes = self.outcomes_tx.clone();
                    thread::Builder::new()
                        .name("tcp-answer".to_string())
                        .spawn(move || {
                            let result = answer_check(stream, &local, &remote);
                            let _ = outcomes.send(CheckOutcome { remote: from, result });
                        })?;
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return Ok(None),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn close(&mut self) {
        if self.listener.take().is_some() {
            self.logger.debug("Listener closed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn transport() -> TcpTransport {
        TcpTransport::new(&PeerConfig::default(), Logger::discard()).unwrap()
    }

    /// Polls both sides until each has a channel.
    fn establish(
        dialer_creds: &IceCredentials,
        acceptor_creds: &IceCredentials,
        presented: &IceCredentials,
    ) -> (Option<DataChannel>, Option<DataChannel>) {
        let (mut dialer, mut acceptor) = (transport(), transport());
        let local = dialer.gather_candidates(dialer_creds, Duration::from_secs(1)).unwrap();
        let remote = acceptor
            .gather_candidates(acceptor_creds, Duration::from_secs(1))
            .unwrap();
        let pair = CandidatePair::new(local[0].clone(), remote[0].clone(), true);
        dialer
            .start_check(&pair, presented, acceptor_creds, Duration::from_secs(2))
            .unwrap();

        let deadline = Instant::now() + Duration::from_secs(3);
        let (mut dialed, mut accepted) = (None, None);
        while Instant::now() < deadline && (dialed.is_none() || accepted.is_none()) {
            if accepted.is_none() {
                accepted = acceptor.poll_channel(acceptor_creds, dialer_creds).unwrap();
            }
            if dialed.is_none() {
                dialed = dialer.poll_channel(dialer_creds, acceptor_creds).unwrap();
            }
            thread::sleep(Duration::from_millis(5));
        }
        (dialed, accepted)
    }

    #[test]
    fn test_gather_binds_listener() {
        let mut t = transport();
        let candidates = t
            .gather_candidates(&IceCredentials::generate(), Duration::from_secs(1))
            .unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].transport, Transport::Tcp);
        assert_eq!(Some(candidates[0].socket_addr()), t.local_address());
        t.close();
        assert!(t.local_address().is_none());
    }

    #[test]
    fn test_check_and_transfer_frames() {
        let (dialer_creds, acceptor_creds) = (IceCredentials::generate(), IceCredentials::generate());
        let (dialed, accepted) = establish(&dialer_creds, &acceptor_creds, &dialer_creds);
        let (dialed, accepted) = (dialed.unwrap(), accepted.unwrap());

        dialed.try_send(TransferMessage::Chunk(b"done".to_vec())).unwrap();
        dialed.try_send(TransferMessage::End).unwrap();

        let timeout = Duration::from_secs(2);
        assert_eq!(
            accepted.recv_timeout(timeout),
            Ok(TransferMessage::Chunk(b"done".to_vec()))
        );
        assert_eq!(accepted.recv_timeout(timeout), Ok(TransferMessage::End));

        dialed.close();
        assert_eq!(accepted.recv_timeout(timeout), Err(RecvError::Closed));
        assert!(accepted.is_closed());
    }

    #[test]
    fn test_check_with_wrong_password_fails() {
        let (dialer_creds, acceptor_creds) = (IceCredentials::generate(), IceCredentials::generate());
        let impostor = IceCredentials::generate();
        let (dialed, accepted) = establish(&dialer_creds, &acceptor_creds, &impostor);
        assert!(dialed.is_none());
        assert!(accepted.is_none());
    }

    #[test]
    fn test_silent_inbound_connection_does_not_block_poll() {
        let (local, remote) = (IceCredentials::generate(), IceCredentials::generate());
        let mut acceptor = transport();
        let candidates = acceptor.gather_candidates(&local, Duration::from_secs(1)).unwrap();
        let _silent = TcpStream::connect(candidates[0].socket_addr()).unwrap();

        let started = Instant::now();
        while started.elapsed() < Duration::from_millis(200) {
            assert!(acceptor.poll_channel(&local, &remote).unwrap().is_none());
            thread::sleep(Duration::from_millis(5));
        }
        let elapsed = started.elapsed();
        assert!(elapsed < HELLO_READ_TIMEOUT, "poll blocked for {elapsed:?}");
    }

    #[test]
    fn test_garbage_frame_is_reported_as_malformed() {
        use std::io::Write;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut raw = TcpStream::connect(addr).unwrap();
        let (accepted, _) = listener.accept().unwrap();

        let channel = TcpChannel::spawn(accepted, "x", 1024, Logger::discard()).unwrap();
        raw.write_all(&[0x7f, 0, 0, 0, 0]).unwrap();

        assert!(matches!(
            channel.recv_timeout(Duration::from_secs(2)),
            Err(RecvError::Malformed(_))
        ));
    }
}
