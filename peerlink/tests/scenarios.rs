//! End-to-end scenarios: negotiation followed by a chunked transfer.
//!
//! Covers:
//! - Both peers reaching `Connected` over in-process signaling
//! - A 40000-byte payload crossing the negotiated channel
//! - A channel closing in the middle of a transfer
//! - Closing a connected peer twice
//! - Persisting a received payload

use logging::Logger;
use peerlink::transport::MemoryChannel;
use peerlink::{
    ChunkedTransferSession, CompletedTransferSink, ConnectionState, DataChannel, DirectorySink,
    LoopbackNetwork, MemorySignalChannel, MemoryTransport, MessageChannel, NegotiationRole, Peer,
    PeerConfig, PeerError, RecvError, TransferEvent, TransferMessage, TransferState, TrySendError,
    Writable,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

fn memory_peers(
    config: &PeerConfig,
) -> (Peer<MemorySignalChannel>, Peer<MemorySignalChannel>) {
    let network = LoopbackNetwork::new();
    let (a_signal, b_signal) = MemorySignalChannel::pair();
    let initiator = Peer::new(
        NegotiationRole::Initiator,
        MemoryTransport::new(network.clone(), config, Logger::discard()),
        a_signal,
        config,
        Logger::discard(),
    );
    let responder = Peer::new(
        NegotiationRole::Responder,
        MemoryTransport::new(network, config, Logger::discard()),
        b_signal,
        config,
        Logger::discard(),
    );
    (initiator, responder)
}

/// Connects both peers on their own threads and hands them back.
fn connect_in_threads(
    config: &PeerConfig,
) -> (
    (Peer<MemorySignalChannel>, DataChannel),
    (Peer<MemorySignalChannel>, DataChannel),
) {
    let (mut initiator, mut responder) = memory_peers(config);

    let a = thread::spawn(move || {
        initiator.start().unwrap();
        let channel = initiator.run_until_connected(CONNECT_TIMEOUT).unwrap();
        (initiator, channel)
    });
    let b = thread::spawn(move || {
        responder.start().unwrap();
        let channel = responder.run_until_connected(CONNECT_TIMEOUT).unwrap();
        (responder, channel)
    });
    (a.join().unwrap(), b.join().unwrap())
}

#[test]
fn test_both_peers_connect() {
    let ((initiator, a_channel), (responder, b_channel)) =
        connect_in_threads(&PeerConfig::default());

    assert_eq!(initiator.state(), ConnectionState::Connected);
    assert_eq!(responder.state(), ConnectionState::Connected);
    assert_eq!(a_channel.label(), "fileTransfer");
    assert_eq!(b_channel.label(), "fileTransfer");
}

#[test]
fn test_forty_thousand_bytes_over_negotiated_channel() {
    let config = PeerConfig::default();
    let transfer = config.transfer();
    let ((_initiator, a_channel), (_responder, b_channel)) = connect_in_threads(&config);
    let payload: Vec<u8> = (0..40000u32).map(|i| (i % 253) as u8).collect();

    let (events_tx, events_rx) = mpsc::channel();
    let receiver = thread::spawn(move || {
        let mut session =
            ChunkedTransferSession::receiver(transfer, Logger::discard()).with_observer(events_tx);
        session.receive(b_channel.as_ref(), Duration::from_secs(5))
    });

    let mut sender = ChunkedTransferSession::sender(transfer, Logger::discard());
    let report = sender.send(&payload, a_channel.as_ref()).unwrap();
    assert_eq!(report.bytes_sent, 40000);
    assert_eq!(report.chunks_sent, 3);
    assert_eq!(sender.state(), TransferState::Completed);

    let received = receiver.join().unwrap().unwrap();
    assert_eq!(received, payload);
    let events: Vec<TransferEvent> = events_rx.try_iter().collect();
    assert_eq!(events, vec![TransferEvent::Completed(payload)]);
}

#[test]
fn test_chunk_boundaries_on_the_wire() {
    let config = PeerConfig::default();
    let (ours, theirs) = MemoryChannel::pair("fileTransfer", config.max_buffered_amount);

    let mut sender = ChunkedTransferSession::sender(config.transfer(), Logger::discard());
    sender.send(&vec![7u8; 40000], &ours).unwrap();

    let mut lengths = Vec::new();
    loop {
        match theirs.recv_timeout(Duration::from_secs(1)).unwrap() {
            TransferMessage::Chunk(data) => lengths.push(data.len()),
            TransferMessage::End => break,
        }
    }
    assert_eq!(lengths, vec![16384, 16384, 7232]);
}

/// Delivers a fixed number of chunks, then closes.
struct ClosingChannel {
    inner: MemoryChannel,
    remaining: AtomicUsize,
}

impl MessageChannel for ClosingChannel {
    fn label(&self) -> &str {
        self.inner.label()
    }

    fn try_send(&self, msg: TransferMessage) -> Result<(), TrySendError> {
        if !msg.is_end() {
            let left = self.remaining.load(Ordering::SeqCst);
            if left == 0 {
                self.inner.close();
                return Err(TrySendError::Closed(msg));
            }
            self.remaining.store(left - 1, Ordering::SeqCst);
        }
        self.inner.try_send(msg)
    }

    fn wait_writable(&self, len: usize, timeout: Duration) -> Writable {
        self.inner.wait_writable(len, timeout)
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<TransferMessage, RecvError> {
        self.inner.recv_timeout(timeout)
    }

    fn buffered_amount(&self) -> usize {
        self.inner.buffered_amount()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn close(&self) {
        self.inner.close()
    }
}

#[test]
fn test_channel_closed_mid_transfer() {
    let config = PeerConfig::default();
    let (ours, theirs) = MemoryChannel::pair("fileTransfer", config.max_buffered_amount);
    let closing = ClosingChannel {
        inner: ours,
        remaining: AtomicUsize::new(2),
    };

    let mut sender = ChunkedTransferSession::sender(config.transfer(), Logger::discard());
    let err = sender.send(&vec![1u8; 100_000], &closing).unwrap_err();
    assert!(matches!(err, PeerError::TransportClosed));
    assert_eq!(sender.state(), TransferState::Aborted);
    assert_eq!(sender.bytes_sent(), 2 * 16384);

    let (events_tx, events_rx) = mpsc::channel();
    let mut receiver = ChunkedTransferSession::receiver(config.transfer(), Logger::discard())
        .with_observer(events_tx);
    let err = receiver.receive(&theirs, Duration::from_secs(1)).unwrap_err();
    assert!(matches!(err, PeerError::TransportClosed));
    assert_eq!(receiver.state(), TransferState::Aborted);
    assert!(receiver.take_payload().is_none());

    let events: Vec<TransferEvent> = events_rx.try_iter().collect();
    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], TransferEvent::Aborted(_)));
}

#[test]
fn test_close_twice_after_connect() {
    let ((mut initiator, a_channel), (_responder, b_channel)) =
        connect_in_threads(&PeerConfig::default());

    initiator.close().unwrap();
    assert_eq!(initiator.state(), ConnectionState::Closed);
    assert!(a_channel.is_closed());
    assert!(b_channel.is_closed());

    initiator.close().unwrap();
    assert_eq!(initiator.state(), ConnectionState::Closed);
    assert!(initiator.channel().is_none());
}

#[test]
fn test_received_payload_is_persisted() {
    let config = PeerConfig::default();
    let ((_initiator, a_channel), (_responder, b_channel)) = connect_in_threads(&config);
    let payload = b"done".to_vec();

    let mut sender = ChunkedTransferSession::sender(config.transfer(), Logger::discard());
    sender.send(&payload, a_channel.as_ref()).unwrap();

    let mut receiver = ChunkedTransferSession::receiver(config.transfer(), Logger::discard());
    let received = receiver
        .receive(b_channel.as_ref(), Duration::from_secs(1))
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut sink = DirectorySink::new(dir.path());
    let path = sink.persist(&received, &config.received_file_name).unwrap();
    assert_eq!(path, dir.path().join("received-file.bin"));
    assert_eq!(std::fs::read(path).unwrap(), b"done");
}
