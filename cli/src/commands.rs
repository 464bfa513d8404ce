//! Subcommand drivers.

use logging::Logger;
use peerlink::{
    ChunkedTransferSession, CompletedTransferSink, DataChannel, DirectorySink, FileSource,
    LoopbackNetwork, MemorySignalChannel, MemoryTransport, NegotiationRole, Peer, PeerConfig,
    PeerError, RecvError, Result, SignalChannel, TcpSignalChannel, TcpTransport,
};
use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

/// Sends `file` to an in-process receiver and stores the copy in `out_dir`.
pub fn run_loopback(config: &PeerConfig, logger: &Logger, file: &Path, out_dir: &Path) -> Result<()> {
    let network = LoopbackNetwork::new();
    let (sender_signal, receiver_signal) = MemorySignalChannel::pair();

    let receiver = {
        let config = config.clone();
        let logger = logger.for_component("Receiver");
        let transport = MemoryTransport::new(network.clone(), &config, logger.clone());
        let out_dir = out_dir.to_path_buf();
        thread::Builder::new()
            .name("loopback-receiver".into())
            .spawn(move || {
                let peer = Peer::new(
                    NegotiationRole::Responder,
                    transport,
                    receiver_signal,
                    &config,
                    logger.clone(),
                );
                receive_into(peer, &config, &logger, &out_dir)
            })?
    };

    let logger = logger.for_component("Sender");
    let transport = MemoryTransport::new(network, config, logger.clone());
    let peer = Peer::new(
        NegotiationRole::Initiator,
        transport,
        sender_signal,
        config,
        logger.clone(),
    );
    let sent = send_from(peer, config, &logger, file);

    let received = receiver
        .join()
        .map_err(|_| PeerError::Transport("receiver thread panicked".into()))?;
    sent?;
    let path = received?;
    println!("Received copy written to {}", path.display());
    Ok(())
}

/// Connects to a receiver listening on `address` and sends `file`.
pub fn run_send(config: &PeerConfig, logger: &Logger, address: &str, file: &Path) -> Result<()> {
    let logger = logger.for_component("Sender");
    logger.info(&format!("Connecting to {}", address));

    let signal = TcpSignalChannel::connect(address)?;
    let transport = TcpTransport::new(config, logger.clone())?;
    let peer = Peer::new(
        NegotiationRole::Initiator,
        transport,
        signal,
        config,
        logger.clone(),
    );
    send_from(peer, config, &logger, file)
}

/// Waits for one sender on `address` and stores what it sends in `out_dir`.
pub fn run_receive(config: &PeerConfig, logger: &Logger, address: &str, out_dir: &Path) -> Result<()> {
    let logger = logger.for_component("Receiver");
    let listener = TcpListener::bind(address)?;
    println!("Waiting for a sender on {}", listener.local_addr()?);
    logger.info(&format!("Listening for signaling on {}", address));

    let signal = TcpSignalChannel::accept(&listener)?;
    let transport = TcpTransport::new(config, logger.clone())?;
    let peer = Peer::new(
        NegotiationRole::Responder,
        transport,
        signal,
        config,
        logger.clone(),
    );
    let path = receive_into(peer, config, &logger, out_dir)?;
    println!("Received file written to {}", path.display());
    Ok(())
}

fn connect<S: SignalChannel>(peer: &mut Peer<S>, config: &PeerConfig) -> Result<DataChannel> {
    peer.start()?;
    peer.run_until_connected(config.negotiation().negotiation_timeout)
}

fn send_from<S: SignalChannel>(
    mut peer: Peer<S>,
    config: &PeerConfig,
    logger: &Logger,
    file: &Path,
) -> Result<()> {
    let source = FileSource::open(file)?;
    let channel = connect(&mut peer, config)?;

    let mut session = ChunkedTransferSession::sender(config.transfer(), logger.clone());
    let report = session.send_source(&source, channel.as_ref())?;
    println!(
        "Sent {} bytes in {} chunks",
        report.bytes_sent, report.chunks_sent
    );

    // The receiver closes the channel once the payload is stored.
    wait_for_remote_close(channel.as_ref(), config.receive_idle_timeout(), logger);
    peer.close()
}

fn receive_into<S: SignalChannel>(
    mut peer: Peer<S>,
    config: &PeerConfig,
    logger: &Logger,
    out_dir: &Path,
) -> Result<PathBuf> {
    let channel = connect(&mut peer, config)?;

    let mut session = ChunkedTransferSession::receiver(config.transfer(), logger.clone());
    let received = session.receive(channel.as_ref(), config.receive_idle_timeout());
    let stored = received.and_then(|bytes| {
        let mut sink = DirectorySink::new(out_dir);
        let path = sink.persist(&bytes, &config.received_file_name)?;
        logger.info(&format!("Stored {} bytes at {}", bytes.len(), path.display()));
        Ok(path)
    });
    peer.close()?;
    stored
}

fn wait_for_remote_close(channel: &dyn peerlink::MessageChannel, timeout: Duration, logger: &Logger) {
    loop {
        match channel.recv_timeout(timeout) {
            Ok(msg) => logger.warn(&format!("Unexpected {} byte message from receiver", msg.len())),
            Err(RecvError::Closed) => {
                logger.info("Receiver closed the channel");
                return;
            }
            Err(e) => {
                logger.warn(&format!("Stopped waiting for the receiver: {}", e));
                return;
            }
        }
    }
}
