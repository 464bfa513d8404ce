//! Chunked transfer session (one per payload, one role per session)

use super::chunker::{chunk_payload, reassemble};
use super::event::TransferObserver;
use super::message::TransferMessage;
use super::state::{TransferRole, TransferState};
use crate::config::TransferConfig;
use crate::error::{PeerError, Result};
use crate::source::FileByteSource;
use crate::transport::{MessageChannel, RecvError, TrySendError, Writable};
use logging::Logger;
use std::time::Duration;

/// Totals of a finished send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferReport {
    pub bytes_sent: u64,
    pub chunks_sent: usize,
}

/// Moves one payload across a [`MessageChannel`].
///
/// A sender's `send` returns once the end marker has been accepted by the
/// channel, which means "handed to the transport", not "received by the
/// peer". A receiver is fed either message by message through
/// [`on_message`](Self::on_message) or by [`receive`](Self::receive), which
/// pulls from the channel until the transfer completes or fails.
///
/// Sessions never touch the negotiator that produced their channel.
pub struct ChunkedTransferSession {
    role: TransferRole,
    state: TransferState,
    config: TransferConfig,
    observer: Box<dyn TransferObserver>,
    logger: Logger,
    chunks: Vec<Vec<u8>>,
    received_bytes: u64,
    bytes_sent: u64,
    chunks_sent: usize,
    completed: Option<Vec<u8>>,
}

impl ChunkedTransferSession {
    pub fn sender(config: TransferConfig, logger: Logger) -> Self {
        Self::new(TransferRole::Sender, config, logger)
    }

    pub fn receiver(config: TransferConfig, logger: Logger) -> Self {
        Self::new(TransferRole::Receiver, config, logger)
    }

    fn new(role: TransferRole, config: TransferConfig, logger: Logger) -> Self {
        Self {
            role,
            state: TransferState::Idle,
            config,
            observer: Box::new(()),
            logger,
            chunks: Vec::new(),
            received_bytes: 0,
            bytes_sent: 0,
            chunks_sent: 0,
            completed: None,
        }
    }

    pub fn with_observer(mut self, observer: impl TransferObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    pub fn role(&self) -> TransferRole {
        self.role
    }

    pub fn state(&self) -> TransferState {
        self.state
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes_sent
    }

    /// Bytes accumulated so far (zero again after an abort).
    pub fn received_bytes(&self) -> u64 {
        self.received_bytes
    }

    /// Sends an in-memory payload.
    ///
    /// # Errors
    ///
    /// * `InvalidState` - not a sender, or already used
    /// * `Config` - `max_chunk_size` is zero; nothing is sent
    /// * `TransportClosed` - the channel closed; no end marker was sent
    /// * `Timeout` - one back-pressure wait exceeded `send_timeout`
    pub fn send(&mut self, payload: &[u8], channel: &dyn MessageChannel) -> Result<TransferReport> {
        self.begin_send("send", payload.len() as u64)?;
        for chunk in chunk_payload(payload, self.config.max_chunk_size) {
            self.submit(channel, TransferMessage::Chunk(chunk.to_vec()))?;
        }
        self.finish_send(channel)
    }

    /// Sends from a random-access source, reading one chunk-sized range at a time.
    ///
    /// Fails like [`send`](Self::send), plus `Io` when the source cannot be read.
    pub fn send_source(
        &mut self,
        source: &dyn FileByteSource,
        channel: &dyn MessageChannel,
    ) -> Result<TransferReport> {
        let total = source.len();
        self.begin_send("send_source", total)?;

        let max = self.config.max_chunk_size as u64;
        let mut offset = 0u64;
        while offset < total {
            let len = max.min(total - offset) as usize;
            let data = source
                .read_range(offset, len)
                .map_err(|e| self.fail(PeerError::Io(e)))?;
            self.submit(channel, TransferMessage::Chunk(data))?;
            offset += len as u64;
        }
        self.finish_send(channel)
    }

    fn begin_send(&mut self, operation: &'static str, total: u64) -> Result<()> {
        if self.role != TransferRole::Sender || self.state != TransferState::Idle {
            return Err(PeerError::invalid_state(
                operation,
                format!("{} {}", self.role, self.state),
            ));
        }
        if self.config.max_chunk_size == 0 {
            return Err(PeerError::Config("max_chunk_size must be positive".into()));
        }
        self.state = TransferState::InProgress;
        self.logger.info(&format!(
            "Sending {} bytes in chunks of at most {}",
            total, self.config.max_chunk_size
        ));
        Ok(())
    }

    fn finish_send(&mut self, channel: &dyn MessageChannel) -> Result<TransferReport> {
        self.submit(channel, TransferMessage::End)?;
        self.state = TransferState::Completed;
        self.logger.info(&format!(
            "Handed {} bytes in {} chunks to '{}'",
            self.bytes_sent,
            self.chunks_sent,
            channel.label()
        ));
        Ok(TransferReport {
            bytes_sent: self.bytes_sent,
            chunks_sent: self.chunks_sent,
        })
    }

    /// Submits one message, suspending while the channel is full.
    fn submit(&mut self, channel: &dyn MessageChannel, msg: TransferMessage) -> Result<()> {
        let mut msg = msg;
        loop {
            let len = msg.len();
            match channel.try_send(msg) {
                Ok(()) => {
                    if len > 0 {
                        self.bytes_sent += len as u64;
                        self.chunks_sent += 1;
                    }
                    return Ok(());
                }
                Err(TrySendError::Closed(_)) => return Err(self.fail(PeerError::TransportClosed)),
                Err(TrySendError::Full(returned)) => {
                    self.logger.debug(&format!(
                        "Channel full ({} bytes buffered), waiting",
                        channel.buffered_amount()
                    ));
                    match channel.wait_writable(len, self.config.send_timeout) {
                        Writable::Ready => msg = returned,
                        Writable::TimedOut => {
                            return Err(self.fail(PeerError::Timeout(format!(
                                "channel '{}' stayed full for {:?}",
                                channel.label(),
                                self.config.send_timeout
                            ))));
                        }
                        Writable::Closed => return Err(self.fail(PeerError::TransportClosed)),
                    }
                }
            }
        }
    }

    /// Feeds one received message.
    ///
    /// After completion further messages are logged and ignored.
    ///
    /// # Errors
    ///
    /// * `InvalidState` - not a receiver, or already aborted
    /// * `MalformedMessage` - a chunk exceeds `max_chunk_size`; the session aborts
    pub fn on_message(&mut self, msg: TransferMessage) -> Result<()> {
        if self.role != TransferRole::Receiver {
            return Err(PeerError::invalid_state("on_message", self.role));
        }
        match self.state {
            TransferState::Completed => {
                self.logger.warn(&format!(
                    "Ignoring unexpected {} after completion",
                    describe(&msg)
                ));
                return Ok(());
            }
            TransferState::Aborted => {
                return Err(PeerError::invalid_state("on_message", self.state));
            }
            TransferState::Idle | TransferState::InProgress => {}
        }

        match msg {
            TransferMessage::Chunk(data) => {
                if data.len() > self.config.max_chunk_size {
                    return Err(self.fail(PeerError::MalformedMessage(format!(
                        "chunk of {} bytes exceeds {}",
                        data.len(),
                        self.config.max_chunk_size
                    ))));
                }
                self.state = TransferState::InProgress;
                self.received_bytes += data.len() as u64;
                self.chunks.push(data);
            }
            TransferMessage::End => {
                let payload = reassemble(&self.chunks);
                self.logger.info(&format!(
                    "Transfer complete: {} bytes in {} chunks",
                    payload.len(),
                    self.chunks.len()
                ));
                self.chunks.clear();
                self.state = TransferState::Completed;
                self.observer.on_transfer_complete(&payload);
                self.completed = Some(payload);
            }
        }
        Ok(())
    }

    /// Pulls messages from `channel` until the end marker arrives.
    ///
    /// # Errors
    ///
    /// The session aborts and discards partial data on:
    /// * `TransportClosed` - the channel closed before the end marker
    /// * `Timeout` - nothing arrived within `idle_timeout`
    /// * `MalformedMessage` - an undecodable frame or an oversized chunk
    pub fn receive(&mut self, channel: &dyn MessageChannel, idle_timeout: Duration) -> Result<Vec<u8>> {
        if self.role != TransferRole::Receiver || self.state.is_terminal() {
            return Err(PeerError::invalid_state(
                "receive",
                format!("{} {}", self.role, self.state),
            ));
        }

        loop {
            match channel.recv_timeout(idle_timeout) {
                Ok(msg) => {
                    self.on_message(msg)?;
                    if self.state == TransferState::Completed {
                        return Ok(self.completed.take().unwrap_or_default());
                    }
                }
                Err(RecvError::Closed) => return Err(self.fail(PeerError::TransportClosed)),
                Err(RecvError::Timeout) => {
                    return Err(self.fail(PeerError::Timeout(format!(
                        "no message on '{}' for {:?}",
                        channel.label(),
                        idle_timeout
                    ))));
                }
                Err(RecvError::Malformed(reason)) => {
                    return Err(self.fail(PeerError::MalformedMessage(reason)));
                }
            }
        }
    }

    /// Completed payload not yet handed out by [`receive`](Self::receive).
    pub fn take_payload(&mut self) -> Option<Vec<u8>> {
        self.completed.take()
    }

    /// Stops the transfer. No-op once completed or aborted.
    pub fn abort(&mut self, reason: &str) {
        if self.state.is_terminal() {
            self.logger
                .debug(&format!("Abort ({}) ignored in state {}", reason, self.state));
            return;
        }
        self.enter_aborted(reason);
    }

    fn fail(&mut self, error: PeerError) -> PeerError {
        if !self.state.is_terminal() {
            self.enter_aborted(&error.to_string());
        }
        error
    }

    fn enter_aborted(&mut self, reason: &str) {
        self.logger.warn(&format!("Transfer aborted: {}", reason));
        self.state = TransferState::Aborted;
        self.chunks.clear();
        self.received_bytes = 0;
        self.observer.on_transfer_aborted(reason);
    }
}

fn describe(msg: &TransferMessage) -> String {
    match msg {
        TransferMessage::Chunk(data) => format!("chunk of {} bytes", data.len()),
        TransferMessage::End => "end marker".to_string(),
    }
}
