//! One side of a connection: a negotiator wired to a signal channel.

use crate::config::PeerConfig;
use crate::error::{PeerError, Result};
use crate::media::{MediaSink, MediaSource};
use crate::negotiation::{
    ConnectionNegotiator, ConnectionState, NegotiationRole, NegotiatorEvent,
};
use crate::signaling::{DecodeError, SignalChannel, SignalMessage};
use crate::transport::{DataChannel, PeerTransport};
use logging::Logger;
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Relays a [`ConnectionNegotiator`]'s descriptions and candidates over a
/// [`SignalChannel`] and applies what the remote side sends back.
///
/// Descriptions always go out before the local candidates that follow them.
pub struct Peer<S: SignalChannel> {
    negotiator: ConnectionNegotiator,
    signal: S,
    events: Receiver<NegotiatorEvent>,
    media_sink: Option<Box<dyn MediaSink>>,
    channel: Option<DataChannel>,
    logger: Logger,
}

impl<S: SignalChannel> Peer<S> {
    pub fn new(
        role: NegotiationRole,
        transport: impl PeerTransport + 'static,
        signal: S,
        config: &PeerConfig,
        logger: Logger,
    ) -> Self {
        let (tx, events) = mpsc::channel();
        let negotiator = ConnectionNegotiator::new(
            role,
            transport,
            tx,
            config.negotiation(),
            logger.for_component(&format!("negotiator-{}", role)),
        );
        Self {
            negotiator,
            signal,
            events,
            media_sink: None,
            channel: None,
            logger,
        }
    }

    /// Announces every track of `source`. Only allowed before the first description.
    pub fn add_media_source(&mut self, source: &dyn MediaSource) -> Result<()> {
        for track in source.tracks() {
            self.negotiator.add_track(track)?;
        }
        Ok(())
    }

    /// Where the remote stream goes once connected.
    pub fn set_media_sink(&mut self, sink: impl MediaSink + 'static) {
        self.media_sink = Some(Box::new(sink));
    }

    pub fn negotiator(&self) -> &ConnectionNegotiator {
        &self.negotiator
    }

    pub fn negotiator_mut(&mut self) -> &mut ConnectionNegotiator {
        &mut self.negotiator
    }

    pub fn state(&self) -> ConnectionState {
        self.negotiator.state()
    }

    /// The data channel, once connected.
    pub fn channel(&self) -> Option<DataChannel> {
        self.channel.clone()
    }

    /// Sends the offer (initiator). The responder waits for one instead.
    pub fn start(&mut self) -> Result<()> {
        if self.negotiator.role() != NegotiationRole::Initiator {
            return Ok(());
        }
        let offer = self.negotiator.create_offer()?;
        self.signal.send(&SignalMessage::Offer(offer))?;
        self.forward_events()
    }

    /// Handles at most one signal message (waiting up to `timeout` for it),
    /// then polls the negotiator.
    ///
    /// Fails when a local candidate could not be signaled.
    pub fn step(&mut self, timeout: Duration) -> Result<ConnectionState> {
        if self.signal.is_closed() {
            thread::sleep(timeout);
        } else if let Some(received) = self.signal.recv_timeout(timeout) {
            let dispatched = self.dispatch(received);
            let forwarded = self.forward_events();
            dispatched?;
            forwarded?;
        }

        let polled = self.negotiator.poll(Instant::now());
        let forwarded = self.forward_events();
        let state = polled?;
        forwarded?;
        Ok(state)
    }

    /// Steps until the data channel is open.
    ///
    /// Bounded by `timeout` and by the negotiator's own deadlines.
    pub fn run_until_connected(&mut self, timeout: Duration) -> Result<DataChannel> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(channel) = &self.channel {
                return Ok(channel.clone());
            }
            match self.step(POLL_INTERVAL)? {
                ConnectionState::Failed => {
                    return Err(PeerError::Transport("negotiation failed".to_string()));
                }
                ConnectionState::Closed => return Err(PeerError::Closed),
                _ => {}
            }
            if self.channel.is_none() && Instant::now() >= deadline {
                return Err(PeerError::Timeout(format!(
                    "not connected within {:?}",
                    timeout
                )));
            }
        }
    }

    pub fn close(&mut self) -> Result<()> {
        self.channel = None;
        self.negotiator.close()
    }

    fn dispatch(&mut self, received: std::result::Result<SignalMessage, DecodeError>) -> Result<()> {
        match received {
            Ok(SignalMessage::Offer(offer)) => {
                let answer = self.negotiator.apply_remote_offer(offer)?;
                self.signal.send(&SignalMessage::Answer(answer))
            }
            Ok(SignalMessage::Answer(answer)) => self.negotiator.apply_remote_answer(answer),
            Ok(SignalMessage::Candidate(candidate)) => {
                self.negotiator.add_remote_candidate(candidate)
            }
            Err(e) if e.is_fatal() => Err(self.negotiator.abort(e.into())),
            Err(e) => {
                self.logger
                    .warn(&format!("Skipping signal message: {}", e));
                Ok(())
            }
        }
    }

    /// Drains every pending event; returns the first signaling failure.
    fn forward_events(&mut self) -> Result<()> {
        let mut first_error = None;
        while let Ok(event) = self.events.try_recv() {
            match event {
                NegotiatorEvent::LocalCandidate(candidate) => {
                    if let Err(e) = self.signal.send(&SignalMessage::Candidate(candidate)) {
                        self.logger
                            .error(&format!("Could not signal local candidate: {}", e));
                        first_error.get_or_insert(e);
                    }
                }
                NegotiatorEvent::StateChanged(state) => {
                    self.logger
                        .debug(&format!("Connection state is now {}", state));
                    if state.is_terminal() {
                        self.channel = None;
                    }
                }
                NegotiatorEvent::DataChannelReady(channel) => self.channel = Some(channel),
                NegotiatorEvent::RemoteMedia(stream) => match self.media_sink.as_mut() {
                    Some(sink) => sink.attach(stream),
                    None => self.logger.info(&format!(
                        "No media sink; ignoring remote stream {}",
                        stream.stream_id
                    )),
                },
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{RemoteStream, Track};
    use crate::signaling::MemorySignalChannel;
    use crate::transport::{LoopbackNetwork, MemoryTransport};

    fn peers(
        config: &PeerConfig,
    ) -> (Peer<MemorySignalChannel>, Peer<MemorySignalChannel>) {
        let network = LoopbackNetwork::new();
        let (a_signal, b_signal) = MemorySignalChannel::pair();
        let a = Peer::new(
            NegotiationRole::Initiator,
            MemoryTransport::new(network.clone(), config, Logger::discard()),
            a_signal,
            config,
            Logger::discard(),
        );
        let b = Peer::new(
            NegotiationRole::Responder,
            MemoryTransport::new(network, config, Logger::discard()),
            b_signal,
            config,
            Logger::discard(),
        );
        (a, b)
    }

    fn connect(a: &mut Peer<MemorySignalChannel>, b: &mut Peer<MemorySignalChannel>) {
        a.start().unwrap();
        b.start().unwrap();
        for _ in 0..200 {
            a.step(Duration::from_millis(1)).unwrap();
            b.step(Duration::from_millis(1)).unwrap();
            if a.channel().is_some() && b.channel().is_some() {
                return;
            }
        }
        panic!("peers did not connect");
    }

    #[test]
    fn test_alternating_steps_connect() {
        let config = PeerConfig::default();
        let (mut a, mut b) = peers(&config);
        connect(&mut a, &mut b);

        assert_eq!(a.state(), ConnectionState::Connected);
        assert_eq!(b.state(), ConnectionState::Connected);
    }

    #[test]
    fn test_remote_media_reaches_sink() {
        let config = PeerConfig::default();
        let (mut a, mut b) = peers(&config);
        a.add_media_source(&vec![Track::video("cam")]).unwrap();
        let (tx, rx) = mpsc::channel::<RemoteStream>();
        b.set_media_sink(tx);

        connect(&mut a, &mut b);

        let stream = rx.try_recv().unwrap();
        assert_eq!(stream.tracks, vec![Track::video("cam")]);
    }

    #[test]
    fn test_undecodable_offer_fails_responder() {
        let config = PeerConfig::default();
        let network = LoopbackNetwork::new();
        let (mut remote, b_signal) = MemorySignalChannel::pair();
        let mut b = Peer::new(
            NegotiationRole::Responder,
            MemoryTransport::new(network, &config, Logger::discard()),
            b_signal,
            &config,
            Logger::discard(),
        );

        remote.send_raw(r#"{"type":"offer"}"#).unwrap();
        let err = b.step(Duration::from_millis(100)).unwrap_err();
        assert!(matches!(err, PeerError::MalformedMessage(_)));
        assert_eq!(b.state(), ConnectionState::Failed);
    }

    /// Delivers descriptions but loses every candidate.
    struct LosesCandidates(MemorySignalChannel);

    impl SignalChannel for LosesCandidates {
        fn send(&mut self, message: &SignalMessage) -> Result<()> {
            match message {
                SignalMessage::Candidate(_) => Err(PeerError::Transport("signaling link lost".into())),
                other => self.0.send(other),
            }
        }

        fn recv_timeout(
            &mut self,
            timeout: Duration,
        ) -> Option<std::result::Result<SignalMessage, DecodeError>> {
            self.0.recv_timeout(timeout)
        }

        fn is_closed(&self) -> bool {
            self.0.is_closed()
        }
    }

    #[test]
    fn test_unsent_local_candidate_is_an_error() {
        let config = PeerConfig::default();
        let (a_signal, mut remote) = MemorySignalChannel::pair();
        let mut a = Peer::new(
            NegotiationRole::Initiator,
            MemoryTransport::new(LoopbackNetwork::new(), &config, Logger::discard()),
            LosesCandidates(a_signal),
            &config,
            Logger::discard(),
        );

        let err = a.start().unwrap_err();
        assert!(matches!(err, PeerError::Transport(_)));
        assert!(matches!(
            remote.recv_timeout(Duration::from_millis(100)),
            Some(Ok(SignalMessage::Offer(_)))
        ));
    }

    #[test]
    fn test_undecodable_candidate_is_skipped() {
        let config = PeerConfig::default();
        let (mut a, mut b) = peers(&config);
        a.start().unwrap();

        b.signal.send_raw(r#"{"type":"candidate","candidate":42}"#).unwrap();
        assert_eq!(a.step(Duration::from_millis(100)).unwrap(), ConnectionState::Negotiating);
    }
}
