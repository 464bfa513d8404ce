//! Offer/answer/candidate state machine for one side of a connection.

use super::description::{Candidate, SdpKind, SessionDescription};
use super::events::{CloseHandle, NegotiationObserver};
use super::role::NegotiationRole;
use super::state::ConnectionState;
use crate::config::NegotiationConfig;
use crate::error::{PeerError, Result};
use crate::media::{RemoteStream, Track, TrackKind};
use crate::transport::{DataChannel, PeerTransport};
use ice::{CandidatePair, IceCredentials};
use logging::Logger;
use sdp::{Direction, MediaDescription, MediaKind, Origin, SdpType};
use std::sync::Arc;
use std::time::Instant;

/// Drives one side of a negotiation from `New` to `Connected`.
///
/// The negotiator never blocks on the network except while gathering local
/// candidates. The application moves it forward by applying the remote
/// side's description and candidates as they arrive and by calling
/// [`poll`](Self::poll) periodically.
///
/// # Example
///
/// ```no_run
/// use peerlink::{ConnectionNegotiator, LoopbackNetwork, MemoryTransport, NegotiationRole, PeerConfig};
/// use logging::Logger;
///
/// let config = PeerConfig::default();
/// let transport = MemoryTransport::new(LoopbackNetwork::new(), &config, Logger::discard());
/// let mut negotiator = ConnectionNegotiator::new(
///     NegotiationRole::Initiator,
///     transport,
///     (),
///     config.negotiation(),
///     Logger::discard(),
/// );
/// let offer = negotiator.create_offer()?;
/// # Ok::<(), peerlink::PeerError>(())
/// ```
pub struct ConnectionNegotiator {
    role: NegotiationRole,
    state: ConnectionState,
    config: NegotiationConfig,
    transport: Box<dyn PeerTransport>,
    observer: Box<dyn NegotiationObserver>,
    logger: Logger,

    local_credentials: IceCredentials,
    remote_credentials: Option<IceCredentials>,
    local_candidates: Vec<ice::Candidate>,
    remote_candidates: Vec<ice::Candidate>,
    /// Remote candidates received before a local description existed
    buffered_candidates: Vec<Candidate>,

    local_tracks: Vec<Track>,
    local_description: Option<SessionDescription>,
    remote_description: Option<sdp::SessionDescription>,

    /// Set by the first description produced or applied
    negotiation_started: Option<Instant>,
    /// Set once both descriptions are known
    descriptions_complete: Option<Instant>,

    channel: Option<DataChannel>,
    close_handle: CloseHandle,
    transport_released: bool,
}

impl ConnectionNegotiator {
    pub fn new(
        role: NegotiationRole,
        transport: impl PeerTransport + 'static,
        observer: impl NegotiationObserver + 'static,
        config: NegotiationConfig,
        logger: Logger,
    ) -> Self {
        Self::with_boxed(role, Box::new(transport), Box::new(observer), config, logger)
    }

    pub fn with_boxed(
        role: NegotiationRole,
        transport: Box<dyn PeerTransport>,
        observer: Box<dyn NegotiationObserver>,
        config: NegotiationConfig,
        logger: Logger,
    ) -> Self {
        Self {
            role,
            state: ConnectionState::New,
            config,
            transport,
            observer,
            logger,
            local_credentials: IceCredentials::generate(),
            remote_credentials: None,
            local_candidates: Vec::new(),
            remote_candidates: Vec::new(),
            buffered_candidates: Vec::new(),
            local_tracks: Vec::new(),
            local_description: None,
            remote_description: None,
            negotiation_started: None,
            descriptions_complete: None,
            channel: None,
            close_handle: CloseHandle::default(),
            transport_released: false,
        }
    }

    pub fn role(&self) -> NegotiationRole {
        self.role
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn local_credentials(&self) -> &IceCredentials {
        &self.local_credentials
    }

    pub fn local_description(&self) -> Option<&SessionDescription> {
        self.local_description.as_ref()
    }

    /// The parsed remote description, once applied.
    pub fn remote_description(&self) -> Option<&sdp::SessionDescription> {
        self.remote_description.as_ref()
    }

    /// Remote candidates applied so far (buffered ones excluded).
    pub fn remote_candidates(&self) -> &[ice::Candidate] {
        &self.remote_candidates
    }

    /// The open data channel, while `Connected`.
    pub fn channel(&self) -> Option<DataChannel> {
        self.channel.clone()
    }

    pub fn close_handle(&self) -> CloseHandle {
        self.close_handle.clone()
    }

    /// Adds a local media track to announce. Only allowed before the first description.
    pub fn add_track(&mut self, track: Track) -> Result<()> {
        self.ensure_open()?;
        if self.state != ConnectionState::New || self.local_description.is_some() {
            return Err(PeerError::invalid_state("add_track", self.state));
        }
        self.logger
            .debug(&format!("Adding local {} track {}", track.kind, track.id));
        self.local_tracks.push(track);
        Ok(())
    }

    /// Produces the offer (initiator, `New` only) and moves to `Negotiating`.
    ///
    /// Local candidates are gathered first; each is reported through
    /// `on_local_candidate` after the offer exists.
    pub fn create_offer(&mut self) -> Result<SessionDescription> {
        self.ensure_open()?;
        if self.role != NegotiationRole::Initiator || self.state != ConnectionState::New {
            return Err(PeerError::invalid_state("create_offer", self.describe_state()));
        }

        self.negotiation_started = Some(Instant::now());
        self.gather()?;

        let offer = match self.build_offer() {
            Ok(sdp) => SessionDescription::offer(sdp.to_string()),
            Err(e) => return Err(self.fail(e.into())),
        };
        self.logger.info(&format!(
            "Created offer with {} media sections",
            self.local_tracks.len() + 1
        ));

        self.local_description = Some(offer.clone());
        self.transition(ConnectionState::Negotiating);
        self.emit_local_candidates();
        self.flush_buffered_candidates();
        Ok(offer)
    }

    /// Applies the initiator's offer (responder, `New` only) and returns the answer.
    ///
    /// Offered audio/video sections are answered `sendrecv` when a local track
    /// of the same kind is available and `recvonly` otherwise.
    pub fn apply_remote_offer(&mut self, desc: SessionDescription) -> Result<SessionDescription> {
        self.ensure_open()?;
        if self.role != NegotiationRole::Responder || self.state != ConnectionState::New {
            return Err(PeerError::invalid_state(
                "apply_remote_offer",
                self.describe_state(),
            ));
        }
        if desc.kind != SdpKind::Offer {
            return Err(PeerError::invalid_state(
                "apply_remote_offer",
                format!("{} (received an {})", self.state, desc.kind),
            ));
        }

        self.negotiation_started = Some(Instant::now());
        let remote = self.accept_remote_description(&desc)?;
        self.gather()?;

        let answer = match self.build_answer(&remote) {
            Ok(sdp) => SessionDescription::answer(sdp.to_string()),
            Err(e) => return Err(self.fail(e.into())),
        };
        self.logger.info(&format!(
            "Applied remote offer with {} media sections",
            remote.media.len()
        ));

        self.remote_description = Some(remote);
        self.local_description = Some(answer.clone());
        self.descriptions_complete = Some(Instant::now());
        self.transition(ConnectionState::Negotiating);
        self.emit_local_candidates();
        self.flush_buffered_candidates();
        Ok(answer)
    }

    /// Applies the responder's answer (initiator, `Negotiating`, once) and
    /// starts connectivity checks.
    pub fn apply_remote_answer(&mut self, desc: SessionDescription) -> Result<()> {
        self.ensure_open()?;
        if self.role != NegotiationRole::Initiator
            || self.state != ConnectionState::Negotiating
            || self.remote_description.is_some()
        {
            return Err(PeerError::invalid_state(
                "apply_remote_answer",
                self.describe_state(),
            ));
        }
        if desc.kind != SdpKind::Answer {
            return Err(PeerError::invalid_state(
                "apply_remote_answer",
                format!("{} (received an {})", self.state, desc.kind),
            ));
        }

        let remote = self.accept_remote_description(&desc)?;
        self.logger.info(&format!(
            "Applied remote answer with {} media sections",
            remote.media.len()
        ));
        self.remote_description = Some(remote);
        self.descriptions_complete = Some(Instant::now());

        // Candidates applied before the answer were never checked; buffered
        // ones are checked as they are applied.
        let known = self.remote_candidates.clone();
        self.start_checks(&known);
        self.flush_buffered_candidates();
        Ok(())
    }

    /// Applies a trickled remote candidate.
    ///
    /// Candidates arriving before a local description exists are buffered.
    /// Undecodable candidates and candidates arriving after `Closed`/`Failed`
    /// are logged and dropped; neither is an error.
    pub fn add_remote_candidate(&mut self, candidate: Candidate) -> Result<()> {
        self.sync_close_request();
        match self.state {
            ConnectionState::New => {
                self.logger.debug(&format!(
                    "Buffering remote candidate until a local description exists: {}",
                    candidate.candidate
                ));
                self.buffered_candidates.push(candidate);
            }
            ConnectionState::Negotiating | ConnectionState::Connected => {
                self.apply_candidate(candidate)
            }
            ConnectionState::Closed | ConnectionState::Failed => {
                self.logger.warn(&format!(
                    "Ignoring remote candidate in state {}: {}",
                    self.state, candidate.candidate
                ));
            }
        }
        Ok(())
    }

    /// Advances connectivity and enforces the negotiation deadlines.
    ///
    /// Once `Connected`, a data channel closed by the remote side moves the
    /// negotiator to `Closed`. Returns the current state, `Err(Closed)` once
    /// closed, or the `Timeout` that moved the negotiator to `Failed`.
    pub fn poll(&mut self, now: Instant) -> Result<ConnectionState> {
        self.ensure_open()?;
        if self.state == ConnectionState::Connected {
            self.check_channel();
            return Ok(self.state);
        }
        if self.state != ConnectionState::Negotiating {
            return Ok(self.state);
        }

        if self.descriptions_complete.is_some()
            && let Some(remote) = self.remote_credentials.clone()
        {
            match self.transport.poll_channel(&self.local_credentials, &remote) {
                Ok(Some(channel)) => {
                    self.on_connected(channel);
                    return Ok(self.state);
                }
                Ok(None) => {}
                Err(e) => return Err(self.fail(e)),
            }
        }

        if let Some(started) = self.negotiation_started
            && now.saturating_duration_since(started) >= self.config.negotiation_timeout
        {
            return Err(self.fail(PeerError::Timeout(format!(
                "not connected within {:?}",
                self.config.negotiation_timeout
            ))));
        }
        if let Some(complete) = self.descriptions_complete
            && now.saturating_duration_since(complete) >= self.config.candidate_discovery_timeout
        {
            return Err(self.fail(PeerError::Timeout(format!(
                "no working candidate pair within {:?}",
                self.config.candidate_discovery_timeout
            ))));
        }
        Ok(self.state)
    }

    /// Closes the data channel and releases the transport.
    ///
    /// Idempotent. A `Failed` negotiator only releases its resources and stays `Failed`.
    pub fn close(&mut self) -> Result<()> {
        self.close_handle.close();
        match self.state {
            ConnectionState::Closed => {
                self.logger.debug("Close requested on a closed connection");
            }
            ConnectionState::Failed => self.release(),
            _ => {
                self.logger.info("Closing connection");
                self.release();
                self.transition(ConnectionState::Closed);
            }
        }
        Ok(())
    }

    /// Moves a non-terminal negotiation to `Failed`, e.g. when signaling
    /// delivered a description that could not be decoded. Returns `error`.
    pub fn abort(&mut self, error: PeerError) -> PeerError {
        self.fail(error)
    }

    fn check_channel(&mut self) {
        let remote_closed = self.channel.as_ref().is_some_and(|c| c.is_closed());
        if remote_closed {
            self.logger.info("Remote side closed the data channel");
            self.release();
            self.transition(ConnectionState::Closed);
        }
    }

    fn describe_state(&self) -> String {
        format!("{} ({})", self.state, self.role)
    }

    fn ensure_open(&mut self) -> Result<()> {
        self.sync_close_request();
        if self.state == ConnectionState::Closed {
            return Err(PeerError::Closed);
        }
        Ok(())
    }

    fn sync_close_request(&mut self) {
        if self.close_handle.is_requested() && !self.state.is_terminal() {
            self.logger.info("Connection closed through its close handle");
            self.release();
            self.transition(ConnectionState::Closed);
        }
    }

    fn transition(&mut self, next: ConnectionState) {
        if !self.state.can_transition_to(next) {
            self.logger.error(&format!(
                "Refusing state change {} -> {}",
                self.state, next
            ));
            return;
        }
        self.logger
            .info(&format!("State {} -> {}", self.state, next));
        self.state = next;
        self.observer.on_state_change(next);
    }

    fn fail(&mut self, error: PeerError) -> PeerError {
        if !self.state.is_terminal() {
            self.logger
                .error(&format!("Negotiation failed: {}", error));
            self.release();
            self.transition(ConnectionState::Failed);
        }
        error
    }

    fn release(&mut self) {
        if let Some(channel) = self.channel.take() {
            channel.close();
        }
        if !self.transport_released {
            self.transport.close();
            self.transport_released = true;
        }
    }

    fn gather(&mut self) -> Result<()> {
        let started = Instant::now();
        let timeout = self.config.candidate_discovery_timeout;
        let candidates = match self.transport.gather_candidates(&self.local_credentials, timeout) {
            Ok(candidates) => candidates,
            Err(e) => return Err(self.fail(e)),
        };
        if started.elapsed() > timeout {
            return Err(self.fail(PeerError::Timeout(format!(
                "candidate gathering exceeded {:?}",
                timeout
            ))));
        }
        if candidates.is_empty() {
            return Err(self.fail(PeerError::Transport(
                "no local candidates gathered".to_string(),
            )));
        }

        self.logger
            .info(&format!("Gathered {} local candidates", candidates.len()));
        self.local_candidates = candidates;
        Ok(())
    }

    fn stream_id(&self) -> String {
        format!("peerlink-{}", self.local_credentials.ufrag)
    }

    fn build_offer(&self) -> std::result::Result<sdp::SessionDescription, sdp::SdpError> {
        let stream_id = self.stream_id();
        let mut builder = sdp::SessionDescription::builder(SdpType::Offer)
            .origin(Origin::generate())
            .ice_credentials(&self.local_credentials.ufrag, &self.local_credentials.pwd)
            .add_media(MediaDescription::data_channel("0"));

        for (index, track) in self.local_tracks.iter().enumerate() {
            builder = builder.add_media(MediaDescription::track(
                track.kind.media_kind(),
                &(index + 1).to_string(),
                Direction::SendRecv,
                Some((stream_id.as_str(), track.id.as_str())),
            ));
        }
        builder.build()
    }

    fn build_answer(
        &self,
        offer: &sdp::SessionDescription,
    ) -> std::result::Result<sdp::SessionDescription, sdp::SdpError> {
        let stream_id = self.stream_id();
        let mut used = vec![false; self.local_tracks.len()];
        let mut builder = sdp::SessionDescription::builder(SdpType::Answer)
            .origin(Origin::generate())
            .ice_credentials(&self.local_credentials.ufrag, &self.local_credentials.pwd);

        for (index, offered) in offer.media.iter().enumerate() {
            let mid = offered
                .mid()
                .map(str::to_string)
                .unwrap_or_else(|| index.to_string());

            let section = match TrackKind::from_media_kind(offered.kind) {
                None => MediaDescription::data_channel(&mid),
                Some(kind) => {
                    let local = self
                        .local_tracks
                        .iter()
                        .enumerate()
                        .find(|(i, track)| !used[*i] && track.kind == kind);
                    match local {
                        Some((i, track)) => {
                            used[i] = true;
                            MediaDescription::track(
                                offered.kind,
                                &mid,
                                Direction::SendRecv,
                                Some((stream_id.as_str(), track.id.as_str())),
                            )
                        }
                        None => MediaDescription::track(offered.kind, &mid, Direction::RecvOnly, None),
                    }
                }
            };
            builder = builder.add_media(section);
        }

        for (track, _) in self
            .local_tracks
            .iter()
            .zip(&used)
            .filter(|(_, used)| !**used)
        {
            self.logger.info(&format!(
                "Local {} track {} was not requested by the offer",
                track.kind, track.id
            ));
        }
        builder.build()
    }

    /// Parses a remote description and takes its credentials and embedded candidates.
    fn accept_remote_description(
        &mut self,
        desc: &SessionDescription,
    ) -> Result<sdp::SessionDescription> {
        let parsed = match desc.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(self.fail(PeerError::MalformedMessage(format!(
                    "remote {}: {}",
                    desc.kind, e
                ))));
            }
        };

        if !parsed.media.iter().any(|m| m.kind == MediaKind::Application) {
            return Err(self.fail(PeerError::MalformedMessage(format!(
                "remote {} has no data channel section",
                desc.kind
            ))));
        }

        let credentials = parsed
            .ice_credentials()
            .map_err(PeerError::from)
            .and_then(|(ufrag, pwd)| IceCredentials::new(ufrag, pwd).map_err(PeerError::from));
        let credentials = match credentials {
            Ok(credentials) => credentials,
            Err(e) => return Err(self.fail(e)),
        };

        let embedded: Vec<Candidate> = parsed.candidates().into_iter().map(Candidate::new).collect();
        if !embedded.is_empty() {
            self.logger.debug(&format!(
                "Remote {} carries {} candidates",
                desc.kind,
                embedded.len()
            ));
        }
        self.buffered_candidates.extend(embedded);
        self.remote_credentials = Some(credentials);
        Ok(parsed)
    }

    fn emit_local_candidates(&mut self) {
        for candidate in &self.local_candidates {
            self.observer.on_local_candidate(Candidate::from_ice(candidate));
        }
    }

    fn flush_buffered_candidates(&mut self) {
        for candidate in std::mem::take(&mut self.buffered_candidates) {
            self.apply_candidate(candidate);
        }
    }

    fn apply_candidate(&mut self, candidate: Candidate) {
        let parsed = match candidate.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                self.logger.warn(&format!(
                    "Dropping malformed remote candidate {:?}: {}",
                    candidate.candidate, e
                ));
                return;
            }
        };
        if self.remote_candidates.contains(&parsed) {
            return;
        }

        self.logger.debug(&format!("Remote candidate {}", parsed));
        self.remote_candidates.push(parsed.clone());

        let checking = self.role.is_controlling()
            && self.state == ConnectionState::Negotiating
            && self.remote_description.is_some();
        if checking {
            self.start_checks(&[parsed]);
        }
    }

    /// Starts a check for every pair of local candidates with `remote`, highest priority first.
    fn start_checks(&mut self, remote: &[ice::Candidate]) {
        let Some(remote_credentials) = self.remote_credentials.clone() else {
            return;
        };
        let pairs = CandidatePair::form_pairs(&self.local_candidates, remote, true);
        for pair in pairs {
            match self.transport.start_check(
                &pair,
                &self.local_credentials,
                &remote_credentials,
                self.config.candidate_discovery_timeout,
            ) {
                Ok(()) => self.logger.debug(&format!(
                    "Checking {} -> {} (priority {})",
                    pair.local.socket_addr(),
                    pair.remote.socket_addr(),
                    pair.priority
                )),
                Err(e) => self.logger.warn(&format!(
                    "Could not check {} -> {}: {}",
                    pair.local.socket_addr(),
                    pair.remote.socket_addr(),
                    e
                )),
            }
        }
    }

    fn on_connected(&mut self, channel: DataChannel) {
        self.logger
            .info(&format!("Data channel '{}' open", channel.label()));
        self.close_handle.attach(Arc::clone(&channel));
        self.channel = Some(Arc::clone(&channel));
        self.transition(ConnectionState::Connected);
        self.observer.on_data_channel_ready(channel);

        if let Some(stream) = self.remote_stream() {
            self.logger.info(&format!(
                "Remote stream {} with {} tracks",
                stream.stream_id,
                stream.tracks.len()
            ));
            self.observer.on_remote_media(stream);
        }
    }

    /// Audio/video tracks the remote description says the remote side sends.
    fn remote_stream(&self) -> Option<RemoteStream> {
        let remote = self.remote_description.as_ref()?;
        let mut stream_id = None;
        let mut tracks = Vec::new();

        for media in &remote.media {
            let Some(kind) = TrackKind::from_media_kind(media.kind) else {
                continue;
            };
            if !media.direction().sends() {
                continue;
            }
            let track_id = match media.msid() {
                Some((stream, track)) => {
                    stream_id.get_or_insert_with(|| stream.to_string());
                    track.to_string()
                }
                None => format!("{}-{}", kind, media.mid().unwrap_or("unknown")),
            };
            tracks.push(Track::new(track_id, kind));
        }

        if tracks.is_empty() {
            return None;
        }
        Some(RemoteStream {
            stream_id: stream_id.unwrap_or_else(|| "remote".to_string()),
            tracks,
        })
    }
}

impl Drop for ConnectionNegotiator {
    fn drop(&mut self) {
        self.release();
    }
}
