//! In-process transport.
//!
//! Endpoints live on a [`LoopbackNetwork`] shared by both peers and are
//! addressed by virtual `127.0.0.1:<port>` host candidates. A connectivity
//! check is a channel pair handed to the remote endpoint together with the
//! check credentials; the remote side answers it from its own `poll_channel`.

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
use std::collections::{HashMap, VecDeque};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

const FIRST_PORT: u16 = 50_000;

/// One half of an in-memory channel pair.
#[derive(Debug)]
pub struct MemoryChannel {
    label: String,
    outbound: Arc<MessageQueue>,
    inbound: Arc<MessageQueue>,
}

impl MemoryChannel {
    /// Creates two connected halves; each direction buffers up to `max_buffered` bytes.
    pub fn pair(label: &str, max_buffered: usize) -> (MemoryChannel, MemoryChannel) {
        let a_to_b = Arc::new(MessageQueue::new(max_buffered));
        let b_to_a = Arc::new(MessageQueue::new(max_buffered));
        (
            MemoryChannel {
                label: label.to_string(),
                outbound: Arc::clone(&a_to_b),
                inbound: Arc::clone(&b_to_a),
            },
            MemoryChannel {
                label: label.to_string(),
                outbound: b_to_a,
                inbound: a_to_b,
            },
        )
    }
}

impl MessageChannel for MemoryChannel {
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

    fn close(&self) {
        self.outbound.close();
        self.inbound.close();
    }
}

struct PendingCheck {
    username: String,
    password: String,
    channel: MemoryChannel,
    verdict: Sender<bool>,
}

#[derive(Default)]
struct NetworkState {
    next_port: u16,
    endpoints: HashMap<SocketAddr, VecDeque<PendingCheck>>,
}

/// Registry of in-process endpoints. Clones share the same network.
#[derive(Clone, Default)]
pub struct LoopbackNetwork {
    inner: Arc<Mutex<NetworkState>>,
}

impl LoopbackNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn bind(&self) -> Result<SocketAddr> {
        let mut state = self.lock();
        let offset = state.next_port;
        let port = FIRST_PORT
            .checked_add(offset)
            .ok_or_else(|| PeerError::Transport("loopback network is out of ports".into()))?;
        state.next_port += 1;

        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port);
        state.endpoints.insert(addr, VecDeque::new());
        Ok(addr)
    }

    fn unbind(&self, addr: SocketAddr) {
        self.lock().endpoints.remove(&addr);
    }

    /// Queues a check at `addr`; hands it back when nothing listens there.
    fn deliver(&self, addr: SocketAddr, check: PendingCheck) -> std::result::Result<(), PendingCheck> {
        match self.lock().endpoints.get_mut(&addr) {
            Some(queue) => {
                queue.push_back(check);
                Ok(())
            }
            None => Err(check),
        }
    }

    fn take_checks(&self, addr: SocketAddr) -> Vec<PendingCheck> {
        self.lock()
            .endpoints
            .get_mut(&addr)
            .map(|queue| queue.drain(..).collect())
            .unwrap_or_default()
    }

    /// Number of bound endpoints.
    pub fn endpoint_count(&self) -> usize {
        self.lock().endpoints.len()
    }
}

struct OutboundCheck {
    remote: SocketAddr,
    verdict: Receiver<bool>,
    channel: MemoryChannel,
    deadline: Instant,
}

/// [`PeerTransport`] over a [`LoopbackNetwork`].
pub struct MemoryTransport {
    network: LoopbackNetwork,
    address: Option<SocketAddr>,
    label: String,
    max_buffered: usize,
    outbound: Vec<OutboundCheck>,
    logger: Logger,
}

impl MemoryTransport {
    pub fn new(network: LoopbackNetwork, config: &PeerConfig, logger: Logger) -> Self {
        Self {
            network,
            address: None,
            label: config.data_channel_label.clone(),
            max_buffered: config.max_buffered_amount,
            outbound: Vec::new(),
            logger,
        }
    }

    pub fn local_address(&self) -> Option<SocketAddr> {
        self.address
    }

    fn poll_outbound(&mut self) -> Option<MemoryChannel> {
        let now = Instant::now();
        let mut connected = None;
        let mut still_pending = Vec::new();

        for check in self.outbound.drain(..) {
            if connected.is_some() {
                continue;
            }
            match check.verdict.try_recv() {
                Ok(true) => connected = Some(check.channel),
                Ok(false) | Err(TryRecvError::Disconnected) => {
                    self.logger
                        .debug(&format!("Check to {} rejected", check.remote));
                }
                Err(TryRecvError::Empty) if now >= check.deadline => {
                    self.logger
                        .debug(&format!("Check to {} timed out", check.remote));
                }
                Err(TryRecvError::Empty) => still_pending.push(check),
            }
        }

        self.outbound = if connected.is_some() {
            Vec::new()
        } else {
            still_pending
        };
        connected
    }

    fn poll_inbound(&mut self, local: &IceCredentials, remote: &IceCredentials) -> Option<MemoryChannel> {
        let address = self.address?;
        let mut accepted = None;

        for check in self.network.take_checks(address) {
            let matches = accepted.is_none()
                && check_matches(&check.username, &check.password, local, remote);
            // The dialer may already have given up on the check.
            let _ = check.verdict.send(matches);
            if matches {
                accepted = Some(check.channel);
            } else {
                self.logger
                    .warn(&format!("Rejected check with username {}", check.username));
            }
        }
        accepted
    }
}

impl PeerTransport for MemoryTransport {
    fn gather_candidates(
        &mut self,
        _credentials: &IceCredentials,
        _timeout: Duration,
    ) -> Result<Vec<Candidate>> {
        let address = match self.address {
            Some(address) => address,
            None => {
                let address = self.network.bind()?;
                self.address = Some(address);
                address
            }
        };
        self.logger.debug(&format!("Listening on loopback {}", address));
        Ok(vec![Candidate::host("1", Transport::Udp, address)])
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
        let (ours, theirs) = MemoryChannel::pair(&self.label, self.max_buffered);
        let (verdict_tx, verdict_rx) = mpsc::channel();

        let check = PendingCheck {
            username,
            password,
            channel: theirs,
            verdict: verdict_tx,
        };
        if self.network.deliver(target, check).is_err() {
            self.logger.debug(&format!("No endpoint at {}", target));
            return Ok(());
        }

        self.outbound.push(OutboundCheck {
            remote: target,
            verdict: verdict_rx,
            channel: ours,
            deadline: Instant::now() + timeout,
        });
        Ok(())
    }

    fn poll_channel(
        &mut self,
        local: &IceCredentials,
        remote: &IceCredentials,
    ) -> Result<Option<DataChannel>> {
        if let Some(channel) = self.poll_outbound() {
            return Ok(Some(Arc::new(channel)));
        }
        Ok(self
            .poll_inbound(local, remote)
            .map(|channel| Arc::new(channel) as DataChannel))
    }

    fn close(&mut self) {
        if let Some(address) = self.address.take() {
            self.network.unbind(address);
        }
        self.outbound.clear();
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ice::CandidatePair;

    fn transport(network: &LoopbackNetwork) -> MemoryTransport {
        MemoryTransport::new(network.clone(), &PeerConfig::default(), Logger::discard())
    }

    fn connect(
        dialer: &mut MemoryTransport,
        acceptor: &mut MemoryTransport,
        dialer_creds: &IceCredentials,
        acceptor_creds: &IceCredentials,
        presented: &IceCredentials,
    ) -> (Option<DataChannel>, Option<DataChannel>) {
        let local = dialer.gather_candidates(dialer_creds, Duration::from_secs(1)).unwrap();
        let remote = acceptor
            .gather_candidates(acceptor_creds, Duration::from_secs(1))
            .unwrap();
        let pair = CandidatePair::new(local[0].clone(), remote[0].clone(), true);

        dialer
            .start_check(&pair, presented, acceptor_creds, Duration::from_secs(1))
            .unwrap();
        let accepted = acceptor.poll_channel(acceptor_creds, dialer_creds).unwrap();
        let dialed = dialer.poll_channel(dialer_creds, acceptor_creds).unwrap();
        (dialed, accepted)
    }

    #[test]
    fn test_channel_pair_is_ordered_and_bidirectional() {
        let (a, b) = MemoryChannel::pair("fileTransfer", 1024);
        a.try_send(TransferMessage::Chunk(vec![1])).unwrap();
        a.try_send(TransferMessage::End).unwrap();
        b.try_send(TransferMessage::Chunk(vec![9])).unwrap();

        let timeout = Duration::from_millis(10);
        assert_eq!(b.recv_timeout(timeout), Ok(TransferMessage::Chunk(vec![1])));
        assert_eq!(b.recv_timeout(timeout), Ok(TransferMessage::End));
        assert_eq!(a.recv_timeout(timeout), Ok(TransferMessage::Chunk(vec![9])));
        assert_eq!(b.label(), "fileTransfer");
    }

    #[test]
    fn test_close_is_visible_on_both_halves() {
        let (a, b) = MemoryChannel::pair("x", 1024);
        a.try_send(TransferMessage::Chunk(vec![1, 2])).unwrap();
        a.close();

        assert!(b.is_closed());
        assert_eq!(
            b.recv_timeout(Duration::ZERO),
            Ok(TransferMessage::Chunk(vec![1, 2]))
        );
        assert_eq!(b.recv_timeout(Duration::ZERO), Err(RecvError::Closed));
        assert!(matches!(
            b.try_send(TransferMessage::End),
            Err(TrySendError::Closed(_))
        ));
    }

    #[test]
    fn test_gather_assigns_distinct_addresses() {
        let network = LoopbackNetwork::new();
        let creds = IceCredentials::generate();
        let mut a = transport(&network);
        let mut b = transport(&network);

        let ca = a.gather_candidates(&creds, Duration::from_secs(1)).unwrap();
        let cb = b.gather_candidates(&creds, Duration::from_secs(1)).unwrap();
        assert_ne!(ca[0].socket_addr(), cb[0].socket_addr());
        assert_eq!(network.endpoint_count(), 2);

        a.close();
        assert_eq!(network.endpoint_count(), 1);
    }

    #[test]
    fn test_check_with_matching_credentials_connects() {
        let network = LoopbackNetwork::new();
        let (mut dialer, mut acceptor) = (transport(&network), transport(&network));
        let (dialer_creds, acceptor_creds) = (IceCredentials::generate(), IceCredentials::generate());

        let (dialed, accepted) = connect(
            &mut dialer,
            &mut acceptor,
            &dialer_creds,
            &acceptor_creds,
            &dialer_creds,
        );
        let (dialed, accepted) = (dialed.unwrap(), accepted.unwrap());

        dialed.try_send(TransferMessage::End).unwrap();
        assert_eq!(
            accepted.recv_timeout(Duration::from_millis(10)),
            Ok(TransferMessage::End)
        );
    }

    #[test]
    fn test_check_with_wrong_credentials_is_rejected() {
        let network = LoopbackNetwork::new();
        let (mut dialer, mut acceptor) = (transport(&network), transport(&network));
        let (dialer_creds, acceptor_creds) = (IceCredentials::generate(), IceCredentials::generate());
        let impostor = IceCredentials::generate();

        let (dialed, accepted) = connect(
            &mut dialer,
            &mut acceptor,
            &dialer_creds,
            &acceptor_creds,
            &impostor,
        );
        assert!(dialed.is_none());
        assert!(accepted.is_none());
    }

    #[test]
    fn test_check_to_unbound_address_is_dropped() {
        let network = LoopbackNetwork::new();
        let mut dialer = transport(&network);
        let creds = IceCredentials::generate();
        let local = dialer.gather_candidates(&creds, Duration::from_secs(1)).unwrap();
        let nowhere = Candidate::host("9", Transport::Udp, "127.0.0.1:1".parse().unwrap());
        let pair = CandidatePair::new(local[0].clone(), nowhere, true);

        dialer
            .start_check(&pair, &creds, &IceCredentials::generate(), Duration::from_secs(1))
            .unwrap();
        assert!(dialer.poll_channel(&creds, &creds).unwrap().is_none());
    }
}
