//! Reliable ordered delivery over plain UDP for Huntnet.
//!
//! One [`Endpoint`] wraps one nonblocking [`UdpSocket`] and speaks a small
//! connection-oriented framing on top of it: an explicit connect handshake,
//! per-peer sequence numbers, cumulative acks, fixed-interval
//! retransmission, keepalives, and an inactivity timeout.
//!
//! # Poll model
//!
//! Nothing here owns a thread or a clock. The caller drives everything by
//! calling [`Endpoint::poll`] once per frame with the current time in
//! seconds; `poll` drains the socket, runs every timer as a plain
//! comparison against `now`, and returns the [`TransportEvent`]s that
//! happened. The same endpoint type serves both sides: a host binds a known
//! port and accepts, a client binds an ephemeral port and calls
//! [`Endpoint::connect`].
//!
//! # What this layer does not do
//!
//! Payloads are opaque bytes — encoding application packets is the
//! protocol crate's job. There is no fragmentation: a payload over
//! [`MAX_PAYLOAD`] is an error at the send call, never a partial datagram.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt;
use std::io::ErrorKind;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};

mod error;
mod frame;

pub use error::TransportError;
use frame::{Frame, RefuseReason};

/// Largest payload accepted by [`Endpoint::send_reliable`], leaving
/// headroom under the UDP datagram ceiling for the frame header.
pub const MAX_PAYLOAD: usize = 60_000;

/// How far ahead of the next expected sequence number an out-of-order
/// payload may arrive before it is dropped instead of buffered.
const REORDER_WINDOW: u32 = 1024;

/// Opaque identifier for a remote peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(u64);

impl PeerId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer-{}", self.0)
    }
}

/// Timer intervals and capacity limits for one endpoint.
#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    /// Peers accepted before new connects are refused.
    pub max_peers: usize,
    /// Seconds between retransmissions of unacked payloads (and of the
    /// connect request while handshaking).
    pub retransmit_interval: f64,
    /// Seconds of send-side silence before a keepalive goes out.
    pub keepalive_interval: f64,
    /// Seconds of receive-side silence before a connected peer is dropped.
    pub timeout: f64,
    /// Seconds before an unanswered connect attempt gives up.
    pub connect_timeout: f64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_peers: 8,
            retransmit_interval: 0.2,
            keepalive_interval: 1.0,
            timeout: 5.0,
            connect_timeout: 5.0,
        }
    }
}

/// Why a peer went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The remote side sent an orderly disconnect.
    Requested,
    /// Nothing was heard from the peer within the timeout.
    TimedOut,
}

/// Something that happened during a [`Endpoint::poll`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed: on a host, a client was accepted; on a
    /// client, the host answered our connect.
    Connected { peer: PeerId, addr: SocketAddr },
    /// A connect attempt failed. `refused` distinguishes an explicit
    /// refusal from silence.
    ConnectFailed {
        peer: PeerId,
        addr: SocketAddr,
        refused: bool,
    },
    /// One reliable message, delivered in send order.
    Payload { peer: PeerId, data: Vec<u8> },
    /// The peer is gone.
    Disconnected {
        peer: PeerId,
        reason: DisconnectReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum PeerState {
    /// Client side: connect sent, waiting for accept or refuse.
    Connecting { started: f64 },
    Connected,
}

/// Per-peer reliability state.
#[derive(Debug)]
struct Peer {
    addr: SocketAddr,
    state: PeerState,
    /// Sequence number the next outgoing payload will carry.
    next_send_seq: u32,
    /// Sent payloads not yet covered by a cumulative ack, as encoded
    /// frames ready to retransmit. Ordered by sequence number.
    unacked: VecDeque<(u32, Vec<u8>)>,
    /// Sequence number the next in-order incoming payload must carry.
    next_recv_seq: u32,
    /// Payloads that arrived ahead of `next_recv_seq`.
    reorder: BTreeMap<u32, Vec<u8>>,
    last_send: f64,
    last_recv: f64,
    last_retransmit: f64,
}

impl Peer {
    fn new(addr: SocketAddr, state: PeerState, now: f64) -> Self {
        Self {
            addr,
            state,
            next_send_seq: 1,
            unacked: VecDeque::new(),
            next_recv_seq: 1,
            reorder: BTreeMap::new(),
            last_send: now,
            last_recv: now,
            last_retransmit: now,
        }
    }

    /// Highest sequence number delivered in order so far.
    fn cumulative_ack(&self) -> u32 {
        self.next_recv_seq - 1
    }
}

/// One UDP socket plus the connection state of every peer behind it.
pub struct Endpoint {
    socket: UdpSocket,
    config: TransportConfig,
    /// Hosts answer connect requests; clients ignore them.
    accept_incoming: bool,
    peers: HashMap<PeerId, Peer>,
    by_addr: HashMap<SocketAddr, PeerId>,
    next_peer_id: u64,
}

impl Endpoint {
    /// Binds a listening endpoint that accepts incoming connections.
    pub fn host(addr: impl ToSocketAddrs, config: TransportConfig) -> Result<Self, TransportError> {
        let endpoint = Self::bind(addr, config, true)?;
        if let Ok(local) = endpoint.socket.local_addr() {
            tracing::info!(addr = %local, "transport listening");
        }
        Ok(endpoint)
    }

    /// Binds an ephemeral-port endpoint that only dials out.
    pub fn client(config: TransportConfig) -> Result<Self, TransportError> {
        Self::bind("0.0.0.0:0", config, false)
    }

    fn bind(
        addr: impl ToSocketAddrs,
        config: TransportConfig,
        accept_incoming: bool,
    ) -> Result<Self, TransportError> {
        let socket = UdpSocket::bind(addr).map_err(TransportError::Bind)?;
        socket.set_nonblocking(true).map_err(TransportError::Bind)?;
        Ok(Self {
            socket,
            config,
            accept_incoming,
            peers: HashMap::new(),
            by_addr: HashMap::new(),
            next_peer_id: 1,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, TransportError> {
        self.socket.local_addr().map_err(TransportError::LocalAddr)
    }

    /// Starts a connection attempt to `addr`. The result arrives later from
    /// [`poll`](Self::poll) as either `Connected` or `ConnectFailed`.
    pub fn connect(&mut self, addr: SocketAddr, now: f64) -> Result<PeerId, TransportError> {
        if let Some(&existing) = self.by_addr.get(&addr) {
            return Ok(existing);
        }
        let id = self.alloc_peer_id();
        let peer = Peer::new(addr, PeerState::Connecting { started: now }, now);
        self.send_frame(addr, &Frame::Connect)?;
        self.peers.insert(id, peer);
        self.by_addr.insert(addr, id);
        tracing::debug!(%id, %addr, "connect attempt started");
        Ok(id)
    }

    /// Queues one reliable message to a connected peer. The message is
    /// sent immediately and retransmitted until acked.
    pub fn send_reliable(
        &mut self,
        peer_id: PeerId,
        data: &[u8],
        now: f64,
    ) -> Result<(), TransportError> {
        if data.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                len: data.len(),
                max: MAX_PAYLOAD,
            });
        }
        let peer = self
            .peers
            .get_mut(&peer_id)
            .ok_or(TransportError::UnknownPeer(peer_id))?;
        if peer.state != PeerState::Connected {
            return Err(TransportError::NotConnected(peer_id));
        }
        let seq = peer.next_send_seq;
        peer.next_send_seq += 1;
        let encoded = Frame::Payload {
            seq,
            data: data.to_vec(),
        }
        .encode();
        self.socket
            .send_to(&encoded, peer.addr)
            .map_err(TransportError::Send)?;
        peer.unacked.push_back((seq, encoded));
        peer.last_send = now;
        Ok(())
    }

    /// Sends one reliable message to every connected peer. Send failures
    /// are logged per peer rather than aborting the broadcast.
    pub fn broadcast_reliable(&mut self, data: &[u8], now: f64) -> Result<(), TransportError> {
        if data.len() > MAX_PAYLOAD {
            return Err(TransportError::PayloadTooLarge {
                len: data.len(),
                max: MAX_PAYLOAD,
            });
        }
        let targets: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(_, p)| p.state == PeerState::Connected)
            .map(|(&id, _)| id)
            .collect();
        for id in targets {
            if let Err(err) = self.send_reliable(id, data, now) {
                tracing::warn!(peer = %id, %err, "broadcast send failed");
            }
        }
        Ok(())
    }

    /// Tears down a peer. A single disconnect frame goes out best-effort;
    /// no event is emitted for a locally requested teardown.
    pub fn disconnect(&mut self, peer_id: PeerId) -> Result<(), TransportError> {
        let peer = self
            .peers
            .remove(&peer_id)
            .ok_or(TransportError::UnknownPeer(peer_id))?;
        self.by_addr.remove(&peer.addr);
        if let Err(err) = self.socket.send_to(&Frame::Disconnect.encode(), peer.addr) {
            tracing::debug!(peer = %peer_id, %err, "disconnect frame not sent");
        }
        tracing::debug!(peer = %peer_id, addr = %peer.addr, "peer disconnected locally");
        Ok(())
    }

    /// Disconnects every peer, e.g. when a host shuts its session down.
    pub fn disconnect_all(&mut self) {
        let ids: Vec<PeerId> = self.peers.keys().copied().collect();
        for id in ids {
            let _ = self.disconnect(id);
        }
    }

    pub fn peer_addr(&self, peer_id: PeerId) -> Option<SocketAddr> {
        self.peers.get(&peer_id).map(|p| p.addr)
    }

    pub fn is_connected(&self, peer_id: PeerId) -> bool {
        self.peers
            .get(&peer_id)
            .is_some_and(|p| p.state == PeerState::Connected)
    }

    pub fn connected_peers(&self) -> Vec<PeerId> {
        let mut ids: Vec<PeerId> = self
            .peers
            .iter()
            .filter(|(_, p)| p.state == PeerState::Connected)
            .map(|(&id, _)| id)
            .collect();
        ids.sort();
        ids
    }

    /// Drains the socket, runs all timers, and returns what happened.
    pub fn poll(&mut self, now: f64) -> Vec<TransportEvent> {
        let mut events = Vec::new();
        self.drain_socket(now, &mut events);
        self.run_timers(now, &mut events);
        events
    }

    // -----------------------------------------------------------------------
    // Receive path
    // -----------------------------------------------------------------------

    fn drain_socket(&mut self, now: f64, events: &mut Vec<TransportEvent>) {
        let mut buf = [0u8; 65536];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, addr)) => self.handle_datagram(&buf[..len], addr, now, events),
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                // Windows surfaces ICMP port-unreachable as ConnectionReset
                // on the next recv; the timeout handles the dead peer.
                Err(err) if err.kind() == ErrorKind::ConnectionReset => continue,
                Err(err) => {
                    tracing::warn!(%err, "socket receive failed");
                    break;
                }
            }
        }
    }

    fn handle_datagram(
        &mut self,
        datagram: &[u8],
        addr: SocketAddr,
        now: f64,
        events: &mut Vec<TransportEvent>,
    ) {
        let Some(frame) = Frame::decode(datagram) else {
            tracing::trace!(%addr, len = datagram.len(), "dropping malformed datagram");
            return;
        };

        let known = self.by_addr.get(&addr).copied();
        match frame {
            Frame::Connect => self.handle_connect(addr, known, now, events),
            Frame::Accept => {
                if let Some(id) = known {
                    if let Some(peer) = self.peers.get_mut(&id) {
                        peer.last_recv = now;
                        if let PeerState::Connecting { .. } = peer.state {
                            peer.state = PeerState::Connected;
                            tracing::info!(peer = %id, %addr, "connected");
                            events.push(TransportEvent::Connected { peer: id, addr });
                        }
                    }
                }
            }
            Frame::Refuse { reason } => {
                if let Some(id) = known {
                    let connecting = self
                        .peers
                        .get(&id)
                        .is_some_and(|p| matches!(p.state, PeerState::Connecting { .. }));
                    if connecting {
                        self.remove_peer(id);
                        tracing::warn!(peer = %id, %addr, ?reason, "connection refused");
                        events.push(TransportEvent::ConnectFailed {
                            peer: id,
                            addr,
                            refused: true,
                        });
                    }
                }
            }
            Frame::Payload { seq, data } => {
                if let Some(id) = known {
                    self.handle_payload(id, seq, data, now, events);
                }
            }
            Frame::Ack { cumulative } => {
                if let Some(peer) = known.and_then(|id| self.peers.get_mut(&id)) {
                    peer.last_recv = now;
                    while peer
                        .unacked
                        .front()
                        .is_some_and(|&(seq, _)| seq <= cumulative)
                    {
                        peer.unacked.pop_front();
                    }
                }
            }
            Frame::Disconnect => {
                if let Some(id) = known {
                    self.remove_peer(id);
                    tracing::info!(peer = %id, %addr, "peer disconnected");
                    events.push(TransportEvent::Disconnected {
                        peer: id,
                        reason: DisconnectReason::Requested,
                    });
                }
            }
            Frame::Keepalive => {
                if let Some(peer) = known.and_then(|id| self.peers.get_mut(&id)) {
                    peer.last_recv = now;
                }
            }
        }
    }

    fn handle_connect(
        &mut self,
        addr: SocketAddr,
        known: Option<PeerId>,
        now: f64,
        events: &mut Vec<TransportEvent>,
    ) {
        if !self.accept_incoming {
            return;
        }
        if let Some(id) = known {
            // Our accept was lost and the client retransmitted. Answer
            // again without resetting any state.
            if let Some(peer) = self.peers.get_mut(&id) {
                peer.last_recv = now;
            }
            let _ = self.send_frame(addr, &Frame::Accept);
            return;
        }
        if self.peers.len() >= self.config.max_peers {
            tracing::warn!(%addr, max = self.config.max_peers, "refusing connect, at capacity");
            let _ = self.send_frame(
                addr,
                &Frame::Refuse {
                    reason: RefuseReason::Full,
                },
            );
            return;
        }
        let id = self.alloc_peer_id();
        self.peers
            .insert(id, Peer::new(addr, PeerState::Connected, now));
        self.by_addr.insert(addr, id);
        let _ = self.send_frame(addr, &Frame::Accept);
        tracing::info!(peer = %id, %addr, "accepted connection");
        events.push(TransportEvent::Connected { peer: id, addr });
    }

    fn handle_payload(
        &mut self,
        id: PeerId,
        seq: u32,
        data: Vec<u8>,
        now: f64,
        events: &mut Vec<TransportEvent>,
    ) {
        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        peer.last_recv = now;
        if peer.state != PeerState::Connected {
            return;
        }

        if seq >= peer.next_recv_seq && seq < peer.next_recv_seq + REORDER_WINDOW {
            // Duplicate of a buffered-but-undelivered payload overwrites
            // itself, which is harmless.
            peer.reorder.insert(seq, data);
            while let Some(data) = peer.reorder.remove(&peer.next_recv_seq) {
                peer.next_recv_seq += 1;
                events.push(TransportEvent::Payload {
                    peer: id,
                    data,
                });
            }
        }
        // Anything below next_recv_seq is a duplicate of a delivered
        // payload; anything past the window is dropped unacked so the
        // sender retransmits it later. Either way the ack below tells the
        // sender where we actually are.
        let ack = Frame::Ack {
            cumulative: peer.cumulative_ack(),
        };
        let addr = peer.addr;
        peer.last_send = now;
        let _ = self.send_frame(addr, &ack);
    }

    // -----------------------------------------------------------------------
    // Timers
    // -----------------------------------------------------------------------

    fn run_timers(&mut self, now: f64, events: &mut Vec<TransportEvent>) {
        let ids: Vec<PeerId> = self.peers.keys().copied().collect();
        for id in ids {
            let Some(peer) = self.peers.get(&id) else {
                continue;
            };
            match peer.state {
                PeerState::Connecting { started } => {
                    if now - started >= self.config.connect_timeout {
                        let addr = peer.addr;
                        self.remove_peer(id);
                        tracing::warn!(peer = %id, %addr, "connect attempt timed out");
                        events.push(TransportEvent::ConnectFailed {
                            peer: id,
                            addr,
                            refused: false,
                        });
                    } else if now - peer.last_send >= self.config.retransmit_interval {
                        let addr = peer.addr;
                        let _ = self.send_frame(addr, &Frame::Connect);
                        if let Some(peer) = self.peers.get_mut(&id) {
                            peer.last_send = now;
                        }
                    }
                }
                PeerState::Connected => {
                    if now - peer.last_recv >= self.config.timeout {
                        self.remove_peer(id);
                        tracing::warn!(peer = %id, "peer timed out");
                        events.push(TransportEvent::Disconnected {
                            peer: id,
                            reason: DisconnectReason::TimedOut,
                        });
                        continue;
                    }
                    if !peer.unacked.is_empty()
                        && now - peer.last_retransmit >= self.config.retransmit_interval
                    {
                        self.retransmit(id, now);
                    }
                    if let Some(peer) = self.peers.get_mut(&id) {
                        if now - peer.last_send >= self.config.keepalive_interval {
                            let addr = peer.addr;
                            peer.last_send = now;
                            let _ = self.send_frame(addr, &Frame::Keepalive);
                        }
                    }
                }
            }
        }
    }

    fn retransmit(&mut self, id: PeerId, now: f64) {
        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        peer.last_retransmit = now;
        peer.last_send = now;
        let addr = peer.addr;
        let frames: Vec<Vec<u8>> = peer.unacked.iter().map(|(_, f)| f.clone()).collect();
        tracing::trace!(peer = %id, count = frames.len(), "retransmitting unacked payloads");
        for encoded in frames {
            if let Err(err) = self.socket.send_to(&encoded, addr) {
                tracing::warn!(peer = %id, %err, "retransmit send failed");
                break;
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn alloc_peer_id(&mut self) -> PeerId {
        let id = PeerId::new(self.next_peer_id);
        self.next_peer_id += 1;
        id
    }

    fn remove_peer(&mut self, id: PeerId) {
        if let Some(peer) = self.peers.remove(&id) {
            self.by_addr.remove(&peer.addr);
        }
    }

    fn send_frame(&self, addr: SocketAddr, frame: &Frame) -> Result<(), TransportError> {
        self.socket
            .send_to(&frame.encode(), addr)
            .map_err(TransportError::Send)?;
        Ok(())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("local_addr", &self.socket.local_addr().ok())
            .field("accept_incoming", &self.accept_incoming)
            .field("peers", &self.peers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_new_and_into_inner() {
        let id = PeerId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_peer_id_display() {
        assert_eq!(PeerId::new(7).to_string(), "peer-7");
    }

    #[test]
    fn test_default_config_timer_ordering() {
        // Retransmission must fire several times within the timeout or
        // reliability is fiction.
        let config = TransportConfig::default();
        assert!(config.retransmit_interval * 4.0 < config.timeout);
        assert!(config.keepalive_interval < config.timeout);
    }

    #[test]
    fn test_send_to_unknown_peer_fails() {
        let mut endpoint = Endpoint::client(TransportConfig::default()).unwrap();
        let err = endpoint
            .send_reliable(PeerId::new(99), b"hi", 0.0)
            .unwrap_err();
        assert!(matches!(err, TransportError::UnknownPeer(id) if id == PeerId::new(99)));
    }

    #[test]
    fn test_send_while_handshaking_fails() {
        let mut endpoint = Endpoint::client(TransportConfig::default()).unwrap();
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let peer = endpoint.connect(target, 0.0).unwrap();
        let err = endpoint.send_reliable(peer, b"hi", 0.0).unwrap_err();
        assert!(matches!(err, TransportError::NotConnected(id) if id == peer));
    }

    #[test]
    fn test_oversized_payload_fails_without_sending() {
        let mut endpoint = Endpoint::client(TransportConfig::default()).unwrap();
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let peer = endpoint.connect(target, 0.0).unwrap();
        let data = vec![0u8; MAX_PAYLOAD + 1];
        let err = endpoint.send_reliable(peer, &data, 0.0).unwrap_err();
        assert!(matches!(
            err,
            TransportError::PayloadTooLarge {
                len,
                max: MAX_PAYLOAD
            } if len == MAX_PAYLOAD + 1
        ));
    }

    #[test]
    fn test_connect_twice_returns_same_peer() {
        let mut endpoint = Endpoint::client(TransportConfig::default()).unwrap();
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let first = endpoint.connect(target, 0.0).unwrap();
        let second = endpoint.connect(target, 1.0).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_connect_attempt_times_out() {
        let config = TransportConfig::default();
        let mut endpoint = Endpoint::client(config).unwrap();
        // A discard-port address nothing answers on.
        let target: SocketAddr = "127.0.0.1:9".parse().unwrap();
        let peer = endpoint.connect(target, 0.0).unwrap();

        let events = endpoint.poll(config.connect_timeout - 0.1);
        assert!(events.is_empty());

        let events = endpoint.poll(config.connect_timeout + 0.1);
        assert_eq!(
            events,
            vec![TransportEvent::ConnectFailed {
                peer,
                addr: target,
                refused: false,
            }]
        );
        assert!(endpoint.peer_addr(peer).is_none());
    }
}
