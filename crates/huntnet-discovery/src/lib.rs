//! LAN host discovery for Huntnet.
//!
//! Discovery runs on its own UDP port, completely independent of the game
//! transport: hosts announce themselves, clients scan, and a server
//! browser reads the resulting [`ServerAdvertisement`] list. The messages
//! are plain `|`-delimited text (see [`message`]), so discovery keeps
//! working across wire-protocol revisions — compatibility is a field in
//! the announcement, not a precondition for seeing the host at all.
//!
//! Like the transport, discovery owns no clock: the caller ticks it with
//! the current time in seconds and every interval is a plain comparison.

use std::io::ErrorKind;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

mod error;
pub mod message;
mod registry;

pub use error::DiscoveryError;
pub use message::{Announcement, DEFAULT_GAME_PORT, DEFAULT_MAP_NAME};
pub use registry::{Registry, ServerAdvertisement};

/// Port the discovery protocol uses by default. Distinct from the game
/// port so a host can advertise before its session accepts anyone.
pub const DEFAULT_DISCOVERY_PORT: u16 = 7778;

/// Seconds between client scan broadcasts.
pub const SCAN_INTERVAL: f64 = 1.0;
/// Seconds between unsolicited host announcements.
pub const ANNOUNCE_INTERVAL: f64 = 1.0;
/// Seconds a discovered host stays listed without being heard from.
pub const SERVER_TTL: f64 = 3.5;

/// What a host advertises about its session. Mutable while running via
/// [`Discovery::update_host_info`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    pub host_name: String,
    pub map_name: String,
    pub players: i32,
    pub max_players: i32,
    /// Address clients should dial. Empty lets receivers fall back to the
    /// datagram's source address.
    pub preferred_ip: String,
}

enum Mode {
    Host {
        game_port: u16,
        info: HostInfo,
        last_announce: f64,
    },
    Client {
        registry: Registry,
        last_request: f64,
        /// The local host's own advertised endpoint, filtered out of scan
        /// results so a host browsing the LAN does not list itself.
        ignore: Option<(String, u16)>,
    },
}

/// One discovery socket, in either host or client mode.
///
/// Dropping it closes the socket; constructing a new one is the only way
/// to switch modes, so two live discovery sockets never race for a port.
pub struct Discovery {
    socket: UdpSocket,
    discovery_port: u16,
    protocol_version: i32,
    build_id: String,
    mode: Mode,
}

impl Discovery {
    /// Opens a host-mode socket on `discovery_port` and starts announcing
    /// `info` for the session listening on `game_port`.
    pub fn host(
        discovery_port: u16,
        game_port: u16,
        info: HostInfo,
        protocol_version: i32,
        build_id: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let socket = open_socket(discovery_port)?;
        tracing::info!(port = discovery_port, game_port, "discovery announcing");
        Ok(Self {
            socket,
            discovery_port,
            protocol_version,
            build_id: build_id.into(),
            mode: Mode::Host {
                game_port,
                info,
                // Forces an announcement on the first tick.
                last_announce: f64::NEG_INFINITY,
            },
        })
    }

    /// Opens a client-mode socket on an ephemeral port and starts scanning
    /// for hosts announcing on `discovery_port`.
    pub fn client(
        discovery_port: u16,
        protocol_version: i32,
        build_id: impl Into<String>,
    ) -> Result<Self, DiscoveryError> {
        let socket = open_socket(0)?;
        tracing::info!(port = discovery_port, "discovery scanning");
        Ok(Self {
            socket,
            discovery_port,
            protocol_version,
            build_id: build_id.into(),
            mode: Mode::Client {
                registry: Registry::new(),
                last_request: f64::NEG_INFINITY,
                ignore: None,
            },
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, DiscoveryError> {
        self.socket.local_addr().map_err(DiscoveryError::Setup)
    }

    /// Excludes an endpoint from scan results. A machine that is hosting
    /// while browsing passes its own advertised address here.
    pub fn ignore_endpoint(&mut self, ip: impl Into<String>, port: u16) {
        if let Mode::Client { ignore, .. } = &mut self.mode {
            *ignore = Some((ip.into(), port));
        }
    }

    /// Refreshes what a running host announces. No-op in client mode.
    pub fn update_host_info(
        &mut self,
        map_name: impl Into<String>,
        players: i32,
        max_players: i32,
        preferred_ip: Option<String>,
    ) {
        if let Mode::Host { info, .. } = &mut self.mode {
            info.map_name = map_name.into();
            info.players = players;
            info.max_players = max_players;
            if let Some(ip) = preferred_ip {
                if !ip.is_empty() {
                    info.preferred_ip = ip;
                }
            }
        }
    }

    /// Discovered hosts, freshest information per `(ip, port)`. Always
    /// empty in host mode.
    pub fn servers(&self) -> &[ServerAdvertisement] {
        match &self.mode {
            Mode::Client { registry, .. } => registry.servers(),
            Mode::Host { .. } => &[],
        }
    }

    /// Resets the scan timer so the next [`tick`](Self::tick) broadcasts a
    /// request immediately, and sends one right away.
    pub fn force_scan(&mut self, now: f64) {
        if let Mode::Client { last_request, .. } = &mut self.mode {
            *last_request = f64::NEG_INFINITY;
        } else {
            return;
        }
        self.send_request();
        if let Mode::Client { last_request, .. } = &mut self.mode {
            *last_request = now;
        }
    }

    /// Drives timers and drains the socket. Call once per frame.
    pub fn tick(&mut self, now: f64) {
        if matches!(self.mode, Mode::Host { .. }) {
            self.tick_host(now);
        } else {
            self.tick_client(now);
            if let Mode::Client { registry, .. } = &mut self.mode {
                registry.prune(now, SERVER_TTL);
            }
        }
    }

    // -----------------------------------------------------------------------
    // Host mode
    // -----------------------------------------------------------------------

    fn tick_host(&mut self, now: f64) {
        let mut buf = [0u8; 1024];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    let payload = String::from_utf8_lossy(&buf[..len]);
                    if message::is_request(&payload) {
                        self.send_announcement(from);
                        if let Mode::Host { last_announce, .. } = &mut self.mode {
                            *last_announce = now;
                        }
                    }
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::ConnectionReset => continue,
                Err(err) => {
                    tracing::warn!(%err, "discovery receive failed");
                    break;
                }
            }
        }

        let due = match &self.mode {
            Mode::Host { last_announce, .. } => now - last_announce >= ANNOUNCE_INTERVAL,
            Mode::Client { .. } => false,
        };
        if due {
            let target = SocketAddr::V4(SocketAddrV4::new(
                Ipv4Addr::BROADCAST,
                self.discovery_port,
            ));
            self.send_announcement(target);
            if let Mode::Host { last_announce, .. } = &mut self.mode {
                *last_announce = now;
            }
        }
    }

    fn send_announcement(&self, target: SocketAddr) {
        let Mode::Host {
            game_port, info, ..
        } = &self.mode
        else {
            return;
        };
        let announcement = Announcement {
            host_name: info.host_name.clone(),
            ip: info.preferred_ip.clone(),
            port: *game_port,
            map_name: info.map_name.clone(),
            players: info.players,
            max_players: info.max_players,
            protocol_version: self.protocol_version,
            build_id: self.build_id.clone(),
        };
        if let Err(err) = self
            .socket
            .send_to(announcement.to_payload().as_bytes(), target)
        {
            tracing::warn!(%err, %target, "announcement send failed");
        }
    }

    // -----------------------------------------------------------------------
    // Client mode
    // -----------------------------------------------------------------------

    fn tick_client(&mut self, now: f64) {
        let due = match &self.mode {
            Mode::Client { last_request, .. } => now - last_request >= SCAN_INTERVAL,
            Mode::Host { .. } => false,
        };
        if due {
            self.send_request();
            if let Mode::Client { last_request, .. } = &mut self.mode {
                *last_request = now;
            }
        }

        let mut buf = [0u8; 1024];
        loop {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => {
                    let payload = String::from_utf8_lossy(&buf[..len]).into_owned();
                    self.handle_response(&payload, from, now);
                }
                Err(err) if err.kind() == ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == ErrorKind::ConnectionReset => continue,
                Err(err) => {
                    tracing::warn!(%err, "discovery receive failed");
                    break;
                }
            }
        }
    }

    fn handle_response(&mut self, payload: &str, from: SocketAddr, now: f64) {
        let Some(parsed) = Announcement::parse(payload) else {
            return;
        };
        let ip = if parsed.ip.is_empty() {
            from.ip().to_string()
        } else {
            parsed.ip.clone()
        };
        // A host reachable only via loopback is this machine; the local
        // session UI already knows about it.
        if ip.starts_with("127.") {
            return;
        }

        let compatible =
            parsed.protocol_version == self.protocol_version && parsed.build_id == self.build_id;
        let entry = ServerAdvertisement {
            host_name: parsed.host_name,
            ip,
            port: parsed.port,
            map_name: parsed.map_name,
            players: parsed.players,
            max_players: parsed.max_players,
            protocol_version: parsed.protocol_version,
            build_id: parsed.build_id,
            compatible,
            last_seen: now,
        };

        if let Mode::Client {
            registry, ignore, ..
        } = &mut self.mode
        {
            if let Some((own_ip, own_port)) = ignore {
                if entry.ip == *own_ip && entry.port == *own_port {
                    return;
                }
            }
            registry.upsert(entry);
        }
    }

    fn send_request(&self) {
        let payload = message::request_payload(self.protocol_version, &self.build_id);
        let target = SocketAddr::V4(SocketAddrV4::new(
            Ipv4Addr::BROADCAST,
            self.discovery_port,
        ));
        if let Err(err) = self.socket.send_to(payload.as_bytes(), target) {
            tracing::warn!(%err, "scan request send failed");
        }
    }
}

fn open_socket(port: u16) -> Result<UdpSocket, DiscoveryError> {
    let socket =
        UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).map_err(DiscoveryError::Bind)?;
    socket.set_broadcast(true).map_err(DiscoveryError::Setup)?;
    socket
        .set_nonblocking(true)
        .map_err(DiscoveryError::Setup)?;
    Ok(socket)
}
