//! The joining side of a session.

use std::net::SocketAddr;

use huntnet_lobby::Roster;
use huntnet_protocol::{
    GameplayTuning, LobbyUpdate, MapKind, Packet, Role, RoleInput, decode, encode,
};
use huntnet_session::{SessionMachine, SessionState};
use huntnet_transport::{DisconnectReason, Endpoint, PeerId, TransportEvent};

use crate::config::NetConfig;
use crate::error::HuntnetError;
use crate::simulation::Simulation;

/// Runs the client side of a session: dials the host, performs the
/// application handshake, mirrors the lobby, forwards snapshots into the
/// simulation, and streams sampled input back.
pub struct ClientCoordinator {
    config: NetConfig,
    session: SessionMachine,
    transport: Endpoint,
    peer: PeerId,
    server_addr: SocketAddr,
    preferred_role: Role,
    /// Injected clock value when the connect attempt began; the handshake
    /// deadline counts from here.
    started: f64,
    handshake_done: bool,
    /// Net id the host assigned us; 0 until the first roster arrives.
    you: u32,
    roster: Roster,
    controlled_role: Option<Role>,
    /// World identity last loaded into the simulation.
    loaded_map: Option<(MapKind, u32)>,
    tuning: GameplayTuning,
    last_snapshot_received: f64,
    controls_enabled: bool,
    /// Input sampled by the game this frame, sent once per tick.
    pending_input: Option<RoleInput>,
}

impl ClientCoordinator {
    /// Starts a connect attempt to `ip:port`. Succeeds once the attempt is
    /// in flight; the outcome surfaces through the session machine as
    /// [`tick`](Self::tick) drives the handshake.
    pub fn start(
        config: NetConfig,
        ip: &str,
        port: u16,
        preferred_role: Role,
        now: f64,
    ) -> Result<Self, HuntnetError> {
        let text = format!("{ip}:{port}");
        let server_addr: SocketAddr = text
            .parse()
            .map_err(|_| HuntnetError::InvalidAddress(text.clone()))?;

        let mut session = SessionMachine::new();
        session.transition(
            SessionState::ClientConnecting,
            format!("joining {server_addr}"),
        );

        let mut transport = match Endpoint::client(config.transport_config()) {
            Ok(transport) => transport,
            Err(err) => {
                session.fail(format!("could not open socket: {err}"));
                return Err(err.into());
            }
        };
        let peer = transport.connect(server_addr, now)?;
        let roster = Roster::new(config.lobby_config());

        Ok(Self {
            config,
            session,
            transport,
            peer,
            server_addr,
            preferred_role,
            started: now,
            handshake_done: false,
            you: 0,
            roster,
            controlled_role: None,
            loaded_map: None,
            tuning: GameplayTuning::default(),
            last_snapshot_received: 0.0,
            controls_enabled: false,
            pending_input: None,
        })
    }

    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Net id the host assigned this client. Zero until the handshake
    /// completes.
    pub fn you(&self) -> u32 {
        self.you
    }

    pub fn controlled_role(&self) -> Option<Role> {
        self.controlled_role
    }

    pub fn tuning(&self) -> &GameplayTuning {
        &self.tuning
    }

    pub fn last_snapshot_received(&self) -> f64 {
        self.last_snapshot_received
    }

    pub fn set_controls_enabled(&mut self, enabled: bool) {
        self.controls_enabled = enabled;
    }

    /// Hands the coordinator this frame's sampled input; forwarded on the
    /// next tick while controls are enabled.
    pub fn set_input(&mut self, input: RoleInput) {
        self.pending_input = Some(input);
    }

    /// Sends a lobby loadout/ready edit. The host's next roster broadcast
    /// supersedes whatever we show optimistically in the meantime.
    pub fn send_lobby_update(
        &mut self,
        ready: bool,
        character_id: impl Into<String>,
        perk_ids: Vec<String>,
        now: f64,
    ) {
        let role = self.controlled_role.unwrap_or(self.preferred_role);
        let update = LobbyUpdate {
            net_id: self.you,
            role,
            ready,
            character_id: character_id.into(),
            perk_ids,
        };
        self.send(&Packet::LobbyPlayerUpdate(update), now);
    }

    /// Asks the host for a different role; the answer arrives as an
    /// `AssignRole`.
    pub fn request_role(&mut self, role: Role, now: f64) {
        self.send(&Packet::RoleChangeRequest { role }, now);
    }

    /// One frame of client work.
    pub fn tick(&mut self, sim: &mut dyn Simulation, now: f64) {
        if !self.session.state().is_active() {
            return;
        }

        if !self.handshake_done && now - self.started >= self.config.handshake_timeout {
            let reason = format!(
                "no response from {} within {:.0} s",
                self.server_addr, self.config.handshake_timeout
            );
            self.teardown();
            self.session.fail(reason);
            return;
        }

        let events = self.transport.poll(now);
        for event in events {
            match event {
                TransportEvent::Connected { .. } => {
                    self.session.transition(
                        SessionState::ClientHandshaking,
                        "transport up, introducing ourselves",
                    );
                    self.send(
                        &Packet::Hello {
                            protocol: self.config.protocol_version,
                            build: self.config.build_id.clone(),
                            role: self.preferred_role,
                            name: self.config.player_name.clone(),
                        },
                        now,
                    );
                }
                TransportEvent::ConnectFailed { refused, .. } => {
                    self.session.fail(if refused {
                        "connection refused by host".to_owned()
                    } else {
                        format!("{} did not answer", self.server_addr)
                    });
                    return;
                }
                TransportEvent::Payload { data, .. } => match decode(&data) {
                    Ok(packet) => self.handle_packet(packet, sim, now),
                    Err(err) => {
                        tracing::debug!(%err, "dropping undecodable packet");
                    }
                },
                TransportEvent::Disconnected { reason, .. } => {
                    self.handle_disconnect(reason);
                    return;
                }
            }
            if !self.session.state().is_active() {
                return;
            }
        }

        if self.controls_enabled && self.session.state() == SessionState::Connected {
            if let Some(input) = self.pending_input.take() {
                self.send(&Packet::RoleInput(input), now);
            }
        }
    }

    /// Orderly leave: tell the host goodbye and return to `Offline`.
    pub fn shutdown(&mut self) {
        self.session
            .transition(SessionState::Disconnecting, "leaving session");
        self.teardown();
        self.session.reset();
    }

    // -----------------------------------------------------------------------
    // Packet handling
    // -----------------------------------------------------------------------

    fn handle_packet(&mut self, packet: Packet, sim: &mut dyn Simulation, now: f64) {
        match packet {
            Packet::Reject { reason } => {
                tracing::warn!(reason = %reason, "host rejected us");
                self.teardown();
                self.session.fail(reason);
            }
            Packet::AssignRole { role, map, seed } => {
                self.controlled_role = Some(role);
                // Reload only when the world actually differs: map
                // identity, or the seed for the procedural map.
                let needs_load = match self.loaded_map {
                    None => true,
                    Some((loaded, loaded_seed)) => {
                        loaded != map || (map.is_procedural() && loaded_seed != seed)
                    }
                };
                if needs_load {
                    tracing::info!(%map, seed, "loading world");
                    sim.load_map(map, seed);
                    self.loaded_map = Some((map, seed));
                }
                self.complete_handshake(&format!("assigned {role}"));
            }
            Packet::LobbyState(state) => {
                self.you = state.you;
                self.roster.reconcile(&state);
                self.complete_handshake("joined lobby");
            }
            Packet::Snapshot(snapshot) => {
                self.last_snapshot_received = now;
                sim.apply_snapshot(&snapshot);
            }
            Packet::GameplayTuning(tuning) => {
                self.tuning = tuning;
                sim.apply_tuning(&tuning);
            }
            Packet::FxSpawn(fx) => sim.spawn_fx(&fx),
            Packet::LobbyPlayerJoin(player) => {
                let mut state = self.roster.as_lobby_state(self.you);
                state.players.retain(|p| p.net_id != player.net_id);
                state.players.push(player);
                self.roster.reconcile(&state);
            }
            Packet::LobbyPlayerLeave { net_id } => {
                let mut state = self.roster.as_lobby_state(self.you);
                state.players.retain(|p| p.net_id != net_id);
                self.roster.reconcile(&state);
            }
            Packet::LobbyPlayerUpdate(update) => {
                if let Err(err) = self.roster.apply_update(&update) {
                    tracing::debug!(%err, "mirror update dropped");
                }
            }
            // Host-bound packets have no meaning here.
            Packet::RoleInput(_) | Packet::Hello { .. } | Packet::RoleChangeRequest { .. } => {
                tracing::trace!(tag = packet.tag(), "ignoring packet invalid for client");
            }
        }
    }

    fn complete_handshake(&mut self, why: &str) {
        self.handshake_done = true;
        if self.session.state() != SessionState::Connected {
            self.session.transition(SessionState::Connected, why);
        }
    }

    fn handle_disconnect(&mut self, reason: DisconnectReason) {
        self.controlled_role = None;
        match reason {
            DisconnectReason::Requested => {
                self.session
                    .transition(SessionState::Offline, "host closed the session");
            }
            DisconnectReason::TimedOut => {
                self.session.fail("lost connection to host");
            }
        }
    }

    fn teardown(&mut self) {
        self.transport.disconnect_all();
        self.controlled_role = None;
        self.controls_enabled = false;
        self.pending_input = None;
    }

    fn send(&mut self, packet: &Packet, now: f64) {
        let bytes = encode(packet);
        if let Err(err) = self.transport.send_reliable(self.peer, &bytes, now) {
            tracing::debug!(%err, tag = packet.tag(), "send failed");
        }
    }
}
