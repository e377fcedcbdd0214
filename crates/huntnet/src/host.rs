//! The authoritative session host.

use std::collections::HashMap;

use rand::Rng;

use huntnet_discovery::{Discovery, HostInfo};
use huntnet_lobby::Roster;
use huntnet_protocol::{
    FxSpawn, GameplayTuning, MapKind, Packet, Role, RoleInput, decode, encode,
};
use huntnet_session::{SessionMachine, SessionState};
use huntnet_transport::{Endpoint, PeerId, TransportEvent};

use crate::binding::PlayerBinding;
use crate::config::NetConfig;
use crate::error::HuntnetError;
use crate::simulation::Simulation;

/// Runs the authoritative side of a session: accepts handshakes, owns the
/// roster, fans out snapshots, and feeds client input into the simulation.
///
/// Single-threaded and poll-driven: the game loop calls
/// [`tick`](HostCoordinator::tick) once per frame with the current time in
/// seconds and the coordinator does everything inside that call.
pub struct HostCoordinator {
    config: NetConfig,
    session: SessionMachine,
    transport: Endpoint,
    /// `None` when the discovery socket could not be opened; the session
    /// still works for clients that know the address.
    discovery: Option<Discovery>,
    roster: Roster,
    tuning: GameplayTuning,
    map: MapKind,
    seed: u32,
    local_net_id: u32,
    /// Peers that completed the application handshake.
    bindings: HashMap<PeerId, PlayerBinding>,
    /// Transport-connected peers still owing a `Hello`, by deadline.
    pending: HashMap<PeerId, f64>,
    /// Latest input per peer; drained once per tick.
    latest_inputs: HashMap<PeerId, RoleInput>,
    /// Visual effects queued for replication this tick.
    pending_fx: Vec<FxSpawn>,
    last_snapshot: f64,
}

impl HostCoordinator {
    /// Binds the transport and discovery sockets, seeds the procedural
    /// map, and admits the local player. Returns `Err` when the transport
    /// cannot bind — hosting either works or reports why it does not.
    pub fn start(
        config: NetConfig,
        map: MapKind,
        local_role: Role,
        now: f64,
    ) -> Result<Self, HuntnetError> {
        let mut session = SessionMachine::new();
        session.transition(SessionState::HostStarting, "binding sockets");

        let transport = match Endpoint::host(
            ("0.0.0.0", config.game_port),
            config.transport_config(),
        ) {
            Ok(transport) => transport,
            Err(err) => {
                session.fail(format!("could not bind port {}: {err}", config.game_port));
                return Err(err.into());
            }
        };

        let seed: u32 = rand::rng().random();
        let mut roster = Roster::new(config.lobby_config());
        let local_net_id = roster.admit(config.player_name.clone(), local_role, true)?;

        let info = HostInfo {
            host_name: config.player_name.clone(),
            map_name: map.name().to_owned(),
            players: roster.len() as i32,
            max_players: config.max_players() as i32,
            preferred_ip: String::new(),
        };
        let discovery = match Discovery::host(
            config.discovery_port,
            config.game_port,
            info,
            config.protocol_version,
            config.build_id.clone(),
        ) {
            Ok(discovery) => Some(discovery),
            Err(err) => {
                // Not fatal: direct-address joins still work.
                tracing::warn!(%err, port = config.discovery_port, "discovery unavailable");
                None
            }
        };

        session.transition(
            SessionState::HostListening,
            format!("lobby open on port {}", config.game_port),
        );
        tracing::info!(map = %map, seed, "host session started");

        Ok(Self {
            config,
            session,
            transport,
            discovery,
            roster,
            tuning: GameplayTuning::default(),
            map,
            seed,
            local_net_id,
            bindings: HashMap::new(),
            pending: HashMap::new(),
            latest_inputs: HashMap::new(),
            pending_fx: Vec::new(),
            last_snapshot: now,
        })
    }

    pub fn session(&self) -> &SessionMachine {
        &self.session
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn local_net_id(&self) -> u32 {
        self.local_net_id
    }

    pub fn map(&self) -> MapKind {
        self.map
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn tuning(&self) -> &GameplayTuning {
        &self.tuning
    }

    pub fn binding(&self, peer: PeerId) -> Option<&PlayerBinding> {
        self.bindings.get(&peer)
    }

    /// Replaces the authoritative tuning and replicates it immediately.
    pub fn set_tuning(&mut self, tuning: GameplayTuning, now: f64) {
        self.tuning = tuning;
        self.broadcast(&Packet::GameplayTuning(self.tuning), now);
    }

    /// Queues a visual effect for replication on the next tick.
    pub fn queue_fx(&mut self, fx: FxSpawn) {
        self.pending_fx.push(fx);
    }

    /// Moves the local player to `role` and rebroadcasts the roster.
    pub fn set_local_role(&mut self, role: Role, now: f64) -> Result<(), HuntnetError> {
        self.roster.request_role(self.local_net_id, role)?;
        self.broadcast_roster(now);
        Ok(())
    }

    /// One frame of host work: drain transport events, enforce handshake
    /// deadlines, apply inputs, broadcast snapshots and effects, keep the
    /// discovery announcement fresh.
    pub fn tick(&mut self, sim: &mut dyn Simulation, now: f64) {
        let events = self.transport.poll(now);
        for event in events {
            match event {
                TransportEvent::Connected { peer, addr } => {
                    tracing::debug!(%peer, %addr, "awaiting hello");
                    self.pending
                        .insert(peer, now + self.config.handshake_timeout);
                }
                TransportEvent::Payload { peer, data } => match decode(&data) {
                    Ok(packet) => self.handle_packet(peer, packet, now),
                    Err(err) => {
                        tracing::debug!(%peer, %err, "dropping undecodable packet");
                    }
                },
                TransportEvent::Disconnected { peer, reason } => {
                    self.pending.remove(&peer);
                    self.handle_leave(peer, now, &format!("{reason:?}"));
                }
                TransportEvent::ConnectFailed { .. } => {}
            }
        }

        self.expire_pending(now);
        self.apply_inputs(sim, now);
        self.broadcast_snapshot(sim, now);
        self.replicate_fx(now);

        if let Some(discovery) = &mut self.discovery {
            discovery.update_host_info(
                self.map.name(),
                self.roster.len() as i32,
                self.config.max_players() as i32,
                None,
            );
            discovery.tick(now);
        }
    }

    /// Orderly teardown: tells every peer goodbye, closes discovery, and
    /// returns the machine to `Offline`.
    pub fn shutdown(&mut self) {
        self.session
            .transition(SessionState::Disconnecting, "host shutting down");
        self.transport.disconnect_all();
        self.discovery = None;
        self.bindings.clear();
        self.pending.clear();
        self.latest_inputs.clear();
        self.session.reset();
    }

    // -----------------------------------------------------------------------
    // Packet handling
    // -----------------------------------------------------------------------

    fn handle_packet(&mut self, peer: PeerId, packet: Packet, now: f64) {
        match packet {
            Packet::Hello {
                protocol,
                build,
                role,
                name,
            } => self.handle_hello(peer, protocol, &build, role, &name, now),
            Packet::RoleInput(input) => {
                if let Some(binding) = self.bindings.get_mut(&peer) {
                    binding.last_input_seconds = now;
                    self.latest_inputs.insert(peer, input);
                }
            }
            Packet::RoleChangeRequest { role } => self.handle_role_change(peer, role, now),
            Packet::LobbyPlayerUpdate(update) => {
                let Some(binding) = self.bindings.get(&peer) else {
                    return;
                };
                let net_id = binding.net_id;
                if update.net_id != net_id {
                    tracing::debug!(%peer, claimed = update.net_id, "update for foreign net id");
                    return;
                }
                match self.roster.apply_update(&update) {
                    Ok(()) => {
                        if let Some(binding) = self.bindings.get_mut(&peer) {
                            binding.selected_role = update.role;
                            binding.controlled_role = update.role;
                        }
                        self.broadcast(&Packet::LobbyPlayerUpdate(update), now);
                    }
                    Err(err) => {
                        tracing::debug!(%peer, %err, "lobby update refused");
                        // Corrective state so the sender's optimistic UI
                        // snaps back.
                        let state = self.roster.as_lobby_state(net_id);
                        self.send(peer, &Packet::LobbyState(state), now);
                    }
                }
            }
            // Clients never originate these; ignore rather than reject so
            // a confused peer cannot wedge the host.
            Packet::Snapshot(_)
            | Packet::AssignRole { .. }
            | Packet::Reject { .. }
            | Packet::GameplayTuning(_)
            | Packet::FxSpawn(_)
            | Packet::LobbyState(_)
            | Packet::LobbyPlayerJoin(_)
            | Packet::LobbyPlayerLeave { .. } => {
                tracing::trace!(%peer, tag = packet.tag(), "ignoring packet invalid for host");
            }
        }
    }

    fn handle_hello(
        &mut self,
        peer: PeerId,
        protocol: i32,
        build: &str,
        role: Role,
        name: &str,
        now: f64,
    ) {
        self.pending.remove(&peer);
        if self.bindings.contains_key(&peer) {
            // Duplicate hello after a lost reply; the reliable layer will
            // redeliver our original answers.
            return;
        }

        if protocol != self.config.protocol_version || build != self.config.build_id {
            let reason = format!(
                "Version mismatch: client {protocol}/{build}, server {}/{}",
                self.config.protocol_version, self.config.build_id
            );
            tracing::warn!(%peer, %reason, "handshake rejected");
            self.send(peer, &Packet::Reject { reason }, now);
            let _ = self.transport.disconnect(peer);
            return;
        }

        let net_id = match self.roster.admit(name, role, false) {
            Ok(net_id) => net_id,
            Err(err) => {
                tracing::warn!(%peer, %err, "handshake refused");
                self.send(
                    peer,
                    &Packet::Reject {
                        reason: err.to_string(),
                    },
                    now,
                );
                let _ = self.transport.disconnect(peer);
                return;
            }
        };

        self.bindings
            .insert(peer, PlayerBinding::new(net_id, name, role, false));

        // Joiner gets the full picture; everyone else just the delta.
        let state = self.roster.as_lobby_state(net_id);
        self.send(peer, &Packet::LobbyState(state), now);
        if let Some(joined) = self.roster.get(net_id).cloned() {
            let join = Packet::LobbyPlayerJoin(joined);
            let others: Vec<PeerId> = self
                .bindings
                .keys()
                .copied()
                .filter(|p| *p != peer)
                .collect();
            for other in others {
                self.send(other, &join, now);
            }
        }
        self.send(peer, &Packet::GameplayTuning(self.tuning), now);
        self.send(
            peer,
            &Packet::AssignRole {
                role,
                map: self.map,
                seed: self.seed,
            },
            now,
        );

        if self.session.state() == SessionState::HostListening {
            self.session
                .transition(SessionState::Connected, format!("{name} joined"));
        }
        tracing::info!(%peer, net_id, name = %name, %role, "client joined");
    }

    fn handle_role_change(&mut self, peer: PeerId, role: Role, now: f64) {
        let Some(binding) = self.bindings.get(&peer) else {
            return;
        };
        let net_id = binding.net_id;
        let answer = match self.roster.request_role(net_id, role) {
            Ok(()) => {
                if let Some(binding) = self.bindings.get_mut(&peer) {
                    binding.selected_role = role;
                    binding.controlled_role = role;
                }
                role
            }
            Err(err) => {
                tracing::debug!(%peer, %err, "role change denied");
                // Answer with the role they still hold; an assignment is a
                // statement of fact, not an apology.
                match self.roster.get(net_id) {
                    Some(player) => player.role,
                    None => return,
                }
            }
        };
        self.send(
            peer,
            &Packet::AssignRole {
                role: answer,
                map: self.map,
                seed: self.seed,
            },
            now,
        );
        self.broadcast_roster(now);
    }

    fn handle_leave(&mut self, peer: PeerId, now: f64, why: &str) {
        self.latest_inputs.remove(&peer);
        let Some(binding) = self.bindings.remove(&peer) else {
            return;
        };
        tracing::info!(%peer, net_id = binding.net_id, name = %binding.name, why, "client left");
        if self.roster.remove(binding.net_id).is_ok() {
            self.broadcast(
                &Packet::LobbyPlayerLeave {
                    net_id: binding.net_id,
                },
                now,
            );
            self.broadcast_roster(now);
        }
        if self.bindings.is_empty() && self.session.state() == SessionState::Connected {
            self.session
                .transition(SessionState::HostListening, "all clients left");
        }
    }

    // -----------------------------------------------------------------------
    // Per-tick work
    // -----------------------------------------------------------------------

    fn expire_pending(&mut self, now: f64) {
        let expired: Vec<PeerId> = self
            .pending
            .iter()
            .filter(|&(_, &deadline)| now >= deadline)
            .map(|(&peer, _)| peer)
            .collect();
        for peer in expired {
            self.pending.remove(&peer);
            tracing::warn!(%peer, "no hello before deadline, dropping");
            let _ = self.transport.disconnect(peer);
        }
    }

    fn apply_inputs(&mut self, sim: &mut dyn Simulation, now: f64) {
        for (peer, binding) in &mut self.bindings {
            match self.latest_inputs.remove(peer) {
                Some(input) => {
                    binding.last_input_seconds = now;
                    sim.apply_role_input(binding.controlled_role, &input);
                }
                None => sim.clear_role_input(binding.controlled_role),
            }
        }
        self.latest_inputs.clear();
    }

    fn broadcast_snapshot(&mut self, sim: &mut dyn Simulation, now: f64) {
        if self.bindings.is_empty() || now - self.last_snapshot < self.config.snapshot_interval {
            return;
        }
        self.last_snapshot = now;
        let mut snapshot = sim.build_snapshot();
        // The session, not the simulation, is the authority on world
        // identity.
        snapshot.map = self.map;
        snapshot.seed = self.seed;
        self.broadcast(&Packet::Snapshot(snapshot), now);
        for binding in self.bindings.values_mut() {
            binding.last_snapshot_seconds = now;
        }
    }

    fn replicate_fx(&mut self, now: f64) {
        if self.pending_fx.is_empty() {
            return;
        }
        let queued = std::mem::take(&mut self.pending_fx);
        for fx in queued {
            self.broadcast(&Packet::FxSpawn(fx), now);
        }
    }

    // -----------------------------------------------------------------------
    // Send helpers
    // -----------------------------------------------------------------------

    fn send(&mut self, peer: PeerId, packet: &Packet, now: f64) {
        let bytes = encode(packet);
        if let Err(err) = self.transport.send_reliable(peer, &bytes, now) {
            tracing::warn!(%peer, %err, tag = packet.tag(), "send failed");
        }
    }

    fn broadcast(&mut self, packet: &Packet, now: f64) {
        let bytes = encode(packet);
        if let Err(err) = self.transport.broadcast_reliable(&bytes, now) {
            tracing::warn!(%err, tag = packet.tag(), "broadcast failed");
        }
    }

    /// Rebroadcasts the roster, addressed per recipient so each client
    /// sees its own net id in `you`.
    fn broadcast_roster(&mut self, now: f64) {
        let targets: Vec<(PeerId, u32)> = self
            .bindings
            .iter()
            .map(|(&peer, binding)| (peer, binding.net_id))
            .collect();
        for (peer, net_id) in targets {
            let state = self.roster.as_lobby_state(net_id);
            self.send(peer, &Packet::LobbyState(state), now);
        }
    }
}
