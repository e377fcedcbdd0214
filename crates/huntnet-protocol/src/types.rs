//! Wire packet types.
//!
//! Everything in this module travels on the wire between host and client.
//! Variants carry only primitives, strings, and arrays — never handles or
//! pointers — so a packet can always be rebuilt byte-for-byte on the other
//! side.
//!
//! Tag bytes are stable protocol identifiers and must never be renumbered;
//! version negotiation relies on them meaning the same thing on both ends.

use std::fmt;

// ---------------------------------------------------------------------------
// Packet tags
// ---------------------------------------------------------------------------

pub const TAG_ROLE_INPUT: u8 = 1;
pub const TAG_SNAPSHOT: u8 = 2;
pub const TAG_ASSIGN_ROLE: u8 = 3;
pub const TAG_HELLO: u8 = 4;
pub const TAG_REJECT: u8 = 5;
pub const TAG_GAMEPLAY_TUNING: u8 = 6;
pub const TAG_ROLE_CHANGE_REQUEST: u8 = 7;
pub const TAG_FX_SPAWN: u8 = 8;
pub const TAG_LOBBY_STATE: u8 = 9;
pub const TAG_LOBBY_PLAYER_JOIN: u8 = 10;
pub const TAG_LOBBY_PLAYER_LEAVE: u8 = 11;
pub const TAG_LOBBY_PLAYER_UPDATE: u8 = 12;

// ---------------------------------------------------------------------------
// Roles and maps
// ---------------------------------------------------------------------------

/// Which side of the asymmetric match a player is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Role {
    #[default]
    Survivor,
    Killer,
}

impl Role {
    /// One-byte wire form.
    pub fn to_byte(self) -> u8 {
        match self {
            Role::Survivor => 0,
            Role::Killer => 1,
        }
    }

    /// Permissive inverse of [`to_byte`](Self::to_byte): anything that is
    /// not the killer byte reads as survivor, so an unknown value degrades
    /// to the common case instead of failing decode.
    pub fn from_byte(byte: u8) -> Self {
        if byte == 1 { Role::Killer } else { Role::Survivor }
    }

    /// The other role in the two-role match.
    pub fn opposite(self) -> Self {
        match self {
            Role::Survivor => Role::Killer,
            Role::Killer => Role::Survivor,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Survivor => "survivor",
            Role::Killer => "killer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of the map the session is playing on.
///
/// `Main` is the procedurally generated map: its layout is derived from the
/// session seed, so replicating `(MapKind::Main, seed)` is enough for a
/// client to rebuild the exact same world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MapKind {
    #[default]
    Test,
    Main,
    CollisionTest,
}

impl MapKind {
    pub fn to_byte(self) -> u8 {
        match self {
            MapKind::Test => 0,
            MapKind::Main => 1,
            MapKind::CollisionTest => 2,
        }
    }

    /// Unknown bytes fall back to the test map rather than failing decode.
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            1 => MapKind::Main,
            2 => MapKind::CollisionTest,
            _ => MapKind::Test,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MapKind::Test => "test",
            MapKind::Main => "main",
            MapKind::CollisionTest => "collision_test",
        }
    }

    /// Whether the map layout depends on the session seed.
    pub fn is_procedural(self) -> bool {
        matches!(self, MapKind::Main)
    }
}

impl fmt::Display for MapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Client input
// ---------------------------------------------------------------------------

/// Button bits for [`RoleInput::buttons`].
pub mod buttons {
    pub const SPRINT: u16 = 1 << 0;
    pub const INTERACT_PRESSED: u16 = 1 << 1;
    pub const INTERACT_HELD: u16 = 1 << 2;
    pub const ATTACK_PRESSED: u16 = 1 << 3;
    pub const JUMP_PRESSED: u16 = 1 << 4;
    pub const WIGGLE_LEFT_PRESSED: u16 = 1 << 5;
    pub const WIGGLE_RIGHT_PRESSED: u16 = 1 << 6;
    pub const ATTACK_HELD: u16 = 1 << 7;
    pub const ATTACK_RELEASED: u16 = 1 << 8;
    pub const CROUCH_HELD: u16 = 1 << 9;
    pub const LUNGE_HELD: u16 = 1 << 10;
}

/// One frame of client input for the controlled role.
///
/// Movement is quantized to a signed percentage so the whole packet stays a
/// handful of bytes at 60 Hz; look deltas stay float because aim precision
/// matters.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RoleInput {
    /// Strafe axis, quantized to [-100, 100].
    pub move_x: i8,
    /// Forward axis, quantized to [-100, 100].
    pub move_y: i8,
    pub look_x: f32,
    pub look_y: f32,
    /// Bitmask of [`buttons`] flags.
    pub buttons: u16,
}

impl RoleInput {
    /// Quantizes a normalized movement axis into the wire range.
    pub fn quantize_axis(value: f32) -> i8 {
        (value.clamp(-1.0, 1.0) * 100.0).round() as i8
    }

    pub fn is_down(&self, flag: u16) -> bool {
        self.buttons & flag != 0
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Pose of one replicated actor.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ActorPose {
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub velocity: [f32; 3],
    pub yaw: f32,
    pub pitch: f32,
}

/// Replicated state of one pallet.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PalletState {
    pub entity: u32,
    /// 0 = standing, 1 = dropped, 2 = broken.
    pub state: u8,
    pub break_timer: f32,
    pub position: [f32; 3],
    pub half_extents: [f32; 3],
}

/// Replicated state of one bear trap.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrapState {
    pub entity: u32,
    /// 0 = disarmed, 1 = armed, 2 = sprung.
    pub state: u8,
    pub position: [f32; 3],
}

/// Replicated item lying on the ground.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GroundItem {
    pub entity: u32,
    pub kind: u8,
    pub charges: f32,
    pub position: [f32; 3],
}

/// Full authoritative world state for one tick.
///
/// The host rebuilds this from the live simulation every tick and sends it
/// in full; the client replaces its previous copy wholesale. No deltas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub map: MapKind,
    pub seed: u32,
    pub survivor: ActorPose,
    pub killer: ActorPose,
    /// 0 = healthy, 1 = injured, 2 = downed, 3 = carried, 4 = hooked.
    pub survivor_health: u8,
    pub killer_attack_state: u8,
    pub killer_attack_timer: f32,
    pub killer_lunge_charge: f32,
    pub chase_active: bool,
    pub chase_distance: f32,
    pub chase_los: bool,
    pub generators_done: u8,
    pub pallets: Vec<PalletState>,
    pub traps: Vec<TrapState>,
    pub items: Vec<GroundItem>,
}

// ---------------------------------------------------------------------------
// Gameplay tuning
// ---------------------------------------------------------------------------

/// Authoritative gameplay scalars, replicated host → client at handshake so
/// both simulations run with identical numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameplayTuning {
    pub survivor_walk_speed: f32,
    pub survivor_sprint_speed: f32,
    pub survivor_crouch_speed: f32,
    pub killer_move_speed: f32,
    pub terror_radius_m: f32,
    pub terror_radius_chase_m: f32,
    pub vault_slow_secs: f32,
    pub vault_fast_secs: f32,
    pub short_attack_range: f32,
    pub short_attack_angle_deg: f32,
    pub lunge_duration_secs: f32,
    pub lunge_recover_secs: f32,
    pub short_recover_secs: f32,
    pub miss_recover_secs: f32,
    pub lunge_speed_start: f32,
    pub lunge_speed_end: f32,
    pub heal_duration_secs: f32,
    pub server_tick_rate: i32,
    pub interpolation_buffer_ms: i32,
}

impl Default for GameplayTuning {
    fn default() -> Self {
        Self {
            survivor_walk_speed: 2.26,
            survivor_sprint_speed: 4.0,
            survivor_crouch_speed: 1.13,
            killer_move_speed: 4.6,
            terror_radius_m: 32.0,
            terror_radius_chase_m: 40.0,
            vault_slow_secs: 1.5,
            vault_fast_secs: 0.5,
            short_attack_range: 1.8,
            short_attack_angle_deg: 60.0,
            lunge_duration_secs: 0.9,
            lunge_recover_secs: 2.7,
            short_recover_secs: 1.5,
            miss_recover_secs: 1.5,
            lunge_speed_start: 6.9,
            lunge_speed_end: 5.06,
            heal_duration_secs: 16.0,
            server_tick_rate: 60,
            interpolation_buffer_ms: 100,
        }
    }
}

// ---------------------------------------------------------------------------
// Lobby
// ---------------------------------------------------------------------------

/// One entry in the lobby roster.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbyPlayer {
    pub net_id: u32,
    pub name: String,
    pub role: Role,
    pub ready: bool,
    pub is_host: bool,
    pub connected: bool,
}

/// Full roster broadcast. `you` tells the receiving peer which entry is
/// theirs; every other peer receives the same player list with a different
/// `you`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LobbyState {
    pub you: u32,
    pub players: Vec<LobbyPlayer>,
}

/// A client's lobby edit (ready toggle, role pick, loadout change), applied
/// by the host and superseded by the next [`LobbyState`] broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyUpdate {
    pub net_id: u32,
    pub role: Role,
    pub ready: bool,
    pub character_id: String,
    pub perk_ids: Vec<String>,
}

// ---------------------------------------------------------------------------
// Fx replication
// ---------------------------------------------------------------------------

/// A fire-and-forget visual effect spawned by the authoritative simulation
/// and replayed on clients.
#[derive(Debug, Clone, PartialEq)]
pub struct FxSpawn {
    pub asset_id: String,
    pub position: [f32; 3],
    pub forward: [f32; 3],
    pub mode: u8,
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Every message that travels over the game transport, decoded once into a
/// closed set of variants and matched exhaustively by the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    /// Client → host: latest sampled input for the controlled role.
    RoleInput(RoleInput),
    /// Host → client: full world state for one tick.
    Snapshot(Snapshot),
    /// Host → client: the role, map, and seed this client should run.
    AssignRole { role: Role, map: MapKind, seed: u32 },
    /// Client → host: handshake opener.
    Hello {
        protocol: i32,
        build: String,
        role: Role,
        name: String,
    },
    /// Host → client: handshake refused; always carries a readable reason.
    Reject { reason: String },
    /// Host → client: authoritative gameplay scalars.
    GameplayTuning(GameplayTuning),
    /// Client → host: please switch my role.
    RoleChangeRequest { role: Role },
    /// Host → client: replicated visual effect.
    FxSpawn(FxSpawn),
    /// Host → client: full roster broadcast.
    LobbyState(LobbyState),
    /// Host → client: a player entered the lobby.
    LobbyPlayerJoin(LobbyPlayer),
    /// Host → client: a player left the lobby.
    LobbyPlayerLeave { net_id: u32 },
    /// Client → host: lobby edit by one player.
    LobbyPlayerUpdate(LobbyUpdate),
}

impl Packet {
    /// The stable one-byte tag written first on the wire.
    pub fn tag(&self) -> u8 {
        match self {
            Packet::RoleInput(_) => TAG_ROLE_INPUT,
            Packet::Snapshot(_) => TAG_SNAPSHOT,
            Packet::AssignRole { .. } => TAG_ASSIGN_ROLE,
            Packet::Hello { .. } => TAG_HELLO,
            Packet::Reject { .. } => TAG_REJECT,
            Packet::GameplayTuning(_) => TAG_GAMEPLAY_TUNING,
            Packet::RoleChangeRequest { .. } => TAG_ROLE_CHANGE_REQUEST,
            Packet::FxSpawn(_) => TAG_FX_SPAWN,
            Packet::LobbyState(_) => TAG_LOBBY_STATE,
            Packet::LobbyPlayerJoin(_) => TAG_LOBBY_PLAYER_JOIN,
            Packet::LobbyPlayerLeave { .. } => TAG_LOBBY_PLAYER_LEAVE,
            Packet::LobbyPlayerUpdate(_) => TAG_LOBBY_PLAYER_UPDATE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_byte_mapping_is_permissive() {
        assert_eq!(Role::from_byte(1), Role::Killer);
        assert_eq!(Role::from_byte(0), Role::Survivor);
        // Unknown bytes read as survivor instead of failing.
        assert_eq!(Role::from_byte(200), Role::Survivor);
    }

    #[test]
    fn role_opposite() {
        assert_eq!(Role::Survivor.opposite(), Role::Killer);
        assert_eq!(Role::Killer.opposite(), Role::Survivor);
    }

    #[test]
    fn map_kind_byte_round_trip() {
        for map in [MapKind::Test, MapKind::Main, MapKind::CollisionTest] {
            assert_eq!(MapKind::from_byte(map.to_byte()), map);
        }
        assert_eq!(MapKind::from_byte(99), MapKind::Test);
    }

    #[test]
    fn only_main_map_is_procedural() {
        assert!(MapKind::Main.is_procedural());
        assert!(!MapKind::Test.is_procedural());
        assert!(!MapKind::CollisionTest.is_procedural());
    }

    #[test]
    fn axis_quantization_clamps_and_rounds() {
        assert_eq!(RoleInput::quantize_axis(1.0), 100);
        assert_eq!(RoleInput::quantize_axis(-1.5), -100);
        assert_eq!(RoleInput::quantize_axis(0.504), 50);
        assert_eq!(RoleInput::quantize_axis(0.0), 0);
    }

    #[test]
    fn button_flags_are_distinct() {
        let all = [
            buttons::SPRINT,
            buttons::INTERACT_PRESSED,
            buttons::INTERACT_HELD,
            buttons::ATTACK_PRESSED,
            buttons::JUMP_PRESSED,
            buttons::WIGGLE_LEFT_PRESSED,
            buttons::WIGGLE_RIGHT_PRESSED,
            buttons::ATTACK_HELD,
            buttons::ATTACK_RELEASED,
            buttons::CROUCH_HELD,
            buttons::LUNGE_HELD,
        ];
        let mut seen = 0u16;
        for flag in all {
            assert_eq!(seen & flag, 0, "flag {flag:#06x} overlaps");
            seen |= flag;
        }
    }
}
