//! Binary encode/decode for [`Packet`].
//!
//! Layout rules, applied uniformly:
//!
//! - the 1-byte tag comes first, then fields in a fixed order;
//! - integers and floats are fixed width, native byte order;
//! - strings are a `u16` byte length followed by raw bytes, truncated (not
//!   rejected) to a per-field cap at encode time;
//! - lists are a `u16` count followed by fixed-layout records, count capped
//!   at encode time and re-checked at decode time.
//!
//! Decoding goes through [`WireReader`], a cursor that fails closed: any
//! read past the end of the buffer returns [`WireError::UnexpectedEnd`]
//! instead of indexing out of range. Decode is pure — allocation only, no
//! I/O — and a malformed buffer can never panic the process.

use crate::error::WireError;
use crate::types::*;

/// Encode-time caps. These are hard limits, not errors: a legitimate but
/// over-long value is silently shortened on the wire.
pub const MAX_NAME_LEN: usize = 64;
pub const MAX_BUILD_LEN: usize = 255;
pub const MAX_REASON_LEN: usize = 512;
pub const MAX_ASSET_LEN: usize = 4096;
/// Cap on snapshot list counts (pallets, traps, ground items).
pub const MAX_LIST_LEN: usize = 1024;
/// Cap on the lobby roster length.
pub const MAX_LOBBY_PLAYERS: usize = 64;
/// Cap on perk ids carried by one lobby update.
pub const MAX_PERKS: usize = 8;

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// Append-only byte buffer for packet encoding.
#[derive(Debug, Default)]
pub struct WireWriter {
    buf: Vec<u8>,
}

impl WireWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_i8(&mut self, value: i8) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_ne_bytes());
    }

    pub fn put_bool(&mut self, value: bool) {
        self.put_u8(u8::from(value));
    }

    pub fn put_vec3(&mut self, value: [f32; 3]) {
        for component in value {
            self.put_f32(component);
        }
    }

    /// Writes a length-prefixed string, truncating to `cap` bytes on a
    /// character boundary.
    pub fn put_str(&mut self, value: &str, cap: usize) {
        let bytes = truncate_to_boundary(value, cap);
        self.put_u16(bytes.len() as u16);
        self.buf.extend_from_slice(bytes);
    }

    /// Writes a list count, clamped to `cap`. The caller then writes that
    /// many records.
    pub fn put_count(&mut self, len: usize, cap: usize) -> usize {
        let count = len.min(cap);
        self.put_u16(count as u16);
        count
    }
}

/// Largest prefix of `value` that is at most `cap` bytes and ends on a
/// UTF-8 character boundary.
fn truncate_to_boundary(value: &str, cap: usize) -> &[u8] {
    if value.len() <= cap {
        return value.as_bytes();
    }
    let mut end = cap;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    &value.as_bytes()[..end]
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

/// Bounds-checked cursor over a received buffer.
#[derive(Debug)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        if len > self.remaining() {
            return Err(WireError::UnexpectedEnd);
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take(1)?[0])
    }

    pub fn get_i8(&mut self) -> Result<i8, WireError> {
        Ok(i8::from_ne_bytes([self.take(1)?[0]]))
    }

    pub fn get_u16(&mut self) -> Result<u16, WireError> {
        let bytes = self.take(2)?;
        Ok(u16::from_ne_bytes([bytes[0], bytes[1]]))
    }

    pub fn get_u32(&mut self) -> Result<u32, WireError> {
        let bytes = self.take(4)?;
        Ok(u32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_i32(&mut self) -> Result<i32, WireError> {
        let bytes = self.take(4)?;
        Ok(i32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_f32(&mut self) -> Result<f32, WireError> {
        let bytes = self.take(4)?;
        Ok(f32::from_ne_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn get_bool(&mut self) -> Result<bool, WireError> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_vec3(&mut self) -> Result<[f32; 3], WireError> {
        Ok([self.get_f32()?, self.get_f32()?, self.get_f32()?])
    }

    /// Reads a length-prefixed string. Invalid UTF-8 is replaced rather
    /// than rejected — string content is display data, not protocol
    /// structure.
    pub fn get_str(&mut self) -> Result<String, WireError> {
        let len = self.get_u16()? as usize;
        let bytes = self.take(len)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads a list count and re-validates it against the cap before any
    /// allocation happens.
    pub fn get_count(&mut self, cap: usize) -> Result<usize, WireError> {
        let len = self.get_u16()? as usize;
        if len > cap {
            return Err(WireError::OversizedList { len, max: cap });
        }
        Ok(len)
    }

    /// Asserts the whole buffer was consumed.
    pub fn finish(self) -> Result<(), WireError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(WireError::TrailingBytes(n)),
        }
    }
}

// ---------------------------------------------------------------------------
// Encode
// ---------------------------------------------------------------------------

/// Encodes a packet into its wire form. Never fails; over-long fields are
/// truncated per the caps above.
pub fn encode(packet: &Packet) -> Vec<u8> {
    let mut w = WireWriter::with_capacity(64);
    w.put_u8(packet.tag());

    match packet {
        Packet::RoleInput(input) => {
            w.put_i8(input.move_x);
            w.put_i8(input.move_y);
            w.put_f32(input.look_x);
            w.put_f32(input.look_y);
            w.put_u16(input.buttons);
        }
        Packet::Snapshot(snapshot) => encode_snapshot(&mut w, snapshot),
        Packet::AssignRole { role, map, seed } => {
            w.put_u8(role.to_byte());
            w.put_u8(map.to_byte());
            w.put_u32(*seed);
        }
        Packet::Hello {
            protocol,
            build,
            role,
            name,
        } => {
            w.put_i32(*protocol);
            w.put_str(build, MAX_BUILD_LEN);
            w.put_u8(role.to_byte());
            w.put_str(name, MAX_NAME_LEN);
        }
        Packet::Reject { reason } => {
            w.put_str(reason, MAX_REASON_LEN);
        }
        Packet::GameplayTuning(tuning) => encode_tuning(&mut w, tuning),
        Packet::RoleChangeRequest { role } => {
            w.put_u8(role.to_byte());
        }
        Packet::FxSpawn(fx) => {
            w.put_str(&fx.asset_id, MAX_ASSET_LEN);
            w.put_vec3(fx.position);
            w.put_vec3(fx.forward);
            w.put_u8(fx.mode);
        }
        Packet::LobbyState(state) => {
            w.put_u32(state.you);
            let count = w.put_count(state.players.len(), MAX_LOBBY_PLAYERS);
            for player in &state.players[..count] {
                encode_lobby_player(&mut w, player);
            }
        }
        Packet::LobbyPlayerJoin(player) => encode_lobby_player(&mut w, player),
        Packet::LobbyPlayerLeave { net_id } => {
            w.put_u32(*net_id);
        }
        Packet::LobbyPlayerUpdate(update) => {
            w.put_u32(update.net_id);
            w.put_u8(update.role.to_byte());
            w.put_bool(update.ready);
            w.put_str(&update.character_id, MAX_NAME_LEN);
            let count = w.put_count(update.perk_ids.len(), MAX_PERKS);
            for perk in &update.perk_ids[..count] {
                w.put_str(perk, MAX_NAME_LEN);
            }
        }
    }

    w.into_bytes()
}

fn encode_actor(w: &mut WireWriter, actor: &ActorPose) {
    w.put_vec3(actor.position);
    w.put_vec3(actor.forward);
    w.put_vec3(actor.velocity);
    w.put_f32(actor.yaw);
    w.put_f32(actor.pitch);
}

fn encode_snapshot(w: &mut WireWriter, snapshot: &Snapshot) {
    w.put_u8(snapshot.map.to_byte());
    w.put_u32(snapshot.seed);
    encode_actor(w, &snapshot.survivor);
    encode_actor(w, &snapshot.killer);
    w.put_u8(snapshot.survivor_health);
    w.put_u8(snapshot.killer_attack_state);
    w.put_f32(snapshot.killer_attack_timer);
    w.put_f32(snapshot.killer_lunge_charge);
    w.put_bool(snapshot.chase_active);
    w.put_f32(snapshot.chase_distance);
    w.put_bool(snapshot.chase_los);
    w.put_u8(snapshot.generators_done);

    let count = w.put_count(snapshot.pallets.len(), MAX_LIST_LEN);
    for pallet in &snapshot.pallets[..count] {
        w.put_u32(pallet.entity);
        w.put_u8(pallet.state);
        w.put_f32(pallet.break_timer);
        w.put_vec3(pallet.position);
        w.put_vec3(pallet.half_extents);
    }

    let count = w.put_count(snapshot.traps.len(), MAX_LIST_LEN);
    for trap in &snapshot.traps[..count] {
        w.put_u32(trap.entity);
        w.put_u8(trap.state);
        w.put_vec3(trap.position);
    }

    let count = w.put_count(snapshot.items.len(), MAX_LIST_LEN);
    for item in &snapshot.items[..count] {
        w.put_u32(item.entity);
        w.put_u8(item.kind);
        w.put_f32(item.charges);
        w.put_vec3(item.position);
    }
}

fn encode_tuning(w: &mut WireWriter, tuning: &GameplayTuning) {
    w.put_f32(tuning.survivor_walk_speed);
    w.put_f32(tuning.survivor_sprint_speed);
    w.put_f32(tuning.survivor_crouch_speed);
    w.put_f32(tuning.killer_move_speed);
    w.put_f32(tuning.terror_radius_m);
    w.put_f32(tuning.terror_radius_chase_m);
    w.put_f32(tuning.vault_slow_secs);
    w.put_f32(tuning.vault_fast_secs);
    w.put_f32(tuning.short_attack_range);
    w.put_f32(tuning.short_attack_angle_deg);
    w.put_f32(tuning.lunge_duration_secs);
    w.put_f32(tuning.lunge_recover_secs);
    w.put_f32(tuning.short_recover_secs);
    w.put_f32(tuning.miss_recover_secs);
    w.put_f32(tuning.lunge_speed_start);
    w.put_f32(tuning.lunge_speed_end);
    w.put_f32(tuning.heal_duration_secs);
    w.put_i32(tuning.server_tick_rate);
    w.put_i32(tuning.interpolation_buffer_ms);
}

fn encode_lobby_player(w: &mut WireWriter, player: &LobbyPlayer) {
    w.put_u32(player.net_id);
    w.put_str(&player.name, MAX_NAME_LEN);
    w.put_u8(player.role.to_byte());
    w.put_bool(player.ready);
    w.put_bool(player.is_host);
    w.put_bool(player.connected);
}

// ---------------------------------------------------------------------------
// Decode
// ---------------------------------------------------------------------------

/// Decodes a received buffer into a packet.
///
/// Fails on the empty buffer, an unknown tag, any length that overruns the
/// remaining bytes, an over-cap list count, or trailing bytes after the
/// body. Never panics.
pub fn decode(buf: &[u8]) -> Result<Packet, WireError> {
    let mut r = WireReader::new(buf);
    let tag = r.get_u8()?;

    let packet = match tag {
        TAG_ROLE_INPUT => Packet::RoleInput(RoleInput {
            move_x: r.get_i8()?,
            move_y: r.get_i8()?,
            look_x: r.get_f32()?,
            look_y: r.get_f32()?,
            buttons: r.get_u16()?,
        }),
        TAG_SNAPSHOT => Packet::Snapshot(decode_snapshot(&mut r)?),
        TAG_ASSIGN_ROLE => Packet::AssignRole {
            role: Role::from_byte(r.get_u8()?),
            map: MapKind::from_byte(r.get_u8()?),
            seed: r.get_u32()?,
        },
        TAG_HELLO => Packet::Hello {
            protocol: r.get_i32()?,
            build: r.get_str()?,
            role: Role::from_byte(r.get_u8()?),
            name: r.get_str()?,
        },
        TAG_REJECT => Packet::Reject {
            reason: r.get_str()?,
        },
        TAG_GAMEPLAY_TUNING => Packet::GameplayTuning(decode_tuning(&mut r)?),
        TAG_ROLE_CHANGE_REQUEST => Packet::RoleChangeRequest {
            role: Role::from_byte(r.get_u8()?),
        },
        TAG_FX_SPAWN => Packet::FxSpawn(FxSpawn {
            asset_id: r.get_str()?,
            position: r.get_vec3()?,
            forward: r.get_vec3()?,
            mode: r.get_u8()?,
        }),
        TAG_LOBBY_STATE => {
            let you = r.get_u32()?;
            let count = r.get_count(MAX_LOBBY_PLAYERS)?;
            let mut players = Vec::with_capacity(count);
            for _ in 0..count {
                players.push(decode_lobby_player(&mut r)?);
            }
            Packet::LobbyState(LobbyState { you, players })
        }
        TAG_LOBBY_PLAYER_JOIN => Packet::LobbyPlayerJoin(decode_lobby_player(&mut r)?),
        TAG_LOBBY_PLAYER_LEAVE => Packet::LobbyPlayerLeave {
            net_id: r.get_u32()?,
        },
        TAG_LOBBY_PLAYER_UPDATE => {
            let net_id = r.get_u32()?;
            let role = Role::from_byte(r.get_u8()?);
            let ready = r.get_bool()?;
            let character_id = r.get_str()?;
            let count = r.get_count(MAX_PERKS)?;
            let mut perk_ids = Vec::with_capacity(count);
            for _ in 0..count {
                perk_ids.push(r.get_str()?);
            }
            Packet::LobbyPlayerUpdate(LobbyUpdate {
                net_id,
                role,
                ready,
                character_id,
                perk_ids,
            })
        }
        other => return Err(WireError::UnknownTag(other)),
    };

    r.finish()?;
    Ok(packet)
}

fn decode_actor(r: &mut WireReader<'_>) -> Result<ActorPose, WireError> {
    Ok(ActorPose {
        position: r.get_vec3()?,
        forward: r.get_vec3()?,
        velocity: r.get_vec3()?,
        yaw: r.get_f32()?,
        pitch: r.get_f32()?,
    })
}

fn decode_snapshot(r: &mut WireReader<'_>) -> Result<Snapshot, WireError> {
    let map = MapKind::from_byte(r.get_u8()?);
    let seed = r.get_u32()?;
    let survivor = decode_actor(r)?;
    let killer = decode_actor(r)?;
    let survivor_health = r.get_u8()?;
    let killer_attack_state = r.get_u8()?;
    let killer_attack_timer = r.get_f32()?;
    let killer_lunge_charge = r.get_f32()?;
    let chase_active = r.get_bool()?;
    let chase_distance = r.get_f32()?;
    let chase_los = r.get_bool()?;
    let generators_done = r.get_u8()?;

    let count = r.get_count(MAX_LIST_LEN)?;
    let mut pallets = Vec::with_capacity(count);
    for _ in 0..count {
        pallets.push(PalletState {
            entity: r.get_u32()?,
            state: r.get_u8()?,
            break_timer: r.get_f32()?,
            position: r.get_vec3()?,
            half_extents: r.get_vec3()?,
        });
    }

    let count = r.get_count(MAX_LIST_LEN)?;
    let mut traps = Vec::with_capacity(count);
    for _ in 0..count {
        traps.push(TrapState {
            entity: r.get_u32()?,
            state: r.get_u8()?,
            position: r.get_vec3()?,
        });
    }

    let count = r.get_count(MAX_LIST_LEN)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(GroundItem {
            entity: r.get_u32()?,
            kind: r.get_u8()?,
            charges: r.get_f32()?,
            position: r.get_vec3()?,
        });
    }

    Ok(Snapshot {
        map,
        seed,
        survivor,
        killer,
        survivor_health,
        killer_attack_state,
        killer_attack_timer,
        killer_lunge_charge,
        chase_active,
        chase_distance,
        chase_los,
        generators_done,
        pallets,
        traps,
        items,
    })
}

fn decode_tuning(r: &mut WireReader<'_>) -> Result<GameplayTuning, WireError> {
    Ok(GameplayTuning {
        survivor_walk_speed: r.get_f32()?,
        survivor_sprint_speed: r.get_f32()?,
        survivor_crouch_speed: r.get_f32()?,
        killer_move_speed: r.get_f32()?,
        terror_radius_m: r.get_f32()?,
        terror_radius_chase_m: r.get_f32()?,
        vault_slow_secs: r.get_f32()?,
        vault_fast_secs: r.get_f32()?,
        short_attack_range: r.get_f32()?,
        short_attack_angle_deg: r.get_f32()?,
        lunge_duration_secs: r.get_f32()?,
        lunge_recover_secs: r.get_f32()?,
        short_recover_secs: r.get_f32()?,
        miss_recover_secs: r.get_f32()?,
        lunge_speed_start: r.get_f32()?,
        lunge_speed_end: r.get_f32()?,
        heal_duration_secs: r.get_f32()?,
        server_tick_rate: r.get_i32()?,
        interpolation_buffer_ms: r.get_i32()?,
    })
}

fn decode_lobby_player(r: &mut WireReader<'_>) -> Result<LobbyPlayer, WireError> {
    Ok(LobbyPlayer {
        net_id: r.get_u32()?,
        name: r.get_str()?,
        role: Role::from_byte(r.get_u8()?),
        ready: r.get_bool()?,
        is_host: r.get_bool()?,
        connected: r.get_bool()?,
    })
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_player(net_id: u32) -> LobbyPlayer {
        LobbyPlayer {
            net_id,
            name: format!("player-{net_id}"),
            role: Role::Survivor,
            ready: false,
            is_host: net_id == 1,
            connected: true,
        }
    }

    fn sample_snapshot() -> Snapshot {
        Snapshot {
            map: MapKind::Main,
            seed: 42,
            survivor: ActorPose {
                position: [1.0, 2.0, 3.0],
                forward: [0.0, 0.0, 1.0],
                velocity: [0.5, 0.0, -0.5],
                yaw: 90.0,
                pitch: -10.0,
            },
            killer: ActorPose {
                position: [-4.0, 0.0, 8.0],
                ..ActorPose::default()
            },
            survivor_health: 1,
            killer_attack_state: 2,
            killer_attack_timer: 0.4,
            killer_lunge_charge: 0.75,
            chase_active: true,
            chase_distance: 6.5,
            chase_los: false,
            generators_done: 3,
            pallets: vec![PalletState {
                entity: 17,
                state: 1,
                break_timer: 1.5,
                position: [10.0, 0.0, -2.0],
                half_extents: [0.8, 1.0, 0.2],
            }],
            traps: vec![TrapState {
                entity: 31,
                state: 1,
                position: [3.0, 0.0, 3.0],
            }],
            items: vec![GroundItem {
                entity: 55,
                kind: 2,
                charges: 24.0,
                position: [0.0, 0.5, 0.0],
            }],
        }
    }

    fn all_variants() -> Vec<Packet> {
        vec![
            Packet::RoleInput(RoleInput {
                move_x: -100,
                move_y: 100,
                look_x: 1.25,
                look_y: -0.5,
                buttons: buttons::SPRINT | buttons::ATTACK_HELD,
            }),
            Packet::Snapshot(sample_snapshot()),
            Packet::AssignRole {
                role: Role::Killer,
                map: MapKind::Main,
                seed: 1337,
            },
            Packet::Hello {
                protocol: 1,
                build: "dev-2026-02-09".into(),
                role: Role::Survivor,
                name: "Ash".into(),
            },
            Packet::Reject {
                reason: "Version mismatch: client 0/old, server 1/dev".into(),
            },
            Packet::GameplayTuning(GameplayTuning::default()),
            Packet::RoleChangeRequest { role: Role::Killer },
            Packet::FxSpawn(FxSpawn {
                asset_id: "fx/blood_spray".into(),
                position: [1.0, 1.5, 1.0],
                forward: [0.0, 0.0, -1.0],
                mode: 1,
            }),
            Packet::LobbyState(LobbyState {
                you: 2,
                players: vec![sample_player(1), sample_player(2)],
            }),
            Packet::LobbyPlayerJoin(sample_player(3)),
            Packet::LobbyPlayerLeave { net_id: 3 },
            Packet::LobbyPlayerUpdate(LobbyUpdate {
                net_id: 2,
                role: Role::Survivor,
                ready: true,
                character_id: "meg".into(),
                perk_ids: vec!["sprint_burst".into(), "adrenaline".into()],
            }),
        ]
    }

    #[test]
    fn every_variant_round_trips() {
        for packet in all_variants() {
            let bytes = encode(&packet);
            assert_eq!(bytes[0], packet.tag());
            let decoded = decode(&bytes).expect("decode failed");
            assert_eq!(decoded, packet);
        }
    }

    #[test]
    fn empty_buffer_fails() {
        assert_eq!(decode(&[]), Err(WireError::UnexpectedEnd));
    }

    #[test]
    fn tag_only_buffer_fails_for_every_variant() {
        for packet in all_variants() {
            let result = decode(&[packet.tag()]);
            assert_eq!(
                result,
                Err(WireError::UnexpectedEnd),
                "tag {} accepted an empty body",
                packet.tag()
            );
        }
    }

    #[test]
    fn truncated_buffers_fail_for_every_variant() {
        // Chop one byte at a time off every encoded variant. Each prefix
        // must yield an error, never a packet (and never a panic).
        for packet in all_variants() {
            let bytes = encode(&packet);
            for len in 0..bytes.len() {
                assert!(
                    decode(&bytes[..len]).is_err(),
                    "tag {} decoded from a {}-byte prefix of {}",
                    packet.tag(),
                    len,
                    bytes.len()
                );
            }
        }
    }

    #[test]
    fn unknown_tag_fails() {
        assert_eq!(decode(&[0]), Err(WireError::UnknownTag(0)));
        assert_eq!(decode(&[13, 1, 2, 3]), Err(WireError::UnknownTag(13)));
        assert_eq!(decode(&[255]), Err(WireError::UnknownTag(255)));
    }

    #[test]
    fn declared_length_past_end_fails() {
        // Reject with a reason length of 512 but only 3 bytes of content.
        let mut w = WireWriter::new();
        w.put_u8(TAG_REJECT);
        w.put_u16(512);
        let mut bytes = w.into_bytes();
        bytes.extend_from_slice(b"abc");
        assert_eq!(decode(&bytes), Err(WireError::UnexpectedEnd));
    }

    #[test]
    fn oversized_list_count_fails_before_allocation() {
        let mut bytes = encode(&Packet::Snapshot(Snapshot::default()));
        // The first list count sits right before the end; rewrite it to an
        // absurd value with no records following.
        let count_offset = bytes.len() - 6;
        bytes[count_offset..count_offset + 2].copy_from_slice(&u16::MAX.to_ne_bytes());
        assert_eq!(
            decode(&bytes),
            Err(WireError::OversizedList {
                len: u16::MAX as usize,
                max: MAX_LIST_LEN,
            })
        );
    }

    #[test]
    fn corrupted_tag_is_a_decode_error_not_a_misread() {
        // A snapshot whose tag byte is flipped to AssignRole must fail
        // decode instead of having its body misread as AssignRole fields.
        let mut bytes = encode(&Packet::Snapshot(sample_snapshot()));
        bytes[0] = TAG_ASSIGN_ROLE;
        let result = decode(&bytes);
        assert!(
            matches!(result, Err(WireError::TrailingBytes(_))),
            "expected trailing-bytes error, got {result:?}"
        );
    }

    #[test]
    fn long_strings_truncate_at_the_cap() {
        let long_name = "x".repeat(MAX_NAME_LEN + 50);
        let packet = Packet::Hello {
            protocol: 1,
            build: "b".repeat(MAX_BUILD_LEN + 1),
            role: Role::Survivor,
            name: long_name,
        };
        let decoded = decode(&encode(&packet)).unwrap();
        match decoded {
            Packet::Hello { build, name, .. } => {
                assert_eq!(name.len(), MAX_NAME_LEN);
                assert_eq!(build.len(), MAX_BUILD_LEN);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn exactly_cap_length_string_survives_untouched() {
        let reason = "r".repeat(MAX_REASON_LEN);
        let packet = Packet::Reject {
            reason: reason.clone(),
        };
        let decoded = decode(&encode(&packet)).unwrap();
        assert_eq!(decoded, Packet::Reject { reason });
    }

    #[test]
    fn multibyte_string_truncates_on_char_boundary() {
        // 'é' is two bytes; an odd cap must not split it.
        let name = "é".repeat(MAX_NAME_LEN);
        let packet = Packet::Hello {
            protocol: 1,
            build: "dev".into(),
            role: Role::Killer,
            name,
        };
        let decoded = decode(&encode(&packet)).unwrap();
        match decoded {
            Packet::Hello { name, .. } => {
                assert_eq!(name.len(), MAX_NAME_LEN);
                assert!(name.chars().all(|c| c == 'é'));
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn max_length_snapshot_lists_round_trip() {
        let mut snapshot = sample_snapshot();
        snapshot.pallets = (0..MAX_LIST_LEN as u32)
            .map(|i| PalletState {
                entity: i,
                state: (i % 3) as u8,
                break_timer: i as f32 * 0.01,
                position: [i as f32, 0.0, -(i as f32)],
                half_extents: [0.8, 1.0, 0.2],
            })
            .collect();
        snapshot.traps.clear();
        snapshot.items.clear();

        let packet = Packet::Snapshot(snapshot);
        assert_eq!(decode(&encode(&packet)).unwrap(), packet);
    }

    #[test]
    fn over_cap_snapshot_list_truncates_on_encode() {
        let mut snapshot = Snapshot::default();
        snapshot.pallets = vec![PalletState::default(); MAX_LIST_LEN + 10];
        let decoded = decode(&encode(&Packet::Snapshot(snapshot))).unwrap();
        match decoded {
            Packet::Snapshot(s) => assert_eq!(s.pallets.len(), MAX_LIST_LEN),
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn trailing_garbage_fails_for_every_variant() {
        for packet in all_variants() {
            let mut bytes = encode(&packet);
            bytes.push(0xAA);
            assert_eq!(
                decode(&bytes),
                Err(WireError::TrailingBytes(1)),
                "tag {} tolerated trailing bytes",
                packet.tag()
            );
        }
    }

    #[test]
    fn random_garbage_never_panics() {
        // Deterministic pseudo-random buffers; decode may fail or (rarely)
        // succeed, it just must not panic or over-allocate.
        let mut state = 0x2545F491_u32;
        for len in 0..256 {
            let mut buf = Vec::with_capacity(len);
            for _ in 0..len {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                buf.push((state >> 24) as u8);
            }
            let _ = decode(&buf);
        }
    }
}
