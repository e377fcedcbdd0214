//! Wire protocol for Huntnet.
//!
//! This crate defines the "language" that hosts and clients speak:
//!
//! - **Types** ([`Packet`], [`RoleInput`], [`Snapshot`], etc.) — the
//!   message structures that travel on the wire.
//! - **Codec** ([`encode`], [`decode`]) — how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`WireError`]) — what can go wrong during decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw datagrams) and session
//! (connection lifecycle). It doesn't know about sockets or lobbies —
//! it only knows how to serialize and deserialize messages.
//!
//! ```text
//! Transport (bytes) → Protocol (Packet) → Session / Lobby (game context)
//! ```
//!
//! The format is hand-rolled binary: a 1-byte tag, then fixed-width
//! fields in native byte order. Tags are stable across versions — new
//! packet kinds take new tags, existing tags never change meaning.

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod error;
mod types;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{
    MAX_ASSET_LEN, MAX_BUILD_LEN, MAX_LIST_LEN, MAX_LOBBY_PLAYERS, MAX_NAME_LEN, MAX_PERKS,
    MAX_REASON_LEN, WireReader, WireWriter, decode, encode,
};
pub use error::WireError;
pub use types::{
    ActorPose, FxSpawn, GameplayTuning, GroundItem, LobbyPlayer, LobbyState, LobbyUpdate, MapKind,
    Packet, PalletState, Role, RoleInput, Snapshot, TrapState, buttons, TAG_ASSIGN_ROLE,
    TAG_FX_SPAWN, TAG_GAMEPLAY_TUNING, TAG_HELLO, TAG_LOBBY_PLAYER_JOIN, TAG_LOBBY_PLAYER_LEAVE,
    TAG_LOBBY_PLAYER_UPDATE, TAG_LOBBY_STATE, TAG_REJECT, TAG_ROLE_CHANGE_REQUEST, TAG_ROLE_INPUT,
    TAG_SNAPSHOT,
};

/// Protocol version spoken by this build. Bumped on any wire-incompatible
/// change; peers with different versions refuse each other at handshake.
pub const PROTOCOL_VERSION: i32 = 1;
