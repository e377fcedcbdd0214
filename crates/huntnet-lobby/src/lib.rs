//! Lobby roster management for Huntnet.
//!
//! The lobby is where players gather before a match: pick a role, a
//! character, perks, and ready up. This crate owns the [`Roster`] — the
//! single authoritative list of who is in the lobby — and enforces the
//! asymmetric capacity rules (by default four survivors and one killer):
//!
//! 1. **Admission** — joining players get a fresh unique net id, or a
//!    refusal when their role is full.
//! 2. **Role exclusivity** — every role change is re-validated, so two
//!    players can never both hold the killer slot.
//! 3. **Replication** — the host serializes the roster as a
//!    [`LobbyState`](huntnet_protocol::LobbyState) broadcast; clients
//!    [`reconcile`](Roster::reconcile) their mirror from it wholesale.
//!
//! The roster never touches sockets; the coordinator wires it to the
//! transport.

mod error;
mod roster;

pub use error::LobbyError;
pub use roster::{LobbyConfig, Roster};
