//! Per-connection player bookkeeping.

use huntnet_protocol::Role;

/// What the host remembers about one connected player.
///
/// Bindings exist only while the connection does; they are created when a
/// handshake is accepted and dropped on disconnect, so stale ownership of
/// a role never lingers past the peer that held it.
#[derive(Debug, Clone)]
pub struct PlayerBinding {
    pub net_id: u32,
    pub name: String,
    pub is_host: bool,
    pub connected: bool,
    /// Role the player asked for in the lobby.
    pub selected_role: Role,
    /// Role the player actually drives in the simulation.
    pub controlled_role: Role,
    /// Injected clock value when input last arrived.
    pub last_input_seconds: f64,
    /// Injected clock value when a snapshot was last sent (host) or
    /// received (client).
    pub last_snapshot_seconds: f64,
}

impl PlayerBinding {
    pub fn new(net_id: u32, name: impl Into<String>, role: Role, is_host: bool) -> Self {
        Self {
            net_id,
            name: name.into(),
            is_host,
            connected: true,
            selected_role: role,
            controlled_role: role,
            last_input_seconds: 0.0,
            last_snapshot_seconds: 0.0,
        }
    }
}
