use huntnet_protocol::Role;

/// Errors that can occur while mutating the lobby roster.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LobbyError {
    /// Every slot for the requested role is taken.
    ///
    /// The message ends up verbatim in the reject reason shown to the
    /// joining player, so it must say "full".
    #[error("{0} slots are full")]
    RoleFull(Role),

    /// The net id does not name anyone in the roster.
    #[error("no player with net id {0}")]
    UnknownPlayer(u32),
}
