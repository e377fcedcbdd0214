//! The crate-level error type.

use huntnet_discovery::DiscoveryError;
use huntnet_lobby::LobbyError;
use huntnet_protocol::WireError;
use huntnet_transport::TransportError;

/// Any failure the coordinator can surface to its caller.
///
/// Each layer keeps its own error enum; this type exists so coordinator
/// entry points can propagate all of them with `?` and callers match on
/// one type.
#[derive(Debug, thiserror::Error)]
pub enum HuntnetError {
    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Lobby(#[from] LobbyError),

    /// The join target could not be parsed into a socket address.
    #[error("invalid address {0:?}")]
    InvalidAddress(String),

    /// Reading the config file failed.
    #[error("config read failed: {0}")]
    ConfigRead(#[source] std::io::Error),

    /// The config file is not valid JSON for [`NetConfig`](crate::NetConfig).
    #[error("config parse failed: {0}")]
    ConfigParse(#[from] serde_json::Error),
}
