//! Network configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use huntnet_lobby::LobbyConfig;
use huntnet_transport::TransportConfig;

use crate::error::HuntnetError;

/// Everything the coordinator needs to open a session.
///
/// Loadable from a JSON file so a LAN party can agree on ports without
/// rebuilding; every field has a default, so a partial file (or none at
/// all) works.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// UDP port the host's game transport listens on.
    pub game_port: u16,
    /// UDP port the discovery protocol broadcasts on.
    pub discovery_port: u16,
    /// Wire protocol version; mismatching peers refuse each other.
    pub protocol_version: i32,
    /// Build identifier compared verbatim at handshake.
    pub build_id: String,
    /// Display name announced to the lobby.
    pub player_name: String,
    /// Seconds a client waits for an accepted handshake before giving up.
    pub handshake_timeout: f64,
    /// Seconds between snapshot broadcasts on the host.
    pub snapshot_interval: f64,
    pub max_survivors: usize,
    pub max_killers: usize,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            game_port: 7777,
            discovery_port: 7778,
            protocol_version: huntnet_protocol::PROTOCOL_VERSION,
            build_id: "dev".to_owned(),
            player_name: "player".to_owned(),
            handshake_timeout: 8.0,
            snapshot_interval: 0.05,
            max_survivors: 4,
            max_killers: 1,
        }
    }
}

impl NetConfig {
    /// Loads a config from a JSON file. Missing fields fall back to
    /// defaults; a missing file is an error (pass `Default::default()`
    /// when no file is expected).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HuntnetError> {
        let text = std::fs::read_to_string(path).map_err(HuntnetError::ConfigRead)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn max_players(&self) -> usize {
        self.max_survivors + self.max_killers
    }

    pub fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig {
            max_survivors: self.max_survivors,
            max_killers: self.max_killers,
        }
    }

    /// Transport limits derived from the lobby shape: one peer slot per
    /// remote player (the host itself is not a transport peer).
    pub fn transport_config(&self) -> TransportConfig {
        TransportConfig {
            max_peers: self.max_players().saturating_sub(1),
            connect_timeout: self.handshake_timeout,
            ..TransportConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_the_protocol() {
        let config = NetConfig::default();
        assert_eq!(config.game_port, 7777);
        assert_eq!(config.discovery_port, 7778);
        assert_eq!(config.protocol_version, 1);
        assert_eq!(config.handshake_timeout, 8.0);
        assert_eq!(config.max_players(), 5);
    }

    #[test]
    fn test_partial_json_fills_in_defaults() {
        let config: NetConfig = serde_json::from_str(r#"{"game_port": 9000}"#).unwrap();
        assert_eq!(config.game_port, 9000);
        assert_eq!(config.discovery_port, 7778);
        assert_eq!(config.build_id, "dev");
    }

    #[test]
    fn test_transport_config_leaves_a_slot_per_client() {
        let config = NetConfig::default();
        assert_eq!(config.transport_config().max_peers, 4);
        assert_eq!(config.transport_config().connect_timeout, 8.0);
    }

    #[test]
    fn test_round_trips_through_json() {
        let config = NetConfig::default();
        let text = serde_json::to_string(&config).unwrap();
        let back: NetConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.game_port, config.game_port);
        assert_eq!(back.player_name, config.player_name);
    }
}
