//! The client-side list of hosts seen on the LAN.

/// One discovered host, as shown in a server browser.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerAdvertisement {
    pub host_name: String,
    pub ip: String,
    pub port: u16,
    pub map_name: String,
    pub players: i32,
    pub max_players: i32,
    pub protocol_version: i32,
    pub build_id: String,
    /// Whether this build can actually join: protocol and build both match.
    pub compatible: bool,
    /// Injected clock value when the last response arrived.
    pub last_seen: f64,
}

/// Deduplicated, time-limited set of advertisements.
///
/// Keyed by `(ip, port)`: a host re-announcing itself refreshes its entry
/// in place, preserving list order so the browser UI does not shuffle.
#[derive(Debug, Default)]
pub struct Registry {
    entries: Vec<ServerAdvertisement>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&mut self, entry: ServerAdvertisement) {
        if let Some(existing) = self
            .entries
            .iter_mut()
            .find(|e| e.ip == entry.ip && e.port == entry.port)
        {
            *existing = entry;
        } else {
            tracing::debug!(
                host = %entry.host_name,
                ip = %entry.ip,
                port = entry.port,
                compatible = entry.compatible,
                "discovered host"
            );
            self.entries.push(entry);
        }
    }

    /// Drops entries not heard from within `ttl` seconds.
    pub fn prune(&mut self, now: f64, ttl: f64) {
        self.entries.retain(|e| now - e.last_seen <= ttl);
    }

    pub fn servers(&self) -> &[ServerAdvertisement] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ip: &str, port: u16, name: &str, last_seen: f64) -> ServerAdvertisement {
        ServerAdvertisement {
            host_name: name.into(),
            ip: ip.into(),
            port,
            map_name: "main_map".into(),
            players: 1,
            max_players: 5,
            protocol_version: 1,
            build_id: "dev".into(),
            compatible: true,
            last_seen,
        }
    }

    #[test]
    fn test_upsert_replaces_matching_endpoint() {
        let mut registry = Registry::new();
        registry.upsert(entry("10.0.0.2", 7777, "old name", 1.0));
        registry.upsert(entry("10.0.0.2", 7777, "new name", 2.0));
        assert_eq!(registry.servers().len(), 1);
        assert_eq!(registry.servers()[0].host_name, "new name");
        assert_eq!(registry.servers()[0].last_seen, 2.0);
    }

    #[test]
    fn test_same_ip_different_port_is_a_second_entry() {
        let mut registry = Registry::new();
        registry.upsert(entry("10.0.0.2", 7777, "a", 1.0));
        registry.upsert(entry("10.0.0.2", 7778, "b", 1.0));
        assert_eq!(registry.servers().len(), 2);
    }

    #[test]
    fn test_upsert_preserves_list_order() {
        let mut registry = Registry::new();
        registry.upsert(entry("10.0.0.2", 7777, "first", 1.0));
        registry.upsert(entry("10.0.0.3", 7777, "second", 1.0));
        registry.upsert(entry("10.0.0.2", 7777, "first again", 2.0));
        assert_eq!(registry.servers()[0].host_name, "first again");
        assert_eq!(registry.servers()[1].host_name, "second");
    }

    #[test]
    fn test_prune_drops_only_stale_entries() {
        let mut registry = Registry::new();
        registry.upsert(entry("10.0.0.2", 7777, "stale", 1.0));
        registry.upsert(entry("10.0.0.3", 7777, "fresh", 4.0));
        registry.prune(5.0, 3.5);
        assert_eq!(registry.servers().len(), 1);
        assert_eq!(registry.servers()[0].host_name, "fresh");
    }

    #[test]
    fn test_entry_seen_exactly_at_ttl_survives() {
        let mut registry = Registry::new();
        registry.upsert(entry("10.0.0.2", 7777, "edge", 0.0));
        registry.prune(3.5, 3.5);
        assert_eq!(registry.servers().len(), 1);
    }
}
