//! The plain-text discovery messages.
//!
//! Discovery traffic is deliberately human-readable: `|`-delimited
//! `key=value` pairs behind a fixed prefix, so a stray `tcpdump` shows
//! exactly what is on the LAN. Parsing is tolerant — unknown keys are
//! ignored, missing or unparsable values fall back to defaults, and key
//! lookup is case-insensitive.

pub const REQUEST_PREFIX: &str = "DISCOVER_REQUEST";
pub const RESPONSE_PREFIX: &str = "DISCOVER_RESPONSE";

pub const DEFAULT_GAME_PORT: u16 = 7777;
pub const DEFAULT_MAP_NAME: &str = "main_map";

/// Builds the client's scan request.
pub fn request_payload(protocol_version: i32, build_id: &str) -> String {
    format!("{REQUEST_PREFIX}|protocol={protocol_version}|build={build_id}")
}

/// What a host announces about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub host_name: String,
    /// The address clients should dial. May be empty, in which case the
    /// receiver substitutes the datagram's source address.
    pub ip: String,
    pub port: u16,
    pub map_name: String,
    pub players: i32,
    pub max_players: i32,
    pub protocol_version: i32,
    pub build_id: String,
}

impl Announcement {
    pub fn to_payload(&self) -> String {
        format!(
            "{RESPONSE_PREFIX}|name={}|ip={}|port={}|map={}|players={}|max={}|protocol={}|build={}",
            self.host_name,
            self.ip,
            self.port,
            self.map_name,
            self.players,
            self.max_players,
            self.protocol_version,
            self.build_id,
        )
    }

    /// Parses a response payload. Returns `None` only when the prefix is
    /// wrong; every field individually falls back to a sane default.
    pub fn parse(payload: &str) -> Option<Self> {
        if !payload.starts_with(RESPONSE_PREFIX) {
            return None;
        }
        let port = parse_int_field(payload, "port", i64::from(DEFAULT_GAME_PORT)).max(1);
        let map_name = match field(payload, "map") {
            Some(map) if !map.is_empty() => map.to_owned(),
            _ => DEFAULT_MAP_NAME.to_owned(),
        };
        Some(Self {
            host_name: field(payload, "name").unwrap_or_default().to_owned(),
            ip: field(payload, "ip").unwrap_or_default().to_owned(),
            port: u16::try_from(port).unwrap_or(DEFAULT_GAME_PORT),
            map_name,
            players: parse_int_field(payload, "players", 1).max(0) as i32,
            max_players: parse_int_field(payload, "max", 2).max(1) as i32,
            protocol_version: parse_int_field(payload, "protocol", 1) as i32,
            build_id: field(payload, "build").unwrap_or_default().to_owned(),
        })
    }
}

pub fn is_request(payload: &str) -> bool {
    payload.starts_with(REQUEST_PREFIX)
}

/// Finds `|key=` case-insensitively and returns the value (original
/// casing) up to the next `|` or the end of the payload.
pub fn field<'a>(payload: &'a str, key: &str) -> Option<&'a str> {
    let token = format!("|{}=", key.to_ascii_lowercase());
    let lower = payload.to_ascii_lowercase();
    let begin = lower.find(&token)?;
    let value_start = begin + token.len();
    let value_end = payload[value_start..]
        .find('|')
        .map_or(payload.len(), |off| value_start + off);
    Some(&payload[value_start..value_end])
}

fn parse_int_field(payload: &str, key: &str, fallback: i64) -> i64 {
    field(payload, key)
        .and_then(|text| text.trim().parse::<i64>().ok())
        .unwrap_or(fallback)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Announcement {
        Announcement {
            host_name: "Basement".into(),
            ip: "192.168.1.10".into(),
            port: 7777,
            map_name: "main_map".into(),
            players: 2,
            max_players: 5,
            protocol_version: 1,
            build_id: "dev".into(),
        }
    }

    #[test]
    fn test_request_payload_shape() {
        assert_eq!(
            request_payload(1, "dev"),
            "DISCOVER_REQUEST|protocol=1|build=dev"
        );
        assert!(is_request(&request_payload(1, "dev")));
    }

    #[test]
    fn test_announcement_round_trips() {
        let parsed = Announcement::parse(&sample().to_payload()).unwrap();
        assert_eq!(parsed, sample());
    }

    #[test]
    fn test_wrong_prefix_is_rejected() {
        assert_eq!(Announcement::parse("DISCOVER_REQUEST|protocol=1"), None);
        assert_eq!(Announcement::parse("garbage"), None);
    }

    #[test]
    fn test_field_lookup_is_case_insensitive() {
        let payload = "DISCOVER_RESPONSE|Name=Attic|PORT=8000";
        assert_eq!(field(payload, "name"), Some("Attic"));
        assert_eq!(field(payload, "NAME"), Some("Attic"));
        let parsed = Announcement::parse(payload).unwrap();
        assert_eq!(parsed.host_name, "Attic");
        assert_eq!(parsed.port, 8000);
    }

    #[test]
    fn test_missing_fields_fall_back_to_defaults() {
        let parsed = Announcement::parse("DISCOVER_RESPONSE|name=Bare").unwrap();
        assert_eq!(parsed.port, DEFAULT_GAME_PORT);
        assert_eq!(parsed.map_name, DEFAULT_MAP_NAME);
        assert_eq!(parsed.players, 1);
        assert_eq!(parsed.max_players, 2);
        assert_eq!(parsed.protocol_version, 1);
        assert_eq!(parsed.build_id, "");
    }

    #[test]
    fn test_unparsable_numbers_fall_back() {
        let parsed =
            Announcement::parse("DISCOVER_RESPONSE|port=many|players=-3|max=zero").unwrap();
        assert_eq!(parsed.port, DEFAULT_GAME_PORT);
        // Negative counts clamp rather than propagate.
        assert_eq!(parsed.players, 0);
        assert_eq!(parsed.max_players, 2);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let parsed =
            Announcement::parse("DISCOVER_RESPONSE|name=X|color=red|port=7001").unwrap();
        assert_eq!(parsed.host_name, "X");
        assert_eq!(parsed.port, 7001);
    }

    #[test]
    fn test_empty_map_falls_back() {
        let parsed = Announcement::parse("DISCOVER_RESPONSE|map=|name=X").unwrap();
        assert_eq!(parsed.map_name, DEFAULT_MAP_NAME);
    }
}
