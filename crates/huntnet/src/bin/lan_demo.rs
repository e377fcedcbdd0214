//! Minimal LAN demo: host a lobby, scan for one, or join one.
//!
//! ```text
//! lan_demo host              # host on the default ports
//! lan_demo scan              # list hosts seen on the LAN for a few seconds
//! lan_demo join 192.168.1.10 # join a host directly
//! ```
//!
//! The "game" is a stub simulation that just logs what the network hands
//! it, which is enough to watch a full handshake and snapshot stream.

use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use huntnet::prelude::*;
use huntnet_discovery::{DEFAULT_DISCOVERY_PORT, Discovery};

/// Simulation stub: logs instead of simulating.
struct LogSim;

impl Simulation for LogSim {
    fn build_snapshot(&mut self) -> Snapshot {
        Snapshot::default()
    }

    fn apply_snapshot(&mut self, snapshot: &Snapshot) {
        tracing::debug!(generators = snapshot.generators_done, "snapshot applied");
    }

    fn apply_role_input(&mut self, role: Role, input: &RoleInput) {
        if input.buttons != 0 {
            tracing::debug!(%role, buttons = input.buttons, "input");
        }
    }

    fn clear_role_input(&mut self, _role: Role) {}

    fn apply_tuning(&mut self, tuning: &GameplayTuning) {
        tracing::info!(tick_rate = tuning.server_tick_rate, "tuning applied");
    }

    fn load_map(&mut self, map: MapKind, seed: u32) {
        tracing::info!(%map, seed, "map loaded");
    }

    fn spawn_fx(&mut self, fx: &FxSpawn) {
        tracing::info!(asset = %fx.asset_id, "fx");
    }
}

fn main() -> Result<(), HuntnetError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = NetConfig::default();
    match args.get(1).map(String::as_str) {
        Some("host") => run_host(config),
        Some("scan") => run_scan(config),
        Some("join") => {
            let Some(ip) = args.get(2) else {
                eprintln!("usage: lan_demo join <ip>");
                return Ok(());
            };
            run_join(config, ip)
        }
        _ => {
            eprintln!("usage: lan_demo host | scan | join <ip>");
            Ok(())
        }
    }
}

fn now_source() -> impl Fn() -> f64 {
    let start = Instant::now();
    move || start.elapsed().as_secs_f64()
}

fn run_host(config: NetConfig) -> Result<(), HuntnetError> {
    let now = now_source();
    let mut sim = LogSim;
    let mut host = HostCoordinator::start(config, MapKind::Main, Role::Killer, now())?;
    tracing::info!(seed = host.seed(), "hosting; ctrl-c to stop");
    loop {
        host.tick(&mut sim, now());
        std::thread::sleep(Duration::from_millis(16));
    }
}

fn run_scan(config: NetConfig) -> Result<(), HuntnetError> {
    let now = now_source();
    let mut discovery = Discovery::client(
        DEFAULT_DISCOVERY_PORT,
        config.protocol_version,
        config.build_id.clone(),
    )?;
    while now() < 5.0 {
        discovery.tick(now());
        std::thread::sleep(Duration::from_millis(100));
    }
    if discovery.servers().is_empty() {
        println!("no hosts found");
    }
    for server in discovery.servers() {
        println!(
            "{} at {}:{} ({}/{} players, map {}, {})",
            server.host_name,
            server.ip,
            server.port,
            server.players,
            server.max_players,
            server.map_name,
            if server.compatible { "compatible" } else { "incompatible" },
        );
    }
    Ok(())
}

fn run_join(config: NetConfig, ip: &str) -> Result<(), HuntnetError> {
    let now = now_source();
    let mut sim = LogSim;
    let port = config.game_port;
    let mut client = ClientCoordinator::start(config, ip, port, Role::Survivor, now())?;
    loop {
        client.tick(&mut sim, now());
        let state = client.session().state();
        if state == SessionState::Error {
            eprintln!("failed: {}", client.session().reason());
            return Ok(());
        }
        if state == SessionState::Offline {
            return Ok(());
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}
