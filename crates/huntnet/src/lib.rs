//! # Huntnet
//!
//! LAN session layer for an asymmetric-horror multiplayer game: one
//! authoritative host, up to four survivors and one killer, talking a
//! compact hand-rolled binary protocol over reliable UDP, with plain-text
//! broadcast discovery on the side.
//!
//! This crate is the coordinator tier. The layers below it each live in
//! their own crate and know nothing about each other:
//!
//! ```text
//! game loop ── HostCoordinator / ClientCoordinator (this crate)
//!                  │ packets            │ lifecycle        │ roster
//!            huntnet-protocol    huntnet-session     huntnet-lobby
//!                  │
//!            huntnet-transport        huntnet-discovery
//!                  └── one UDP socket ──┘ (a second one)
//! ```
//!
//! Gameplay plugs in through the [`Simulation`] trait; the coordinators
//! never simulate anything themselves. Everything is single-threaded and
//! poll-driven: call `tick(sim, now)` once per frame with seconds on a
//! monotonic clock.
//!
//! ## Hosting
//!
//! ```rust,no_run
//! use huntnet::{HostCoordinator, NetConfig};
//! use huntnet_protocol::{MapKind, Role};
//!
//! # fn run(sim: &mut dyn huntnet::Simulation) -> Result<(), huntnet::HuntnetError> {
//! let mut host = HostCoordinator::start(NetConfig::default(), MapKind::Main, Role::Killer, 0.0)?;
//! loop {
//!     // let now = ...seconds since startup;
//! #   let now = 0.0;
//!     host.tick(sim, now);
//! }
//! # }
//! ```

mod binding;
mod client;
mod config;
mod error;
mod host;
mod simulation;

pub use binding::PlayerBinding;
pub use client::ClientCoordinator;
pub use config::NetConfig;
pub use error::HuntnetError;
pub use host::HostCoordinator;
pub use simulation::Simulation;

/// One-stop imports for a game embedding Huntnet.
pub mod prelude {
    pub use crate::{
        ClientCoordinator, HostCoordinator, HuntnetError, NetConfig, PlayerBinding, Simulation,
    };
    pub use huntnet_discovery::{Discovery, ServerAdvertisement};
    pub use huntnet_protocol::{
        FxSpawn, GameplayTuning, MapKind, Packet, Role, RoleInput, Snapshot, buttons,
    };
    pub use huntnet_session::SessionState;
}
