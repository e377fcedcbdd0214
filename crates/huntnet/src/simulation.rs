//! The seam between networking and gameplay.

use huntnet_protocol::{FxSpawn, GameplayTuning, MapKind, Role, RoleInput, Snapshot};

/// What the coordinator needs from the game it synchronizes.
///
/// The coordinator never simulates anything itself: on the host it pulls
/// snapshots out and pushes inputs in, on a client the other way around.
/// Gameplay code implements this trait and stays free of any networking
/// types beyond the wire structs.
pub trait Simulation {
    /// Host side: capture the authoritative world state for broadcast.
    /// The coordinator overwrites the map/seed fields with the session's.
    fn build_snapshot(&mut self) -> Snapshot;

    /// Client side: adopt the host's world state.
    fn apply_snapshot(&mut self, snapshot: &Snapshot);

    /// Host side: feed one remote player's input into the role they
    /// control. At most one call per role per tick.
    fn apply_role_input(&mut self, role: Role, input: &RoleInput);

    /// Host side: the role's player sent nothing this tick (or left);
    /// treat the controls as released.
    fn clear_role_input(&mut self, role: Role);

    /// Adopt authoritative gameplay scalars.
    fn apply_tuning(&mut self, tuning: &GameplayTuning);

    /// Rebuild the world for `map`. For the procedural map the layout is a
    /// pure function of `seed`, which is how clients end up in an
    /// identical world without geometry replication.
    fn load_map(&mut self, map: MapKind, seed: u32);

    /// Play a replicated visual effect.
    fn spawn_fx(&mut self, fx: &FxSpawn);
}
