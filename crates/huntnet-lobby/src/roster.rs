//! The host-authoritative player roster.

use huntnet_protocol::{LobbyPlayer, LobbyState, LobbyUpdate, Role};

use crate::error::LobbyError;

// ---------------------------------------------------------------------------
// LobbyConfig
// ---------------------------------------------------------------------------

/// Role capacities for one lobby.
///
/// These are protocol-level invariants, not UI preferences: the roster
/// refuses any operation that would overfill a role, so every replicated
/// [`LobbyState`] satisfies them by construction.
#[derive(Debug, Clone, Copy)]
pub struct LobbyConfig {
    pub max_survivors: usize,
    pub max_killers: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            max_survivors: 4,
            max_killers: 1,
        }
    }
}

impl LobbyConfig {
    pub fn max_players(&self) -> usize {
        self.max_survivors + self.max_killers
    }

    fn capacity(&self, role: Role) -> usize {
        match role {
            Role::Survivor => self.max_survivors,
            Role::Killer => self.max_killers,
        }
    }
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

/// One lobby slot: the replicated player record plus host-side extras
/// that only travel in [`LobbyUpdate`]s.
#[derive(Debug, Clone, Default)]
struct Slot {
    player: LobbyPlayer,
    character_id: String,
    perk_ids: Vec<String>,
}

/// Ordered player list plus the net-id counter.
///
/// The host owns the only authoritative roster; clients hold a mirror fed
/// by [`reconcile`](Roster::reconcile). Join order is preserved so every
/// machine renders the lobby in the same order.
#[derive(Debug, Default)]
pub struct Roster {
    config: LobbyConfig,
    slots: Vec<Slot>,
    next_net_id: u32,
}

impl Roster {
    pub fn new(config: LobbyConfig) -> Self {
        Self {
            config,
            slots: Vec::new(),
            next_net_id: 1,
        }
    }

    pub fn config(&self) -> LobbyConfig {
        self.config
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn count_role(&self, role: Role) -> usize {
        self.slots.iter().filter(|s| s.player.role == role).count()
    }

    pub fn is_role_full(&self, role: Role) -> bool {
        self.count_role(role) >= self.config.capacity(role)
    }

    pub fn get(&self, net_id: u32) -> Option<&LobbyPlayer> {
        self.slot(net_id).map(|s| &s.player)
    }

    pub fn players(&self) -> impl Iterator<Item = &LobbyPlayer> {
        self.slots.iter().map(|s| &s.player)
    }

    /// Adds a player under a fresh unique net id.
    pub fn admit(
        &mut self,
        name: impl Into<String>,
        role: Role,
        is_host: bool,
    ) -> Result<u32, LobbyError> {
        if self.is_role_full(role) {
            return Err(LobbyError::RoleFull(role));
        }
        let net_id = self.next_net_id;
        self.next_net_id += 1;
        let name = name.into();
        tracing::info!(net_id, name = %name, %role, is_host, "player admitted");
        self.slots.push(Slot {
            player: LobbyPlayer {
                net_id,
                name,
                role,
                ready: false,
                is_host,
                connected: true,
            },
            character_id: String::new(),
            perk_ids: Vec::new(),
        });
        Ok(net_id)
    }

    /// Removes a player. The net id is never reused.
    pub fn remove(&mut self, net_id: u32) -> Result<LobbyPlayer, LobbyError> {
        let index = self
            .slots
            .iter()
            .position(|s| s.player.net_id == net_id)
            .ok_or(LobbyError::UnknownPlayer(net_id))?;
        let slot = self.slots.remove(index);
        tracing::info!(net_id, name = %slot.player.name, "player removed");
        Ok(slot.player)
    }

    pub fn set_connected(&mut self, net_id: u32, connected: bool) -> Result<(), LobbyError> {
        self.slot_mut(net_id)?.player.connected = connected;
        Ok(())
    }

    /// Applies a lobby update. Ready/character/perk changes always land;
    /// a role change is re-validated against capacity first, and a full
    /// role leaves the whole update unapplied.
    pub fn apply_update(&mut self, update: &LobbyUpdate) -> Result<(), LobbyError> {
        let current_role = self
            .get(update.net_id)
            .ok_or(LobbyError::UnknownPlayer(update.net_id))?
            .role;
        if update.role != current_role && self.is_role_full(update.role) {
            return Err(LobbyError::RoleFull(update.role));
        }
        let slot = self.slot_mut(update.net_id)?;
        slot.player.role = update.role;
        slot.player.ready = update.ready;
        slot.character_id = update.character_id.clone();
        slot.perk_ids = update.perk_ids.clone();
        Ok(())
    }

    /// Moves a player to `role` if a slot is open. Requesting the role the
    /// player already has succeeds and changes nothing.
    pub fn request_role(&mut self, net_id: u32, role: Role) -> Result<(), LobbyError> {
        let current_role = self
            .get(net_id)
            .ok_or(LobbyError::UnknownPlayer(net_id))?
            .role;
        if role == current_role {
            return Ok(());
        }
        if self.is_role_full(role) {
            return Err(LobbyError::RoleFull(role));
        }
        tracing::info!(net_id, from = %current_role, to = %role, "role changed");
        self.slot_mut(net_id)?.player.role = role;
        Ok(())
    }

    pub fn character_id(&self, net_id: u32) -> Option<&str> {
        self.slot(net_id).map(|s| s.character_id.as_str())
    }

    pub fn perk_ids(&self, net_id: u32) -> Option<&[String]> {
        self.slot(net_id).map(|s| s.perk_ids.as_slice())
    }

    /// The replicated form of this roster, addressed to `you`.
    pub fn as_lobby_state(&self, you: u32) -> LobbyState {
        LobbyState {
            you,
            players: self.slots.iter().map(|s| s.player.clone()).collect(),
        }
    }

    /// Client side: replaces local state wholesale with the host's
    /// broadcast. The host's view always wins over optimistic local edits.
    pub fn reconcile(&mut self, state: &LobbyState) {
        self.slots = state
            .players
            .iter()
            .map(|player| Slot {
                player: player.clone(),
                character_id: String::new(),
                perk_ids: Vec::new(),
            })
            .collect();
        // Keep the counter ahead of everything seen, in case this mirror
        // ever becomes a host after migration.
        if let Some(max) = state.players.iter().map(|p| p.net_id).max() {
            self.next_net_id = self.next_net_id.max(max + 1);
        }
    }

    fn slot(&self, net_id: u32) -> Option<&Slot> {
        self.slots.iter().find(|s| s.player.net_id == net_id)
    }

    fn slot_mut(&mut self, net_id: u32) -> Result<&mut Slot, LobbyError> {
        self.slots
            .iter_mut()
            .find(|s| s.player.net_id == net_id)
            .ok_or(LobbyError::UnknownPlayer(net_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invariants_hold(roster: &Roster) {
        let config = roster.config();
        assert!(roster.count_role(Role::Killer) <= config.max_killers);
        assert!(roster.count_role(Role::Survivor) <= config.max_survivors);
        let mut ids: Vec<u32> = roster.players().map(|p| p.net_id).collect();
        let before = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), before, "duplicate net ids");
    }

    #[test]
    fn test_admit_assigns_fresh_sequential_ids() {
        let mut roster = Roster::new(LobbyConfig::default());
        let host = roster.admit("host", Role::Killer, true).unwrap();
        let a = roster.admit("a", Role::Survivor, false).unwrap();
        let b = roster.admit("b", Role::Survivor, false).unwrap();
        assert_eq!((host, a, b), (1, 2, 3));
        invariants_hold(&roster);
    }

    #[test]
    fn test_removed_ids_are_never_reused() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("host", Role::Killer, true).unwrap();
        let a = roster.admit("a", Role::Survivor, false).unwrap();
        roster.remove(a).unwrap();
        let b = roster.admit("b", Role::Survivor, false).unwrap();
        assert!(b > a);
        invariants_hold(&roster);
    }

    #[test]
    fn test_second_killer_is_refused_with_full_reason() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("host", Role::Killer, true).unwrap();
        let err = roster.admit("impostor", Role::Killer, false).unwrap_err();
        assert_eq!(err, LobbyError::RoleFull(Role::Killer));
        assert!(err.to_string().contains("full"));
        assert_eq!(roster.len(), 1);
        invariants_hold(&roster);
    }

    #[test]
    fn test_fifth_survivor_is_refused() {
        let mut roster = Roster::new(LobbyConfig::default());
        for i in 0..4 {
            roster.admit(format!("s{i}"), Role::Survivor, i == 0).unwrap();
        }
        let err = roster.admit("fifth", Role::Survivor, false).unwrap_err();
        assert_eq!(err, LobbyError::RoleFull(Role::Survivor));
        assert!(err.to_string().contains("full"));
        invariants_hold(&roster);
    }

    #[test]
    fn test_slot_frees_up_after_leave() {
        let mut roster = Roster::new(LobbyConfig::default());
        let killer = roster.admit("host", Role::Killer, true).unwrap();
        roster.remove(killer).unwrap();
        assert!(roster.admit("next", Role::Killer, false).is_ok());
        invariants_hold(&roster);
    }

    #[test]
    fn test_role_change_into_full_role_is_refused() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("host", Role::Killer, true).unwrap();
        let survivor = roster.admit("a", Role::Survivor, false).unwrap();
        let err = roster.request_role(survivor, Role::Killer).unwrap_err();
        assert_eq!(err, LobbyError::RoleFull(Role::Killer));
        assert_eq!(roster.get(survivor).unwrap().role, Role::Survivor);
        invariants_hold(&roster);
    }

    #[test]
    fn test_role_change_after_vacancy_succeeds() {
        let mut roster = Roster::new(LobbyConfig::default());
        let killer = roster.admit("host", Role::Killer, true).unwrap();
        let survivor = roster.admit("a", Role::Survivor, false).unwrap();
        roster.request_role(killer, Role::Survivor).unwrap();
        roster.request_role(survivor, Role::Killer).unwrap();
        assert_eq!(roster.get(survivor).unwrap().role, Role::Killer);
        invariants_hold(&roster);
    }

    #[test]
    fn test_requesting_current_role_is_a_no_op() {
        let mut roster = Roster::new(LobbyConfig::default());
        let killer = roster.admit("host", Role::Killer, true).unwrap();
        roster.request_role(killer, Role::Killer).unwrap();
        assert_eq!(roster.get(killer).unwrap().role, Role::Killer);
    }

    #[test]
    fn test_apply_update_sets_loadout_and_ready() {
        let mut roster = Roster::new(LobbyConfig::default());
        let id = roster.admit("a", Role::Survivor, false).unwrap();
        roster
            .apply_update(&LobbyUpdate {
                net_id: id,
                role: Role::Survivor,
                ready: true,
                character_id: "meg".into(),
                perk_ids: vec!["sprint_burst".into()],
            })
            .unwrap();
        assert!(roster.get(id).unwrap().ready);
        assert_eq!(roster.character_id(id), Some("meg"));
        assert_eq!(roster.perk_ids(id).unwrap().len(), 1);
    }

    #[test]
    fn test_apply_update_with_full_role_changes_nothing() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("host", Role::Killer, true).unwrap();
        let id = roster.admit("a", Role::Survivor, false).unwrap();
        let err = roster
            .apply_update(&LobbyUpdate {
                net_id: id,
                role: Role::Killer,
                ready: true,
                character_id: "trapper".into(),
                perk_ids: vec![],
            })
            .unwrap_err();
        assert_eq!(err, LobbyError::RoleFull(Role::Killer));
        let player = roster.get(id).unwrap();
        assert_eq!(player.role, Role::Survivor);
        assert!(!player.ready, "refused update must not half-apply");
        invariants_hold(&roster);
    }

    #[test]
    fn test_update_for_unknown_player_fails() {
        let mut roster = Roster::new(LobbyConfig::default());
        let err = roster
            .apply_update(&LobbyUpdate {
                net_id: 9,
                role: Role::Survivor,
                ready: false,
                character_id: String::new(),
                perk_ids: vec![],
            })
            .unwrap_err();
        assert_eq!(err, LobbyError::UnknownPlayer(9));
    }

    #[test]
    fn test_lobby_state_addresses_the_recipient() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("host", Role::Killer, true).unwrap();
        let a = roster.admit("a", Role::Survivor, false).unwrap();
        let state = roster.as_lobby_state(a);
        assert_eq!(state.you, a);
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[0].name, "host");
    }

    #[test]
    fn test_reconcile_replaces_wholesale_and_advances_counter() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("stale", Role::Survivor, false).unwrap();

        let mut authority = Roster::new(LobbyConfig::default());
        authority.admit("host", Role::Killer, true).unwrap();
        let a = authority.admit("a", Role::Survivor, false).unwrap();
        roster.reconcile(&authority.as_lobby_state(a));

        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(1).unwrap().name, "host");
        assert!(roster.get(a).is_some());
        // A later admit on the mirror must not collide with replicated ids.
        let fresh = roster.admit("late", Role::Survivor, false).unwrap();
        assert!(fresh > a);
        invariants_hold(&roster);
    }

    #[test]
    fn test_join_leave_churn_preserves_invariants() {
        let mut roster = Roster::new(LobbyConfig::default());
        roster.admit("host", Role::Killer, true).unwrap();
        for round in 0..5u32 {
            let mut joined = Vec::new();
            for i in 0..4 {
                joined.push(roster.admit(format!("r{round}p{i}"), Role::Survivor, false).unwrap());
            }
            assert!(roster.admit("overflow", Role::Survivor, false).is_err());
            invariants_hold(&roster);
            for id in joined {
                roster.remove(id).unwrap();
            }
            invariants_hold(&roster);
        }
    }
}
