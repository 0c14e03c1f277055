use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::domain::protocol::normalize;
use crate::domain::TeamId;

/// Stable player identity: the normalized form of the display name
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn from_name(name: &str) -> Self {
        PlayerId(normalize(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a player stands in the current activity.
///
/// A single state instead of independent flags: a player cannot be frozen
/// and eliminated at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum PlayerStatus {
    /// Still taking actions
    #[default]
    Active,
    /// Stopped voluntarily, still counted in final scoring
    Frozen,
    /// Soft-removed; remains addressable for messaging
    Eliminated,
}

impl fmt::Display for PlayerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerStatus::Active => write!(f, "Active"),
            PlayerStatus::Frozen => write!(f, "Frozen"),
            PlayerStatus::Eliminated => write!(f, "Eliminated"),
        }
    }
}

/// Errors that can occur when working with a single player
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PlayerError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Name must be between 1 and 18 characters")]
    InvalidNameLength,

    #[error("Player {0} is already eliminated")]
    AlreadyEliminated(PlayerId),
}

/// A participant of one activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    id: PlayerId,
    /// Display name as the platform reported it
    name: String,
    status: PlayerStatus,
    /// Lookup only, the team owns membership
    team: Option<TeamId>,
    /// Join order within the owning roster
    joined_seq: u64,
}

impl Player {
    pub fn new(name: &str) -> Result<Self, PlayerError> {
        let name = name.trim();
        Self::validate_name(name)?;

        Ok(Player {
            id: PlayerId::from_name(name),
            name: name.to_string(),
            status: PlayerStatus::Active,
            team: None,
            joined_seq: 0,
        })
    }

    fn validate_name(name: &str) -> Result<(), PlayerError> {
        if normalize(name).is_empty() {
            return Err(PlayerError::EmptyName);
        }

        if name.chars().count() > 18 {
            return Err(PlayerError::InvalidNameLength);
        }

        Ok(())
    }

    // Getters

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> PlayerStatus {
        self.status
    }

    pub fn team(&self) -> Option<&TeamId> {
        self.team.as_ref()
    }

    pub fn joined_seq(&self) -> u64 {
        self.joined_seq
    }

    // Queries

    pub fn is_eliminated(&self) -> bool {
        matches!(self.status, PlayerStatus::Eliminated)
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self.status, PlayerStatus::Frozen)
    }

    /// Can still take actions this activity
    pub fn is_active(&self) -> bool {
        matches!(self.status, PlayerStatus::Active)
    }

    // State mutations

    pub fn eliminate(&mut self) {
        self.status = PlayerStatus::Eliminated;
    }

    pub fn freeze(&mut self) -> Result<(), PlayerError> {
        if self.is_eliminated() {
            return Err(PlayerError::AlreadyEliminated(self.id.clone()));
        }
        self.status = PlayerStatus::Frozen;
        Ok(())
    }

    /// Back to a fresh state, as if the player had just joined
    pub fn reset(&mut self) {
        self.status = PlayerStatus::Active;
        self.team = None;
    }

    pub(crate) fn set_team(&mut self, team: Option<TeamId>) {
        self.team = team;
    }
}

/// Errors raised by roster bookkeeping
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RosterError {
    #[error("Player already joined: {0}")]
    AlreadyJoined(PlayerId),

    #[error("Player not found: {0}")]
    NotFound(PlayerId),

    #[error("Player error: {0}")]
    Player(#[from] PlayerError),
}

/// The players owned by one activity, keyed by id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Roster {
    players: BTreeMap<PlayerId, Player>,
    next_seq: u64,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    // ===== Queries =====

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn contains(&self, id: &PlayerId) -> bool {
        self.players.contains_key(id)
    }

    pub fn get(&self, id: &PlayerId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn get_mut(&mut self, id: &PlayerId) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    /// All players in join order
    pub fn players(&self) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.values().collect();
        players.sort_by_key(|p| p.joined_seq());
        players
    }

    /// Ids of all players in join order
    pub fn ids(&self) -> Vec<PlayerId> {
        self.players().into_iter().map(|p| p.id().clone()).collect()
    }

    /// Players that can still act (neither frozen nor eliminated)
    pub fn remaining(&self) -> Vec<&Player> {
        self.players()
            .into_iter()
            .filter(|p| p.is_active())
            .collect()
    }

    pub fn remaining_count(&self) -> usize {
        self.players.values().filter(|p| p.is_active()).count()
    }

    /// Players still in final scoring (frozen players included)
    pub fn not_eliminated(&self) -> Vec<&Player> {
        self.players()
            .into_iter()
            .filter(|p| !p.is_eliminated())
            .collect()
    }

    /// Display name for an id, falling back to the id itself
    pub fn display_name(&self, id: &PlayerId) -> String {
        self.players
            .get(id)
            .map(|p| p.name().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    // ===== Membership =====

    pub fn add(&mut self, mut player: Player) -> Result<&Player, RosterError> {
        if self.players.contains_key(player.id()) {
            return Err(RosterError::AlreadyJoined(player.id().clone()));
        }

        player.joined_seq = self.next_seq;
        self.next_seq += 1;

        let id = player.id().clone();
        Ok(self.players.entry(id).or_insert(player))
    }

    pub fn remove(&mut self, id: &PlayerId) -> Result<Player, RosterError> {
        self.players
            .remove(id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))
    }

    pub fn eliminate(&mut self, id: &PlayerId) -> Result<(), RosterError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))?
            .eliminate();
        Ok(())
    }

    pub fn freeze(&mut self, id: &PlayerId) -> Result<(), RosterError> {
        self.players
            .get_mut(id)
            .ok_or_else(|| RosterError::NotFound(id.clone()))?
            .freeze()
            .map_err(Into::into)
    }

    // ===== Transfer between activities =====

    /// Move the given players into a new roster.
    ///
    /// All-or-nothing: if any id is missing nothing is moved.
    pub fn lend(&mut self, ids: &[PlayerId]) -> Result<Roster, RosterError> {
        if let Some(missing) = ids.iter().find(|id| !self.players.contains_key(id)) {
            return Err(RosterError::NotFound(missing.clone()));
        }

        let mut lent = Roster::new();
        for id in ids {
            if let Some(player) = self.players.remove(id) {
                lent.next_seq = lent.next_seq.max(player.joined_seq + 1);
                lent.players.insert(id.clone(), player);
            }
        }
        Ok(lent)
    }

    /// Take back players previously lent out, keeping whatever state the
    /// borrower left them in
    pub fn absorb(&mut self, returned: Roster) {
        for (id, player) in returned.players {
            self.next_seq = self.next_seq.max(player.joined_seq + 1);
            self.players.insert(id, player);
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_of(names: &[&str]) -> Roster {
        let mut roster = Roster::new();
        for name in names {
            roster.add(Player::new(name).unwrap()).unwrap();
        }
        roster
    }

    #[test]
    fn test_create_player() {
        let player = Player::new("Alice").unwrap();

        assert_eq!(player.name(), "Alice");
        assert_eq!(player.id().as_str(), "alice");
        assert_eq!(player.status(), PlayerStatus::Active);
        assert!(player.is_active());
        assert!(player.team().is_none());
    }

    #[test]
    fn test_empty_name_validation() {
        assert_eq!(Player::new(""), Err(PlayerError::EmptyName));
        assert_eq!(Player::new(" !! "), Err(PlayerError::EmptyName));
    }

    #[test]
    fn test_name_length_validation() {
        let long_name = "a".repeat(19);
        assert_eq!(Player::new(&long_name), Err(PlayerError::InvalidNameLength));
    }

    #[test]
    fn test_id_is_case_insensitive() {
        let a = Player::new("Mr. Mime").unwrap();
        let b = Player::new("mrmime").unwrap();
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn test_cannot_freeze_eliminated_player() {
        let mut player = Player::new("Bob").unwrap();
        player.eliminate();

        let result = player.freeze();

        assert_eq!(result, Err(PlayerError::AlreadyEliminated(player.id().clone())));
        assert_eq!(player.status(), PlayerStatus::Eliminated);
    }

    #[test]
    fn test_frozen_player_can_still_be_eliminated() {
        let mut player = Player::new("Carol").unwrap();
        player.freeze().unwrap();
        assert!(player.is_frozen());

        player.eliminate();
        assert!(player.is_eliminated());
        assert!(!player.is_frozen());
    }

    #[test]
    fn test_reset() {
        let mut player = Player::new("Dave").unwrap();
        player.eliminate();
        player.set_team(Some(TeamId::from_name("Red")));

        player.reset();

        assert!(player.is_active());
        assert!(player.team().is_none());
    }

    #[test]
    fn test_roster_rejects_duplicates() {
        let mut roster = roster_of(&["Alice"]);
        let result = roster.add(Player::new("ALICE").unwrap());

        assert_eq!(
            result.err(),
            Some(RosterError::AlreadyJoined(PlayerId::from_name("alice")))
        );
    }

    #[test]
    fn test_roster_join_order() {
        let roster = roster_of(&["Zed", "Amy", "Max"]);
        let names: Vec<&str> = roster.players().iter().map(|p| p.name()).collect();
        assert_eq!(names, vec!["Zed", "Amy", "Max"]);
    }

    #[test]
    fn test_remaining_excludes_frozen_and_eliminated() {
        let mut roster = roster_of(&["A", "B", "C"]);
        roster.eliminate(&PlayerId::from_name("a")).unwrap();
        roster.freeze(&PlayerId::from_name("b")).unwrap();

        assert_eq!(roster.remaining_count(), 1);
        assert_eq!(roster.not_eliminated().len(), 2);
    }

    #[test]
    fn test_lend_is_all_or_nothing() {
        let mut roster = roster_of(&["A", "B"]);
        let result = roster.lend(&[PlayerId::from_name("a"), PlayerId::from_name("x")]);

        assert_eq!(result.err(), Some(RosterError::NotFound(PlayerId::from_name("x"))));
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn test_lend_and_absorb_keeps_state() {
        let mut roster = roster_of(&["A", "B", "C"]);
        let a = PlayerId::from_name("a");
        let b = PlayerId::from_name("b");

        let mut lent = roster.lend(&[a.clone(), b.clone()]).unwrap();
        assert_eq!(roster.len(), 1);
        assert!(!roster.contains(&a));

        lent.eliminate(&a).unwrap();
        roster.absorb(lent);

        assert_eq!(roster.len(), 3);
        assert!(roster.get(&a).unwrap().is_eliminated());
        assert!(roster.get(&b).unwrap().is_active());
        // join order survives the round trip
        assert_eq!(roster.players()[0].id(), &a);
    }

    #[test]
    fn test_display_name_fallback() {
        let roster = roster_of(&["Alice"]);
        assert_eq!(roster.display_name(&PlayerId::from_name("alice")), "Alice");
        assert_eq!(roster.display_name(&PlayerId::from_name("ghost")), "ghost");
    }
}
