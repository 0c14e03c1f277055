use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::protocol::normalize;
use crate::domain::PlayerId;

/// Name lists used when the caller does not supply team names, keyed by team count
pub const TEAM_NAME_LISTS: &[(usize, &[&[&str]])] = &[
    (
        2,
        &[
            &["Red", "Blue"],
            &["Gold", "Silver"],
            &["Ruby", "Sapphire"],
            &["Diamond", "Pearl"],
            &["Black", "White"],
            &["X", "Y"],
            &["Sun", "Moon"],
            &["Sword", "Shield"],
            &["Land", "Sea"],
            &["Time", "Space"],
            &["Yin", "Yang"],
        ],
    ),
    (
        3,
        &[
            &["Red", "Blue", "Yellow"],
            &["Gold", "Silver", "Crystal"],
            &["Ruby", "Sapphire", "Emerald"],
            &["Diamond", "Pearl", "Platinum"],
            &["Land", "Sea", "Sky"],
            &["Time", "Space", "Antimatter"],
        ],
    ),
    (
        4,
        &[
            &["Red", "Blue", "Yellow", "Green"],
            &["Fall", "Winter", "Spring", "Summer"],
            &["Water", "Fire", "Earth", "Air"],
            &["Clubs", "Spades", "Hearts", "Diamonds"],
        ],
    ),
];

/// Built-in name lists for a team count (empty if there are none)
pub fn team_name_lists(count: usize) -> &'static [&'static [&'static str]] {
    TEAM_NAME_LISTS
        .iter()
        .find(|(n, _)| *n == count)
        .map(|(_, lists)| *lists)
        .unwrap_or(&[])
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(String);

impl TeamId {
    pub fn from_name(name: &str) -> Self {
        TeamId(normalize(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum TeamError {
    #[error("At least two teams are required, got {0}")]
    TooFewTeams(usize),

    #[error("Expected {expected} team names, got {actual}")]
    NameCountMismatch { expected: usize, actual: usize },

    #[error("No built-in team names for {0} teams")]
    NoNamesFor(usize),

    #[error("Team not found: {0}")]
    NotFound(TeamId),
}

/// A team exclusively owns its member list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    id: TeamId,
    name: String,
    members: Vec<PlayerId>,
    /// Aggregate of the members' points
    pub points: i64,
}

impl Team {
    pub fn new(name: &str) -> Self {
        Team {
            id: TeamId::from_name(name),
            name: name.to_string(),
            members: Vec::new(),
            points: 0,
        }
    }

    pub fn id(&self) -> &TeamId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn members(&self) -> &[PlayerId] {
        &self.members
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.members.contains(player)
    }

    pub(crate) fn add_member(&mut self, player: PlayerId) {
        if !self.members.contains(&player) {
            self.members.push(player);
        }
    }

    pub(crate) fn remove_member(&mut self, player: &PlayerId) -> bool {
        let before = self.members.len();
        self.members.retain(|p| p != player);
        before != self.members.len()
    }
}

/// All teams of one activity, in creation order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamSet {
    teams: Vec<Team>,
}

impl TeamSet {
    /// Deal the (already shuffled) players round-robin into one team per name
    pub fn split(players: &[PlayerId], names: &[String]) -> Result<Self, TeamError> {
        if names.len() < 2 {
            return Err(TeamError::TooFewTeams(names.len()));
        }

        let mut teams: Vec<Team> = names.iter().map(|name| Team::new(name)).collect();
        for (i, player) in players.iter().enumerate() {
            teams[i % names.len()].add_member(player.clone());
        }

        Ok(TeamSet { teams })
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Team> {
        self.teams.iter()
    }

    pub fn get(&self, id: &TeamId) -> Option<&Team> {
        self.teams.iter().find(|t| t.id() == id)
    }

    pub fn get_mut(&mut self, id: &TeamId) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id() == id)
    }

    pub fn team_of(&self, player: &PlayerId) -> Option<&Team> {
        self.teams.iter().find(|t| t.contains(player))
    }

    /// Move a player between teams, carrying `points` along with them
    pub fn move_player(
        &mut self,
        player: &PlayerId,
        to: &TeamId,
        points: i64,
    ) -> Result<(), TeamError> {
        if self.get(to).is_none() {
            return Err(TeamError::NotFound(to.clone()));
        }

        for team in self.teams.iter_mut() {
            if team.remove_member(player) {
                team.points -= points;
            }
        }

        if let Some(team) = self.get_mut(to) {
            team.add_member(player.clone());
            team.points += points;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(names: &[&str]) -> Vec<PlayerId> {
        names.iter().map(|n| PlayerId::from_name(n)).collect()
    }

    #[test]
    fn test_split_round_robin() {
        let players = ids(&["a", "b", "c", "d", "e"]);
        let names = vec!["Red".to_string(), "Blue".to_string()];

        let teams = TeamSet::split(&players, &names).unwrap();

        assert_eq!(teams.len(), 2);
        let red = teams.get(&TeamId::from_name("Red")).unwrap();
        let blue = teams.get(&TeamId::from_name("Blue")).unwrap();
        assert_eq!(red.members(), &ids(&["a", "c", "e"])[..]);
        assert_eq!(blue.members(), &ids(&["b", "d"])[..]);
    }

    #[test]
    fn test_split_needs_two_teams() {
        let result = TeamSet::split(&ids(&["a"]), &["Solo".to_string()]);
        assert_eq!(result, Err(TeamError::TooFewTeams(1)));
    }

    #[test]
    fn test_builtin_name_lists_have_matching_sizes() {
        for (count, lists) in TEAM_NAME_LISTS {
            for list in *lists {
                assert_eq!(list.len(), *count);
            }
        }
        assert!(team_name_lists(5).is_empty());
    }

    #[test]
    fn test_move_player_carries_points() {
        let players = ids(&["a", "b"]);
        let names = vec!["Red".to_string(), "Blue".to_string()];
        let mut teams = TeamSet::split(&players, &names).unwrap();
        let red = TeamId::from_name("red");
        let blue = TeamId::from_name("blue");
        teams.get_mut(&red).unwrap().points = 5;

        teams.move_player(&players[0], &blue, 5).unwrap();

        assert_eq!(teams.get(&red).unwrap().points, 0);
        assert_eq!(teams.get(&blue).unwrap().points, 5);
        assert_eq!(teams.team_of(&players[0]).unwrap().id(), &blue);
    }

    #[test]
    fn test_move_to_unknown_team() {
        let players = ids(&["a", "b"]);
        let names = vec!["Red".to_string(), "Blue".to_string()];
        let mut teams = TeamSet::split(&players, &names).unwrap();

        let result = teams.move_player(&players[0], &TeamId::from_name("green"), 0);

        assert_eq!(result, Err(TeamError::NotFound(TeamId::from_name("green"))));
    }
}
