pub mod activity;
pub mod board;
pub mod player;
pub mod protocol;
pub mod team;

pub use activity::{
    ActivityError, ActivityId, ActivityKind, ActivityPhase, ActivitySettings, ForceEndReason,
    GameOptions, GameRecord, ScoreMap,
};
pub use board::{
    Board, BoardError, BoardLocation, BoardSide, BoardSpace, MovedBoardLocation, SpaceKind,
};
pub use player::{Player, PlayerError, PlayerId, PlayerStatus, Roster, RosterError};
pub use protocol::{normalize, InboundLine, LineKind, ModerationChange, Outbound};
pub use team::{team_name_lists, Team, TeamError, TeamId, TeamSet};
