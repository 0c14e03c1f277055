use serde::{Deserialize, Serialize};

use crate::domain::{ActivityId, ForceEndReason, PlayerId, ScoreMap};

/// Events emitted by the engine.
///
/// `handle_command` returns the direct result of a command; lifecycle
/// events produced along the way (or later by timers and echoes) are
/// collected and drained separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    // ===== Command results =====
    /// Signups opened for a new game
    GameCreated {
        channel: String,
        activity: ActivityId,
        format: String,
    },

    /// Head-to-head challenge posted
    ChallengeIssued {
        channel: String,
        activity: ActivityId,
        challenger: PlayerId,
        defender: PlayerId,
    },

    PlayerJoined {
        channel: String,
        activity: ActivityId,
        player: PlayerId,
    },

    PlayerLeft {
        channel: String,
        activity: ActivityId,
        player: PlayerId,
    },

    SignupsClosed {
        channel: String,
        activity: ActivityId,
    },

    EndRequested {
        channel: String,
        activity: ActivityId,
    },

    ForceEndRequested {
        channel: String,
        activity: ActivityId,
        reason: ForceEndReason,
    },

    ActionAccepted {
        channel: String,
        player: PlayerId,
        action: String,
    },

    /// Command failed
    CommandFailed { command: String, reason: String },

    // ===== Lifecycle =====
    SignupsOpened {
        channel: String,
        activity: ActivityId,
        format: String,
    },

    GameStarted {
        channel: String,
        activity: ActivityId,
        players: Vec<PlayerId>,
    },

    RoundStarted {
        channel: String,
        activity: ActivityId,
        round: u32,
    },

    PlayerEliminated {
        channel: String,
        activity: ActivityId,
        player: PlayerId,
    },

    ChildSpawned {
        channel: String,
        parent: ActivityId,
        child: ActivityId,
        format: String,
    },

    ChildCompleted {
        channel: String,
        parent: ActivityId,
        child: ActivityId,
        scores: ScoreMap,
    },

    GameEnded {
        channel: String,
        activity: ActivityId,
        winners: ScoreMap,
    },

    GameForceEnded {
        channel: String,
        activity: ActivityId,
        reason: ForceEndReason,
    },
}

impl SessionEvent {
    pub fn failed(command: &str, reason: impl ToString) -> Self {
        SessionEvent::CommandFailed {
            command: command.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SessionEvent::CommandFailed { .. })
    }
}
