use crate::domain::{ForceEndReason, GameOptions};

/// Commands that can be executed against a channel
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelCommand {
    /// Open signups for a new game
    CreateGame {
        channel: String,
        format: String,
        options: GameOptions,
    },

    /// Challenge another player to a head-to-head game
    Challenge {
        channel: String,
        challenger: String,
        defender: String,
        format: String,
    },

    /// Sign up (or late-join) the current game
    Join { channel: String, player: String },

    /// Leave the current game (eliminates while running)
    Leave { channel: String, player: String },

    /// Close signups and start
    CloseSignups { channel: String },

    /// End the current game through the normal end path
    EndGame { channel: String },

    /// Stop the current game without end bookkeeping
    ForceEnd {
        channel: String,
        reason: ForceEndReason,
    },

    /// Game-specific player action (`roll`, `claim`, `accept`, ...)
    Action {
        channel: String,
        player: String,
        action: String,
        args: Vec<String>,
    },
}

impl ChannelCommand {
    pub fn channel(&self) -> &str {
        match self {
            ChannelCommand::CreateGame { channel, .. }
            | ChannelCommand::Challenge { channel, .. }
            | ChannelCommand::Join { channel, .. }
            | ChannelCommand::Leave { channel, .. }
            | ChannelCommand::CloseSignups { channel }
            | ChannelCommand::EndGame { channel }
            | ChannelCommand::ForceEnd { channel, .. }
            | ChannelCommand::Action { channel, .. } => channel,
        }
    }

    /// Short name used in `CommandFailed`
    pub fn name(&self) -> &'static str {
        match self {
            ChannelCommand::CreateGame { .. } => "CreateGame",
            ChannelCommand::Challenge { .. } => "Challenge",
            ChannelCommand::Join { .. } => "Join",
            ChannelCommand::Leave { .. } => "Leave",
            ChannelCommand::CloseSignups { .. } => "CloseSignups",
            ChannelCommand::EndGame { .. } => "EndGame",
            ChannelCommand::ForceEnd { .. } => "ForceEnd",
            ChannelCommand::Action { .. } => "Action",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_clone() {
        let cmd = ChannelCommand::CreateGame {
            channel: "lobby".to_string(),
            format: "pointrace".to_string(),
            options: GameOptions::new(),
        };

        let cloned = cmd.clone();
        assert_eq!(cmd, cloned);
    }

    #[test]
    fn test_command_channel_and_name() {
        let cmd = ChannelCommand::Action {
            channel: "board".to_string(),
            player: "Bob".to_string(),
            action: "roll".to_string(),
            args: Vec::new(),
        };

        assert_eq!(cmd.channel(), "board");
        assert_eq!(cmd.name(), "Action");

        let debug = format!("{:?}", cmd);
        assert!(debug.contains("roll"));
        assert!(debug.contains("Bob"));
    }
}
