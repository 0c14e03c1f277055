use tracing::info;

use crate::application::{
    head_to_head_winner, ActivityCtx, ChildRequest, Continuation, FormatSpec, Game, HookResult,
};
use crate::domain::{
    ActivityError, ActivitySettings, ForceEndReason, ModerationChange, PlayerId, ScoreMap,
};

const LEAVE_GRACE_MS: u64 = 5_000;

/// Head-to-head challenge: the defender accepts, then another format is run
/// as an inner game between the two and its scores decide the winner
#[derive(Debug)]
pub struct OneVsOne {
    challenger: PlayerId,
    defender: PlayerId,
    inner: FormatSpec,
    posted: bool,
    accepted: bool,
}

impl OneVsOne {
    pub const FORMAT: &'static str = "onevsone";

    pub fn new(challenger: PlayerId, defender: PlayerId, inner: FormatSpec) -> Self {
        Self {
            challenger,
            defender,
            inner,
            posted: false,
            accepted: false,
        }
    }

    pub fn challenger(&self) -> &PlayerId {
        &self.challenger
    }

    pub fn defender(&self) -> &PlayerId {
        &self.defender
    }

    fn revert_moderation(&self, ctx: &mut ActivityCtx<'_>) {
        if !self.accepted {
            return;
        }
        ctx.moderate(ModerationChange::Modchat {
            level: "off".to_string(),
        });
        for player in [&self.challenger, &self.defender] {
            ctx.moderate(ModerationChange::Deauth {
                target: player.clone(),
            });
        }
    }

    fn require(&self, player: &PlayerId, expected: &PlayerId, role: &str) -> HookResult {
        if player == expected {
            Ok(())
        } else {
            Err(ActivityError::InvalidAction(format!(
                "{} is not the {} in the current challenge",
                player, role
            )))
        }
    }
}

impl Game for OneVsOne {
    fn name(&self) -> &str {
        "One vs. One"
    }

    fn configure(&mut self, settings: &mut ActivitySettings) {
        settings.min_players = 2;
        settings.max_players = Some(2);
        settings.signup_timeout_ms = None;
    }

    fn on_signups(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        let text = format!(
            "{} challenges {} to a one vs. one game of {}!",
            ctx.display_name(&self.challenger),
            ctx.display_name(&self.defender),
            self.inner.format
        );
        ctx.say_and_await(&text, Continuation::Signal("challenge-posted".to_string()));
        Ok(())
    }

    fn on_signal(&mut self, ctx: &mut ActivityCtx<'_>, signal: &str) -> HookResult {
        match signal {
            "challenge-posted" => {
                self.posted = true;
                let wait = ctx.channel_settings().challenge_accept_ms;
                ctx.set_timeout(wait, Continuation::Signal("expire".to_string()));
            }
            "expire" if !self.accepted => {
                let name = ctx.display_name(&self.defender);
                ctx.say(format!("{} failed to accept the challenge in time!", name));
                ctx.abort(ForceEndReason::Expired);
            }
            _ => {}
        }
        Ok(())
    }

    fn on_action(
        &mut self,
        ctx: &mut ActivityCtx<'_>,
        player: &PlayerId,
        action: &str,
        _args: &[String],
    ) -> HookResult {
        match action {
            "accept" => {
                self.require(player, &self.defender, "defender")?;
                if !self.posted || self.accepted {
                    return Err(ActivityError::InvalidAction(
                        "there is no open challenge".to_string(),
                    ));
                }

                self.accepted = true;
                ctx.clear_timeout();
                ctx.moderate(ModerationChange::Modchat {
                    level: "+".to_string(),
                });
                for target in [&self.challenger, &self.defender] {
                    ctx.moderate(ModerationChange::Voice {
                        target: target.clone(),
                    });
                }
                info!(activity = %ctx.id(), "Challenge accepted by {}", player);
                ctx.start();
            }
            "reject" => {
                self.require(player, &self.defender, "defender")?;
                if self.accepted {
                    return Err(ActivityError::InvalidAction(
                        "the challenge was already accepted".to_string(),
                    ));
                }
                let name = ctx.display_name(player);
                ctx.say(format!("{} rejected the challenge!", name));
                ctx.abort(ForceEndReason::Requested(player.clone()));
            }
            "cancel" => {
                self.require(player, &self.challenger, "challenger")?;
                let name = ctx.display_name(player);
                ctx.say(format!("{} cancelled their challenge!", name));
                ctx.abort(ForceEndReason::Requested(player.clone()));
            }
            other => return Err(ActivityError::InvalidAction(other.to_string())),
        }
        Ok(())
    }

    fn on_remove_player(&mut self, ctx: &mut ActivityCtx<'_>, player: &PlayerId) -> HookResult {
        let name = ctx.display_name(player);
        ctx.say(format!("{} has left the game!", name));
        if self.accepted {
            ctx.set_timeout(LEAVE_GRACE_MS, Continuation::End);
        } else {
            ctx.abort(ForceEndReason::Requested(player.clone()));
        }
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        let players = vec![self.challenger.clone(), self.defender.clone()];
        ctx.spawn_child(ChildRequest::new(self.inner.clone(), players).head_to_head());
        Ok(())
    }

    fn on_next_round(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        ctx.end();
        Ok(())
    }

    fn on_child_end(&mut self, ctx: &mut ActivityCtx<'_>, scores: &ScoreMap) -> HookResult {
        match head_to_head_winner(ctx.roster(), &self.challenger, &self.defender, scores) {
            Some(winner) => {
                let name = ctx.display_name(&winner);
                ctx.say(format!("**{}** wins the challenge!", name));
                ctx.set_winner(&winner, 1);
            }
            None => ctx.say("No one wins!"),
        }
        ctx.end();
        Ok(())
    }

    fn on_end(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        self.revert_moderation(ctx);
        ctx.record_challenge(&self.challenger);
        Ok(())
    }

    fn on_force_end(&mut self, ctx: &mut ActivityCtx<'_>, reason: &ForceEndReason) -> HookResult {
        self.revert_moderation(ctx);
        if *reason == ForceEndReason::Requested(self.challenger.clone()) {
            ctx.record_challenge(&self.challenger);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::{ChannelCommand, ChannelEventLoop, GameCatalog, SessionEvent};
    use crate::config::{ChannelOverrides, EngineConfig};
    use crate::domain::Outbound;
    use crate::recorder::NoopRecorder;
    use std::sync::Arc;

    fn engine(config: EngineConfig) -> ChannelEventLoop {
        ChannelEventLoop::new(
            Arc::new(config.with_seed(3)),
            Arc::new(GameCatalog::standard()),
            Arc::new(NoopRecorder),
        )
    }

    fn challenge(engine: &mut ChannelEventLoop, challenger: &str) -> SessionEvent {
        engine.handle_command(ChannelCommand::Challenge {
            channel: "arena".to_string(),
            challenger: challenger.to_string(),
            defender: "Bob".to_string(),
            format: "pointrace".to_string(),
        })
    }

    fn act(engine: &mut ChannelEventLoop, player: &str, action: &str) -> SessionEvent {
        engine.handle_command(ChannelCommand::Action {
            channel: "arena".to_string(),
            player: player.to_string(),
            action: action.to_string(),
            args: Vec::new(),
        })
    }

    fn echo(engine: &mut ChannelEventLoop) -> Vec<Outbound> {
        let out = engine.drain_outbound("arena");
        for line in &out {
            if let Some(echo) = line.expected_echo() {
                engine.receive("arena", &echo);
            }
        }
        out
    }

    #[test]
    fn test_only_defender_accepts() {
        let mut engine = engine(EngineConfig::default());
        challenge(&mut engine, "Alice");
        echo(&mut engine);

        assert!(act(&mut engine, "Alice", "accept").is_failure());
        assert!(!act(&mut engine, "Bob", "accept").is_failure());
    }

    #[test]
    fn test_no_one_else_can_join() {
        let mut engine = engine(EngineConfig::default());
        challenge(&mut engine, "Alice");

        let event = engine.handle_command(ChannelCommand::Join {
            channel: "arena".to_string(),
            player: "Carol".to_string(),
        });

        assert!(event.is_failure());
    }

    #[test]
    fn test_reject_ends_without_moderation() {
        let mut engine = engine(EngineConfig::default());
        challenge(&mut engine, "Alice");
        echo(&mut engine);

        act(&mut engine, "Bob", "reject");

        assert!(engine.game("arena").is_none());
        let out = echo(&mut engine);
        assert!(out.contains(&Outbound::Text {
            content: "Bob rejected the challenge!".to_string()
        }));
        assert!(!out
            .iter()
            .any(|o| matches!(o, Outbound::Moderation { .. })));
    }

    #[test]
    fn test_force_end_reverts_moderation() {
        let mut engine = engine(EngineConfig::default());
        challenge(&mut engine, "Alice");
        echo(&mut engine);
        act(&mut engine, "Bob", "accept");
        echo(&mut engine);

        engine.handle_command(ChannelCommand::ForceEnd {
            channel: "arena".to_string(),
            reason: ForceEndReason::Moderator,
        });

        let out = echo(&mut engine);
        assert!(out.contains(&Outbound::Moderation {
            change: ModerationChange::Modchat {
                level: "off".to_string()
            }
        }));
        assert!(out.contains(&Outbound::Moderation {
            change: ModerationChange::Deauth {
                target: PlayerId::from_name("Bob")
            }
        }));
    }

    #[test]
    fn test_cancel_starts_challenger_cooldown() {
        let config = EngineConfig::default().with_channel(
            "arena",
            ChannelOverrides {
                challenge_cooldown_ms: Some(60_000),
                ..Default::default()
            },
        );
        let mut engine = engine(config);
        challenge(&mut engine, "Alice");
        echo(&mut engine);
        act(&mut engine, "Alice", "cancel");
        assert!(engine.game("arena").is_none());

        assert!(challenge(&mut engine, "Alice").is_failure());
        engine.advance(60_000);
        assert!(!challenge(&mut engine, "Alice").is_failure());
    }

    #[test]
    fn test_defender_rejection_does_not_start_cooldown() {
        let config = EngineConfig::default().with_channel(
            "arena",
            ChannelOverrides {
                challenge_cooldown_ms: Some(60_000),
                ..Default::default()
            },
        );
        let mut engine = engine(config);
        challenge(&mut engine, "Alice");
        echo(&mut engine);
        act(&mut engine, "Bob", "reject");

        assert!(!challenge(&mut engine, "Alice").is_failure());
    }
}
