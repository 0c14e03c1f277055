use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::catalog::{FormatSpec, GameCatalog};
use crate::application::context::ChannelContext;
use crate::application::lifecycle::Activity;
use crate::application::{ChannelCommand, SessionEvent};
use crate::config::EngineConfig;
use crate::domain::{
    ActivityError, ActivityKind, ActivityPhase, ForceEndReason, GameOptions, InboundLine,
    Outbound, Player, PlayerId,
};
use crate::games::OneVsOne;
use crate::recorder::{NoopRecorder, OutcomeRecorder};

const MINUTE_MS: u64 = 60_000;

/// One chat channel: its shared context and the game it hosts
struct Channel {
    ctx: ChannelContext,
    game: Option<Activity>,
    cooldown_until: Option<u64>,
}

impl Channel {
    fn running(&self) -> bool {
        self.game
            .as_ref()
            .is_some_and(|game| !game.phase().is_finished())
    }
}

/// Channel event loop: routes commands, inbound lines and fired timers to the
/// activity hosted in each channel.
///
/// Every entry point runs to completion before returning; nothing is shared
/// between channels except configuration and the collaborators.
pub struct ChannelEventLoop {
    config: Arc<EngineConfig>,
    catalog: Arc<GameCatalog>,
    recorder: Arc<dyn OutcomeRecorder>,
    channels: BTreeMap<String, Channel>,
    events: Vec<SessionEvent>,
    now_ms: u64,
}

impl std::fmt::Debug for ChannelEventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelEventLoop")
            .field("channels", &self.channels.keys().collect::<Vec<_>>())
            .field("events", &self.events.len())
            .field("now_ms", &self.now_ms)
            .finish_non_exhaustive()
    }
}

impl Default for ChannelEventLoop {
    fn default() -> Self {
        Self::new(
            Arc::new(EngineConfig::default()),
            Arc::new(GameCatalog::standard()),
            Arc::new(NoopRecorder),
        )
    }
}

impl ChannelEventLoop {
    pub fn new(
        config: Arc<EngineConfig>,
        catalog: Arc<GameCatalog>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Self {
        Self {
            config,
            catalog,
            recorder,
            channels: BTreeMap::new(),
            events: Vec::new(),
            now_ms: 0,
        }
    }

    // ===== Queries =====

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    /// The running game of a channel
    pub fn game(&self, channel: &str) -> Option<&Activity> {
        self.channels.get(channel).and_then(|c| c.game.as_ref())
    }

    pub fn context(&self, channel: &str) -> Option<&ChannelContext> {
        self.channels.get(channel).map(|c| &c.ctx)
    }

    /// Earliest pending timer across all channels
    pub fn next_deadline(&self) -> Option<u64> {
        self.channels
            .values()
            .filter_map(|c| c.ctx.timers.next_deadline())
            .min()
    }

    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    // ===== Commands =====

    /// Process a single command and return the resulting event
    pub fn handle_command(&mut self, command: ChannelCommand) -> SessionEvent {
        let name = command.name();
        let channel = command.channel().to_string();

        let event = match command {
            ChannelCommand::CreateGame {
                channel,
                format,
                options,
            } => self.handle_create_game(&channel, &format, options),

            ChannelCommand::Challenge {
                channel,
                challenger,
                defender,
                format,
            } => self.handle_challenge(&channel, &challenger, &defender, &format),

            ChannelCommand::Join { channel, player } => self.handle_join(&channel, &player),

            ChannelCommand::Leave { channel, player } => self.handle_leave(&channel, &player),

            ChannelCommand::CloseSignups { channel } => {
                self.with_game(&channel, name, |game, ctx| {
                    game.start(ctx)?;
                    Ok(SessionEvent::SignupsClosed {
                        channel: ctx.name().to_string(),
                        activity: game.id(),
                    })
                })
            }

            ChannelCommand::EndGame { channel } => self.with_game(&channel, name, |game, ctx| {
                game.end(ctx)?;
                Ok(SessionEvent::EndRequested {
                    channel: ctx.name().to_string(),
                    activity: game.id(),
                })
            }),

            ChannelCommand::ForceEnd { channel, reason } => {
                self.with_game(&channel, name, |game, ctx| {
                    game.force_end(ctx, reason.clone())?;
                    Ok(SessionEvent::ForceEndRequested {
                        channel: ctx.name().to_string(),
                        activity: game.id(),
                        reason,
                    })
                })
            }

            ChannelCommand::Action {
                channel,
                player,
                action,
                args,
            } => {
                let player = PlayerId::from_name(&player);
                self.with_game(&channel, name, |game, ctx| {
                    game.handle_action(ctx, &player, &action, &args)?;
                    Ok(SessionEvent::ActionAccepted {
                        channel: ctx.name().to_string(),
                        player,
                        action,
                    })
                })
            }
        };

        if let SessionEvent::CommandFailed { reason, .. } = &event {
            warn!(channel = %channel, "❌ {} rejected: {}", name, reason);
        }
        self.settle_channel(&channel);
        event
    }

    fn channel_mut(&mut self, name: &str) -> &mut Channel {
        let now = self.now_ms;
        let (config, catalog, recorder) = (&self.config, &self.catalog, &self.recorder);
        self.channels.entry(name.to_string()).or_insert_with(|| {
            debug!(channel = %name, "Channel opened");
            let mut ctx = ChannelContext::new(
                name,
                Arc::clone(config),
                Arc::clone(catalog),
                Arc::clone(recorder),
            );
            ctx.timers.set_now(now);
            Channel {
                ctx,
                game: None,
                cooldown_until: None,
            }
        })
    }

    /// Reject a new game while one runs or the channel cooldown lasts
    fn check_available(&mut self, channel: &str) -> Result<(), String> {
        let now = self.now_ms;
        let ch = self.channel_mut(channel);
        if ch.running() {
            return Err(format!("A game is already running in {}", channel));
        }
        if let Some(until) = ch.cooldown_until.filter(|until| *until > now) {
            let minutes = (until - now).div_ceil(MINUTE_MS);
            let plural = if minutes == 1 { "" } else { "s" };
            let message = format!(
                "There is a game cooldown in {} for {} more minute{}.",
                channel, minutes, plural
            );
            ch.ctx.say(message.clone());
            return Err(message);
        }
        Ok(())
    }

    fn handle_create_game(
        &mut self,
        channel: &str,
        format: &str,
        options: GameOptions,
    ) -> SessionEvent {
        const COMMAND: &str = "CreateGame";
        if let Err(reason) = self.check_available(channel) {
            return SessionEvent::failed(COMMAND, reason);
        }

        let spec = FormatSpec::new(format).with_options(options);
        let Some(game) = self.catalog.create(&spec) else {
            return SessionEvent::failed(COMMAND, format!("Unknown format: {}", format));
        };

        let mut merged = self
            .config
            .format_options(&spec.format)
            .cloned()
            .unwrap_or_default();
        merged.merge(&spec.options);

        let ch = self.channel_mut(channel);
        let mut activity = Activity::new(
            &spec.format,
            ActivityKind::Standalone,
            ch.ctx.settings().activity_settings(),
            &merged,
            game,
        );
        let id = activity.id();
        info!(channel = %channel, activity = %id, "🎮 Creating {}", activity.name());

        activity.open_signups(&mut ch.ctx);
        ch.game = Some(activity);

        SessionEvent::GameCreated {
            channel: channel.to_string(),
            activity: id,
            format: spec.format,
        }
    }

    fn handle_challenge(
        &mut self,
        channel: &str,
        challenger: &str,
        defender: &str,
        format: &str,
    ) -> SessionEvent {
        const COMMAND: &str = "Challenge";
        let (challenger_id, defender_id) =
            (PlayerId::from_name(challenger), PlayerId::from_name(defender));
        if challenger_id == defender_id {
            return SessionEvent::failed(COMMAND, "You cannot challenge yourself");
        }
        let spec = FormatSpec::new(format);
        if !self.catalog.contains(&spec.format) {
            return SessionEvent::failed(COMMAND, format!("Unknown format: {}", format));
        }
        if let Err(reason) = self.check_available(channel) {
            return SessionEvent::failed(COMMAND, reason);
        }

        let ch = self.channel_mut(channel);
        let wait = ch.ctx.challenge_wait_ms(&challenger_id);
        if wait > 0 {
            let minutes = wait.div_ceil(MINUTE_MS);
            return SessionEvent::failed(
                COMMAND,
                format!(
                    "{} must wait {} more minute(s) before challenging again",
                    challenger, minutes
                ),
            );
        }

        let game = OneVsOne::new(challenger_id.clone(), defender_id.clone(), spec);
        let mut activity = Activity::new(
            OneVsOne::FORMAT,
            ActivityKind::Standalone,
            ch.ctx.settings().activity_settings(),
            &GameOptions::new(),
            Box::new(game),
        );

        // Both sides are known up front; nobody else signs up
        for name in [challenger, defender] {
            let player = match Player::new(name) {
                Ok(player) => player,
                Err(e) => return SessionEvent::failed(COMMAND, e),
            };
            if let Err(e) = activity.core.roster.add(player) {
                return SessionEvent::failed(COMMAND, e);
            }
        }

        let id = activity.id();
        info!(channel = %channel, activity = %id, "⚔️ {} challenges {}", challenger, defender);
        activity.open_signups(&mut ch.ctx);
        ch.game = Some(activity);

        SessionEvent::ChallengeIssued {
            channel: channel.to_string(),
            activity: id,
            challenger: challenger_id,
            defender: defender_id,
        }
    }

    fn handle_join(&mut self, channel: &str, player: &str) -> SessionEvent {
        self.with_game(channel, "Join", |game, ctx| {
            let player = game.add_player(ctx, player)?;
            Ok(SessionEvent::PlayerJoined {
                channel: ctx.name().to_string(),
                activity: game.id(),
                player,
            })
        })
    }

    fn handle_leave(&mut self, channel: &str, player: &str) -> SessionEvent {
        let player = PlayerId::from_name(player);
        self.with_game(channel, "Leave", |game, ctx| {
            game.remove_player(ctx, &player)?;
            Ok(SessionEvent::PlayerLeft {
                channel: ctx.name().to_string(),
                activity: game.id(),
                player,
            })
        })
    }

    fn with_game<F>(&mut self, channel: &str, command: &str, f: F) -> SessionEvent
    where
        F: FnOnce(&mut Activity, &mut ChannelContext) -> Result<SessionEvent, ActivityError>,
    {
        let Some(ch) = self.channels.get_mut(channel) else {
            return SessionEvent::failed(command, format!("No game in {}", channel));
        };
        let Some(game) = ch.game.as_mut() else {
            return SessionEvent::failed(command, format!("No game in {}", channel));
        };
        f(game, &mut ch.ctx).unwrap_or_else(|e| SessionEvent::failed(command, e))
    }

    // ===== Inbound lines =====

    /// Dispatch one inbound line. Returns true when it consumed a listener;
    /// unmatched lines are ordinary traffic.
    pub fn receive(&mut self, channel: &str, line: &InboundLine) -> bool {
        let Some(ch) = self.channels.get_mut(channel) else {
            return false;
        };
        let Some(pending) = ch.ctx.listeners.take_match(line) else {
            debug!(channel = %channel, "No listener for {} line", line.kind());
            return false;
        };

        match ch.game.as_mut() {
            Some(game) => {
                if !game.fire_listener(&mut ch.ctx, pending.activity, pending.continuation) {
                    debug!(channel = %channel, activity = %pending.activity, "Listener owner is gone");
                }
            }
            None => debug!(channel = %channel, "Listener fired with no game"),
        }
        self.settle_channel(channel);
        true
    }

    // ===== Timers =====

    pub fn advance(&mut self, delta_ms: u64) -> usize {
        self.advance_to(self.now_ms.saturating_add(delta_ms))
    }

    /// Fire every timer due at or before `until` in deadline order, then
    /// move the clock there. Returns how many timers fired.
    pub fn advance_to(&mut self, until: u64) -> usize {
        let mut fired = 0;

        loop {
            let due = self
                .channels
                .iter()
                .filter_map(|(name, c)| c.ctx.timers.next_deadline().map(|d| (d, name.clone())))
                .filter(|(deadline, _)| *deadline <= until)
                .min();
            let Some((deadline, name)) = due else {
                break;
            };

            self.now_ms = self.now_ms.max(deadline);
            if let Some(ch) = self.channels.get_mut(&name) {
                if let Some((handle, scheduled)) = ch.ctx.timers.pop_due(until) {
                    fired += 1;
                    let found = ch.game.as_mut().is_some_and(|game| {
                        game.fire_timer(&mut ch.ctx, scheduled.activity, handle, scheduled.continuation)
                    });
                    if !found {
                        debug!(channel = %name, activity = %scheduled.activity, "Stale timer ignored");
                    }
                }
            }
            self.settle_channel(&name);
        }

        self.now_ms = self.now_ms.max(until);
        for ch in self.channels.values_mut() {
            ch.ctx.timers.set_now(self.now_ms);
        }
        fired
    }

    // ===== Output =====

    pub fn drain_outbound(&mut self, channel: &str) -> Vec<Outbound> {
        self.channels
            .get_mut(channel)
            .map(|c| c.ctx.drain_outbound())
            .unwrap_or_default()
    }

    /// Lifecycle events in the order they happened
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    // ===== Shutdown =====

    /// Force-end the channel's game and forget the channel
    pub fn close_channel(&mut self, channel: &str) -> Vec<Outbound> {
        if let Some(ch) = self.channels.get_mut(channel) {
            if let Some(game) = ch.game.as_mut() {
                let _ = game.force_end(&mut ch.ctx, ForceEndReason::ChannelClosed);
            }
        }
        self.settle_channel(channel);
        self.channels
            .remove(channel)
            .map(|mut c| c.ctx.drain_outbound())
            .unwrap_or_default()
    }

    /// Force-end every running game
    pub fn shutdown(&mut self) {
        let names: Vec<String> = self.channels.keys().cloned().collect();
        for name in names {
            if let Some(ch) = self.channels.get_mut(&name) {
                if let Some(game) = ch.game.as_mut() {
                    let _ = game.force_end(&mut ch.ctx, ForceEndReason::Shutdown);
                }
            }
            self.settle_channel(&name);
        }
        info!("👋 All games stopped");
    }

    /// Collect events and drop a finished game, starting the channel
    /// cooldown after a normal end
    fn settle_channel(&mut self, channel: &str) {
        let now = self.now_ms;
        let Some(ch) = self.channels.get_mut(channel) else {
            return;
        };
        self.events.extend(ch.ctx.drain_events());

        let finished = ch.game.as_ref().map(|game| game.phase());
        match finished {
            Some(ActivityPhase::Ended) => {
                ch.game = None;
                if let Some(cooldown) = ch.ctx.settings().cooldown_ms {
                    ch.cooldown_until = Some(now.saturating_add(cooldown));
                    debug!(channel = %channel, "Cooldown for {}ms", cooldown);
                }
            }
            Some(ActivityPhase::ForceEnded) => {
                ch.game = None;
            }
            _ => {}
        }
    }
}
