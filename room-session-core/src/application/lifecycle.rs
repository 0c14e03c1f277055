use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::application::context::{ActivityCtx, ChannelContext, Continuation};
use crate::application::orchestrator::ChildRequest;
use crate::application::timers::TimerHandle;
use crate::application::SessionEvent;
use crate::domain::{
    ActivityError, ActivityId, ActivityKind, ActivityPhase, ActivitySettings, ForceEndReason,
    GameOptions, GameRecord, Player, PlayerId, Roster, ScoreMap, TeamSet,
};

pub type HookResult = Result<(), ActivityError>;

/// Hooks a concrete game plugs into the lifecycle.
///
/// Hooks never drive transitions themselves; they ask for them through the
/// [`ActivityCtx`] and the lifecycle applies them once the hook returns.
/// Any `Err` from a lifecycle hook aborts the activity.
pub trait Game: Send {
    /// Human-readable name
    fn name(&self) -> &str;

    /// Adjust player limits and timing before signups open
    fn configure(&mut self, _settings: &mut ActivitySettings) {}

    /// Options the game understands, with their defaults
    fn default_options(&self) -> GameOptions {
        GameOptions::new()
    }

    fn can_late_join(&self) -> bool {
        false
    }

    fn on_signups(&mut self, _ctx: &mut ActivityCtx<'_>) -> HookResult {
        Ok(())
    }

    fn on_add_player(&mut self, _ctx: &mut ActivityCtx<'_>, _player: &PlayerId) -> HookResult {
        Ok(())
    }

    /// Signups: the player is already gone. Running: already eliminated.
    fn on_remove_player(&mut self, _ctx: &mut ActivityCtx<'_>, _player: &PlayerId) -> HookResult {
        Ok(())
    }

    fn on_start(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult;

    fn on_next_round(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult;

    /// A game-defined continuation fired (timer or awaited echo)
    fn on_signal(&mut self, _ctx: &mut ActivityCtx<'_>, signal: &str) -> HookResult {
        debug!("Ignoring signal {}", signal);
        Ok(())
    }

    /// Player input. Errors other than missing state are reported back to
    /// the player and leave the game running.
    fn on_action(
        &mut self,
        _ctx: &mut ActivityCtx<'_>,
        _player: &PlayerId,
        action: &str,
        _args: &[String],
    ) -> HookResult {
        Err(ActivityError::InvalidAction(action.to_string()))
    }

    /// The inner game ended normally; players are already back in the roster
    fn on_child_end(&mut self, ctx: &mut ActivityCtx<'_>, _scores: &ScoreMap) -> HookResult {
        ctx.next_round();
        Ok(())
    }

    /// Finalize winners; runs before announcement and teardown
    fn on_end(&mut self, _ctx: &mut ActivityCtx<'_>) -> HookResult {
        Ok(())
    }

    /// Revert external side effects (moderation changes, ...)
    fn on_force_end(&mut self, _ctx: &mut ActivityCtx<'_>, _reason: &ForceEndReason) -> HookResult {
        Ok(())
    }

    /// Termination predicate checked at every round boundary
    fn should_end(&self, ctx: &ActivityCtx<'_>) -> bool {
        let remaining = ctx.roster().remaining_count();
        remaining == 0 || (ctx.settings().min_players >= 2 && remaining < 2)
    }
}

/// State transitions hooks can request
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Transition {
    Start,
    NextRound,
    End,
    ForceEnd(ForceEndReason),
}

/// Engine-owned state of one activity
#[derive(Debug)]
pub struct ActivityCore {
    pub(crate) id: ActivityId,
    pub(crate) format: String,
    pub(crate) kind: ActivityKind,
    pub(crate) phase: ActivityPhase,
    pub(crate) round: u32,
    pub(crate) settings: ActivitySettings,
    pub(crate) options: GameOptions,
    pub(crate) roster: Roster,
    pub(crate) teams: Option<TeamSet>,
    pub(crate) points: ScoreMap,
    pub(crate) winners: ScoreMap,
    /// The single outstanding timer
    pub(crate) timer: Option<TimerHandle>,
}

/// One game instance: the engine-owned core, the game's hooks and, while a
/// nested run is in progress, the inner game it owns
pub struct Activity {
    pub(crate) core: ActivityCore,
    game: Box<dyn Game>,
    pub(crate) child: Option<Box<Activity>>,
}

impl std::fmt::Debug for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Activity")
            .field("core", &self.core)
            .field("game", &self.game.name())
            .field("child", &self.child)
            .finish()
    }
}

impl Activity {
    /// Options precedence: game defaults, then `options`
    pub fn new(
        format: &str,
        kind: ActivityKind,
        mut settings: ActivitySettings,
        options: &GameOptions,
        mut game: Box<dyn Game>,
    ) -> Self {
        game.configure(&mut settings);
        let mut merged = game.default_options();
        merged.merge(options);

        Self {
            core: ActivityCore {
                id: Uuid::new_v4(),
                format: format.to_string(),
                kind,
                phase: ActivityPhase::Signups,
                round: 0,
                settings,
                options: merged,
                roster: Roster::new(),
                teams: None,
                points: ScoreMap::new(),
                winners: ScoreMap::new(),
                timer: None,
            },
            game,
            child: None,
        }
    }

    // ===== Queries =====

    pub fn id(&self) -> ActivityId {
        self.core.id
    }

    pub fn format(&self) -> &str {
        &self.core.format
    }

    pub fn name(&self) -> &str {
        self.game.name()
    }

    pub fn kind(&self) -> ActivityKind {
        self.core.kind
    }

    pub fn phase(&self) -> ActivityPhase {
        self.core.phase
    }

    pub fn round(&self) -> u32 {
        self.core.round
    }

    pub fn settings(&self) -> &ActivitySettings {
        &self.core.settings
    }

    pub fn options(&self) -> &GameOptions {
        &self.core.options
    }

    pub fn roster(&self) -> &Roster {
        &self.core.roster
    }

    pub fn teams(&self) -> Option<&TeamSet> {
        self.core.teams.as_ref()
    }

    pub fn points(&self) -> &ScoreMap {
        &self.core.points
    }

    pub fn winners(&self) -> &ScoreMap {
        &self.core.winners
    }

    pub fn has_timer(&self) -> bool {
        self.core.timer.is_some()
    }

    pub fn child(&self) -> Option<&Activity> {
        self.child.as_deref()
    }

    /// This activity or one of its nested inner games
    pub fn find(&self, id: ActivityId) -> Option<&Activity> {
        if self.core.id == id {
            return Some(self);
        }
        self.child.as_ref().and_then(|child| child.find(id))
    }

    fn child_holding(&mut self, player: &PlayerId) -> Option<&mut Activity> {
        self.child
            .as_deref_mut()
            .filter(|child| !child.phase().is_finished() && child.roster().contains(player))
    }

    // ===== Commands =====

    pub fn open_signups(&mut self, ch: &mut ChannelContext) {
        info!(activity = %self.core.id, format = %self.core.format, "📝 Signups open");
        ch.emit(SessionEvent::SignupsOpened {
            channel: ch.name().to_string(),
            activity: self.core.id,
            format: self.core.format.clone(),
        });

        if let Some(timeout) = self.core.settings.signup_timeout_ms {
            let mut ctx = ActivityCtx::new(&mut self.core, ch);
            ctx.set_timeout(timeout, Continuation::StartGame);
        }

        let next = self.run_hook(ch, "on_signups", |game, ctx| game.on_signups(ctx));
        self.apply(ch, next);
        self.settle(ch);
    }

    pub fn add_player(
        &mut self,
        ch: &mut ChannelContext,
        name: &str,
    ) -> Result<PlayerId, ActivityError> {
        match self.core.phase {
            ActivityPhase::Signups => {}
            ActivityPhase::Running if self.game.can_late_join() => {}
            _ => return Err(ActivityError::NotInSignups),
        }
        if let Some(max) = self.core.settings.max_players {
            if self.core.roster.len() >= max {
                return Err(ActivityError::Full(max));
            }
        }

        let player = Player::new(name)?;
        let id = self.core.roster.add(player)?.id().clone();
        debug!(activity = %self.core.id, "➕ {} joined", id);

        let mut next = self.run_hook(ch, "on_add_player", |game, ctx| {
            game.on_add_player(ctx, &id)
        });

        let full = self
            .core
            .settings
            .max_players
            .is_some_and(|max| self.core.roster.len() >= max);
        if next.is_none() && full && self.core.phase == ActivityPhase::Signups {
            info!(activity = %self.core.id, "Player cap reached, starting");
            next = Some(Transition::Start);
        }

        self.apply(ch, next);
        self.settle(ch);
        Ok(id)
    }

    /// Signups: the player leaves. Running: the player is eliminated.
    pub fn remove_player(
        &mut self,
        ch: &mut ChannelContext,
        player: &PlayerId,
    ) -> Result<(), ActivityError> {
        if let Some(child) = self.child_holding(player) {
            let result = child.remove_player(ch, player);
            self.settle(ch);
            return result;
        }

        match self.core.phase {
            ActivityPhase::Signups => {
                self.core.roster.remove(player)?;
            }
            ActivityPhase::Running => {
                let mut ctx = ActivityCtx::new(&mut self.core, ch);
                ctx.eliminate_player(player)?;
            }
            _ => return Err(ActivityError::NotRunning),
        }
        debug!(activity = %self.core.id, "➖ {} left", player);

        let next = self.run_hook(ch, "on_remove_player", |game, ctx| {
            game.on_remove_player(ctx, player)
        });
        self.apply(ch, next);
        self.settle(ch);
        Ok(())
    }

    /// Close signups manually
    pub fn start(&mut self, ch: &mut ChannelContext) -> Result<(), ActivityError> {
        if self.core.phase != ActivityPhase::Signups {
            return Err(ActivityError::NotInSignups);
        }
        let required = self.core.settings.min_players;
        let actual = self.core.roster.len();
        if actual < required {
            return Err(ActivityError::NotEnoughPlayers { required, actual });
        }

        self.apply(ch, Some(Transition::Start));
        self.settle(ch);
        Ok(())
    }

    /// Explicit end request
    pub fn end(&mut self, ch: &mut ChannelContext) -> Result<(), ActivityError> {
        if self.core.phase != ActivityPhase::Running {
            return Err(ActivityError::NotRunning);
        }
        self.apply(ch, Some(Transition::End));
        Ok(())
    }

    pub fn force_end(
        &mut self,
        ch: &mut ChannelContext,
        reason: ForceEndReason,
    ) -> Result<(), ActivityError> {
        if self.core.phase.is_finished() {
            return Err(ActivityError::NotRunning);
        }
        self.apply(ch, Some(Transition::ForceEnd(reason)));
        Ok(())
    }

    /// Route a player action to the innermost activity holding the player
    pub fn handle_action(
        &mut self,
        ch: &mut ChannelContext,
        player: &PlayerId,
        action: &str,
        args: &[String],
    ) -> Result<(), ActivityError> {
        if let Some(child) = self.child_holding(player) {
            let result = child.handle_action(ch, player, action, args);
            self.settle(ch);
            return result;
        }

        if self.core.phase.is_finished() {
            return Err(ActivityError::NotRunning);
        }
        if !self.core.roster.contains(player) {
            return Err(ActivityError::PlayerNotFound(player.clone()));
        }

        let (result, transition, spawn) =
            self.call(ch, |game, ctx| game.on_action(ctx, player, action, args));

        match result {
            Ok(()) => {
                let next = self.after_hook(ch, transition, spawn);
                self.apply(ch, next);
                self.settle(ch);
                Ok(())
            }
            Err(e) if e.is_fatal() => {
                error!(activity = %self.core.id, "💥 on_action failed: {}", e);
                self.apply(ch, Some(Transition::ForceEnd(ForceEndReason::Fault(e.to_string()))));
                Err(e)
            }
            Err(e) => {
                debug!(activity = %self.core.id, "Action {} rejected: {}", action, e);
                Err(e)
            }
        }
    }

    // ===== Timers and listeners =====

    /// Deliver a fired timer. Returns false when no activity in this tree
    /// has the target id.
    pub fn fire_timer(
        &mut self,
        ch: &mut ChannelContext,
        target: ActivityId,
        handle: TimerHandle,
        continuation: Continuation,
    ) -> bool {
        self.route(ch, target, move |activity, ch| {
            if activity.core.timer == Some(handle) {
                activity.core.timer = None;
            }
            activity.resume(ch, continuation);
        })
    }

    /// Deliver a matched listener
    pub fn fire_listener(
        &mut self,
        ch: &mut ChannelContext,
        target: ActivityId,
        continuation: Continuation,
    ) -> bool {
        self.route(ch, target, move |activity, ch| activity.resume(ch, continuation))
    }

    fn route<F>(&mut self, ch: &mut ChannelContext, target: ActivityId, f: F) -> bool
    where
        F: FnOnce(&mut Activity, &mut ChannelContext),
    {
        let found = if self.core.id == target {
            f(self, ch);
            true
        } else if let Some(child) = self.child.as_deref_mut() {
            child.route(ch, target, f)
        } else {
            false
        };
        self.settle(ch);
        found
    }

    fn resume(&mut self, ch: &mut ChannelContext, continuation: Continuation) {
        if self.core.phase.is_finished() {
            debug!(activity = %self.core.id, "Stale {:?} ignored", continuation);
            return;
        }

        let next = match continuation {
            Continuation::StartGame => self.signup_deadline(ch),
            Continuation::NextRound => Some(Transition::NextRound),
            Continuation::ArmNextRound => {
                if self.core.phase == ActivityPhase::Running {
                    ActivityCtx::new(&mut self.core, ch).arm_next_round();
                }
                None
            }
            Continuation::End => Some(Transition::End),
            Continuation::Signal(signal) => {
                self.run_hook(ch, "on_signal", |game, ctx| game.on_signal(ctx, &signal))
            }
        };
        self.apply(ch, next);
    }

    fn signup_deadline(&mut self, ch: &mut ChannelContext) -> Option<Transition> {
        if self.core.phase != ActivityPhase::Signups {
            return None;
        }
        if self.core.roster.len() >= self.core.settings.min_players {
            return Some(Transition::Start);
        }
        ch.say(format!(
            "Not enough players joined {}, the game has been cancelled.",
            self.game.name()
        ));
        Some(Transition::ForceEnd(ForceEndReason::NotEnoughPlayers))
    }

    // ===== Hook plumbing =====

    fn call<F>(
        &mut self,
        ch: &mut ChannelContext,
        f: F,
    ) -> (HookResult, Option<Transition>, Option<ChildRequest>)
    where
        F: FnOnce(&mut dyn Game, &mut ActivityCtx<'_>) -> HookResult,
    {
        let mut ctx = ActivityCtx::new(&mut self.core, ch);
        let result = f(self.game.as_mut(), &mut ctx);
        let (transition, spawn) = ctx.into_requests();
        (result, transition, spawn)
    }

    /// Run a lifecycle hook; an error aborts the activity
    pub(crate) fn run_hook<F>(
        &mut self,
        ch: &mut ChannelContext,
        hook: &str,
        f: F,
    ) -> Option<Transition>
    where
        F: FnOnce(&mut dyn Game, &mut ActivityCtx<'_>) -> HookResult,
    {
        let (result, transition, spawn) = self.call(ch, f);
        match result {
            Ok(()) => self.after_hook(ch, transition, spawn),
            Err(e) => {
                error!(activity = %self.core.id, "💥 {} failed: {}", hook, e);
                Some(Transition::ForceEnd(ForceEndReason::Fault(e.to_string())))
            }
        }
    }

    fn after_hook(
        &mut self,
        ch: &mut ChannelContext,
        transition: Option<Transition>,
        spawn: Option<ChildRequest>,
    ) -> Option<Transition> {
        if let Some(Transition::ForceEnd(_)) = transition {
            return transition;
        }
        match spawn {
            Some(request) => match self.spawn_child(ch, request) {
                Ok(()) => transition,
                Err(reason) => Some(Transition::ForceEnd(reason)),
            },
            None => transition,
        }
    }

    /// Run a teardown hook; errors are logged and never stop teardown
    fn run_final_hook<F>(&mut self, ch: &mut ChannelContext, hook: &str, f: F)
    where
        F: FnOnce(&mut dyn Game, &mut ActivityCtx<'_>) -> HookResult,
    {
        let (result, _, spawn) = self.call(ch, f);
        if let Err(e) = result {
            error!(activity = %self.core.id, "💥 {} failed: {}", hook, e);
        }
        if spawn.is_some() {
            warn!(activity = %self.core.id, "Inner game requested during {} ignored", hook);
        }
    }

    // ===== Transitions =====

    /// Apply transitions until the chain settles. Each step may request the
    /// next one (e.g. a round boundary that meets the end condition). Once
    /// every player is eliminated the game ends without waiting for a round
    /// boundary.
    pub(crate) fn apply(&mut self, ch: &mut ChannelContext, mut next: Option<Transition>) {
        loop {
            let transition = match next.take() {
                Some(transition) => transition,
                None if self.everyone_eliminated() => {
                    info!(activity = %self.core.id, "Every player is out");
                    Transition::End
                }
                None => break,
            };
            if self.core.phase.is_finished() {
                break;
            }
            next = match transition {
                Transition::Start => self.begin(ch),
                Transition::NextRound => self.advance_round(ch),
                Transition::End => {
                    self.finish(ch);
                    None
                }
                Transition::ForceEnd(reason) => {
                    self.terminate(ch, reason);
                    None
                }
            };
        }
    }

    /// Lent players are not in the roster, so a convener waiting on its
    /// inner game never counts as emptied
    fn everyone_eliminated(&self) -> bool {
        self.core.phase == ActivityPhase::Running
            && self.child.is_none()
            && !self.core.roster.is_empty()
            && self.core.roster.not_eliminated().is_empty()
    }

    fn begin(&mut self, ch: &mut ChannelContext) -> Option<Transition> {
        if self.core.phase != ActivityPhase::Signups {
            return None;
        }

        ActivityCtx::new(&mut self.core, ch).clear_timeout();
        self.core.phase = ActivityPhase::Running;
        self.core.round = 0;

        let players = self.core.roster.ids();
        info!(
            activity = %self.core.id,
            players = players.len(),
            "🚀 {} started",
            self.game.name()
        );
        ch.emit(SessionEvent::GameStarted {
            channel: ch.name().to_string(),
            activity: self.core.id,
            players,
        });

        self.run_hook(ch, "on_start", |game, ctx| game.on_start(ctx))
    }

    fn advance_round(&mut self, ch: &mut ChannelContext) -> Option<Transition> {
        if self.core.phase != ActivityPhase::Running {
            return None;
        }
        if self.child.is_some() {
            debug!(activity = %self.core.id, "Round advance waits for the inner game");
            return None;
        }

        let ctx = ActivityCtx::new(&mut self.core, ch);
        if self.game.should_end(&ctx) {
            return Some(Transition::End);
        }

        self.core.round += 1;
        debug!(activity = %self.core.id, "🔄 Round {}", self.core.round);
        ch.emit(SessionEvent::RoundStarted {
            channel: ch.name().to_string(),
            activity: self.core.id,
            round: self.core.round,
        });

        self.run_hook(ch, "on_next_round", |game, ctx| game.on_next_round(ctx))
    }

    fn finish(&mut self, ch: &mut ChannelContext) {
        self.retire_child(ch);
        self.run_final_hook(ch, "on_end", |game, ctx| game.on_end(ctx));
        self.core.phase = ActivityPhase::Ended;

        if self.core.kind.is_standalone() {
            self.announce_winners(ch);
            self.record_outcome(ch);
        }
        self.teardown(ch);

        info!(
            activity = %self.core.id,
            winners = self.core.winners.len(),
            "🏁 {} ended",
            self.game.name()
        );
        ch.emit(SessionEvent::GameEnded {
            channel: ch.name().to_string(),
            activity: self.core.id,
            winners: self.core.winners.clone(),
        });
    }

    fn terminate(&mut self, ch: &mut ChannelContext, reason: ForceEndReason) {
        self.retire_child(ch);
        self.run_final_hook(ch, "on_force_end", |game, ctx| game.on_force_end(ctx, &reason));
        self.core.phase = ActivityPhase::ForceEnded;
        self.teardown(ch);

        warn!(activity = %self.core.id, "🛑 {} force-ended: {}", self.game.name(), reason);
        ch.emit(SessionEvent::GameForceEnded {
            channel: ch.name().to_string(),
            activity: self.core.id,
            reason,
        });
    }

    /// Release timers, listeners and teams. The roster stays so the owner
    /// can take lent players back.
    fn teardown(&mut self, ch: &mut ChannelContext) {
        ActivityCtx::new(&mut self.core, ch).clear_timeout();

        let id = self.core.id;
        let purged = ch.listeners.retain(|pending| pending.activity != id);
        if purged > 0 {
            debug!(activity = %id, "Purged {} unconsumed listener(s)", purged);
        }

        if self.core.teams.take().is_some() {
            for player in self.core.roster.iter_mut() {
                player.set_team(None);
            }
        }
    }

    fn announce_winners(&self, ch: &mut ChannelContext) {
        if self.core.winners.is_empty() {
            ch.say("No winners this game!");
            return;
        }

        let names: Vec<String> = self
            .core
            .winners
            .keys()
            .map(|id| self.core.roster.display_name(id))
            .collect();
        let plural = if names.len() > 1 { "s" } else { "" };
        ch.say(format!("Winner{}: {}", plural, names.join(", ")));
    }

    fn record_outcome(&self, ch: &mut ChannelContext) {
        let record = GameRecord {
            activity: self.core.id,
            channel: ch.name().to_string(),
            format: self.core.format.clone(),
            players: self.core.roster.ids(),
            winners: self.core.winners.clone(),
            points: self.core.points.clone(),
            rounds: self.core.round,
        };

        if let Err(e) = ch.recorder().record(&record) {
            error!(activity = %self.core.id, "Failed to record outcome: {}", e);
        }
    }
}
