use rand::seq::{IndexedRandom, SliceRandom};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::application::catalog::GameCatalog;
use crate::application::lifecycle::{ActivityCore, Transition};
use crate::application::listeners::{ListenerKey, ListenerRegistry};
use crate::application::orchestrator::ChildRequest;
use crate::application::timers::{TimerHandle, TimerQueue};
use crate::application::SessionEvent;
use crate::config::{ChannelSettings, EngineConfig};
use crate::domain::{
    team_name_lists, ActivityError, ActivityId, ActivityKind, ActivityPhase, ActivitySettings,
    ForceEndReason, GameOptions, ModerationChange, Outbound, PlayerId, Roster, ScoreMap, Team,
    TeamError, TeamId, TeamSet,
};
use crate::recorder::OutcomeRecorder;

/// What to do when a timer fires or an awaited echo arrives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Continuation {
    /// Signup timeout: start, or give up without enough players
    StartGame,
    /// Run the next round boundary now
    NextRound,
    /// Arm the round-delay timer for the next round
    ArmNextRound,
    /// End through the normal path
    End,
    /// Game-defined step, delivered to `Game::on_signal`
    Signal(String),
}

/// A listener entry: who registered it and how to resume
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingListener {
    pub activity: ActivityId,
    pub continuation: Continuation,
}

/// A timer entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduled {
    pub activity: ActivityId,
    pub continuation: Continuation,
}

/// Everything one channel's activities share: listeners, timers, output
/// and the collaborators handed in at the composition root
pub struct ChannelContext {
    name: String,
    settings: ChannelSettings,
    config: Arc<EngineConfig>,
    catalog: Arc<GameCatalog>,
    recorder: Arc<dyn OutcomeRecorder>,
    pub(crate) listeners: ListenerRegistry<PendingListener>,
    pub(crate) timers: TimerQueue<Scheduled>,
    outbox: Vec<Outbound>,
    events: Vec<SessionEvent>,
    rng: ChaCha8Rng,
    /// When each challenger last finished a challenge
    challenges: HashMap<PlayerId, u64>,
}

impl ChannelContext {
    pub fn new(
        name: &str,
        config: Arc<EngineConfig>,
        catalog: Arc<GameCatalog>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Self {
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(channel_seed(seed, name)),
            None => ChaCha8Rng::from_rng(&mut rand::rng()),
        };

        Self {
            name: name.to_string(),
            settings: config.channel(name),
            config,
            catalog,
            recorder,
            listeners: ListenerRegistry::new(),
            timers: TimerQueue::new(),
            outbox: Vec::new(),
            events: Vec::new(),
            rng,
            challenges: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &GameCatalog {
        &self.catalog
    }

    pub fn recorder(&self) -> &dyn OutcomeRecorder {
        self.recorder.as_ref()
    }

    pub fn now_ms(&self) -> u64 {
        self.timers.now_ms()
    }

    pub fn listeners(&self) -> &ListenerRegistry<PendingListener> {
        &self.listeners
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn send(&mut self, out: Outbound) {
        debug!(channel = %self.name, "📤 {}", out);
        self.outbox.push(out);
    }

    pub fn say(&mut self, content: impl Into<String>) {
        self.send(Outbound::Text {
            content: content.into(),
        });
    }

    pub fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    pub fn drain_outbound(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.outbox)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn record_challenge(&mut self, challenger: &PlayerId) {
        let now = self.now_ms();
        self.challenges.insert(challenger.clone(), now);
    }

    /// Milliseconds until `challenger` may challenge again (0 when free)
    pub fn challenge_wait_ms(&self, challenger: &PlayerId) -> u64 {
        let (Some(cooldown), Some(last)) = (
            self.settings.challenge_cooldown_ms,
            self.challenges.get(challenger),
        ) else {
            return 0;
        };
        (last + cooldown).saturating_sub(self.now_ms())
    }
}

fn channel_seed(seed: u64, channel: &str) -> u64 {
    channel
        .bytes()
        .fold(seed, |hash, byte| hash.rotate_left(5) ^ u64::from(byte))
}

/// View handed to game hooks: the hook's own activity plus the channel.
///
/// Transitions requested here are applied by the lifecycle after the hook
/// returns, never re-entrantly.
pub struct ActivityCtx<'a> {
    core: &'a mut ActivityCore,
    channel: &'a mut ChannelContext,
    transition: Option<Transition>,
    spawn: Option<ChildRequest>,
}

impl<'a> ActivityCtx<'a> {
    pub(crate) fn new(core: &'a mut ActivityCore, channel: &'a mut ChannelContext) -> Self {
        Self {
            core,
            channel,
            transition: None,
            spawn: None,
        }
    }

    pub(crate) fn into_requests(self) -> (Option<Transition>, Option<ChildRequest>) {
        (self.transition, self.spawn)
    }

    // ===== Queries =====

    pub fn id(&self) -> ActivityId {
        self.core.id
    }

    pub fn format(&self) -> &str {
        &self.core.format
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

    pub fn channel_settings(&self) -> &ChannelSettings {
        self.channel.settings()
    }

    pub fn options(&self) -> &GameOptions {
        &self.core.options
    }

    pub fn roster(&self) -> &Roster {
        &self.core.roster
    }

    pub fn points(&self) -> &ScoreMap {
        &self.core.points
    }

    pub fn winners(&self) -> &ScoreMap {
        &self.core.winners
    }

    pub fn now_ms(&self) -> u64 {
        self.channel.now_ms()
    }

    pub fn display_name(&self, player: &PlayerId) -> String {
        self.core.roster.display_name(player)
    }

    pub fn is_ending(&self) -> bool {
        matches!(
            self.transition,
            Some(Transition::End) | Some(Transition::ForceEnd(_))
        )
    }

    // ===== Output =====

    pub fn say(&mut self, content: impl Into<String>) {
        self.channel.say(content);
    }

    pub fn say_uhtml(&mut self, name: &str, content: impl Into<String>) {
        self.channel.send(Outbound::NamedUpdate {
            name: name.to_string(),
            content: content.into(),
        });
    }

    pub fn say_private(&mut self, to: &PlayerId, content: impl Into<String>) {
        self.channel.send(Outbound::Private {
            to: to.clone(),
            content: content.into(),
        });
    }

    pub fn moderate(&mut self, change: ModerationChange) {
        self.channel.send(Outbound::Moderation { change });
    }

    pub fn record_challenge(&mut self, challenger: &PlayerId) {
        self.channel.record_challenge(challenger);
    }

    // ===== Listeners =====

    fn listen(&mut self, key: ListenerKey, continuation: Continuation) {
        debug!(activity = %self.core.id, "👂 awaiting {}", key);
        self.channel.listeners.register(
            key,
            PendingListener {
                activity: self.core.id,
                continuation,
            },
        );
    }

    pub fn on_text(&mut self, content: &str, continuation: Continuation) {
        self.listen(ListenerKey::text(content), continuation);
    }

    pub fn on_html(&mut self, content: &str, continuation: Continuation) {
        self.listen(ListenerKey::html(content), continuation);
    }

    pub fn on_uhtml(&mut self, name: &str, content: &str, continuation: Continuation) {
        self.listen(ListenerKey::named_update(name, content), continuation);
    }

    /// Send text and resume once the server echoes it
    pub fn say_and_await(&mut self, content: &str, continuation: Continuation) {
        self.on_text(content, continuation);
        self.say(content);
    }

    /// Render a named block and resume once the server echoes it
    pub fn say_uhtml_and_await(&mut self, name: &str, content: &str, continuation: Continuation) {
        self.on_uhtml(name, content, continuation);
        self.say_uhtml(name, content);
    }

    // ===== Timers =====

    /// Arm the activity's single timer; any previous unfired one is cancelled
    pub fn set_timeout(&mut self, delay_ms: u64, continuation: Continuation) -> TimerHandle {
        self.clear_timeout();
        let handle = self.channel.timers.arm(
            delay_ms,
            Scheduled {
                activity: self.core.id,
                continuation,
            },
        );
        self.core.timer = Some(handle);
        handle
    }

    pub fn clear_timeout(&mut self) {
        if let Some(handle) = self.core.timer.take() {
            self.channel.timers.cancel(handle);
        }
    }

    pub fn has_timeout(&self) -> bool {
        self.core
            .timer
            .is_some_and(|handle| self.channel.timers.is_pending(handle))
    }

    /// Next round after the configured round delay
    pub fn arm_next_round(&mut self) -> TimerHandle {
        let delay = self.core.settings.round_delay_ms;
        self.set_timeout(delay, Continuation::NextRound)
    }

    // ===== Transitions =====

    fn request(&mut self, transition: Transition) {
        match (&self.transition, &transition) {
            (Some(Transition::ForceEnd(_)), _) => {}
            (Some(Transition::End), Transition::Start | Transition::NextRound) => {}
            _ => self.transition = Some(transition),
        }
    }

    pub fn start(&mut self) {
        self.request(Transition::Start);
    }

    pub fn next_round(&mut self) {
        self.request(Transition::NextRound);
    }

    pub fn end(&mut self) {
        self.request(Transition::End);
    }

    pub fn abort(&mut self, reason: ForceEndReason) {
        self.request(Transition::ForceEnd(reason));
    }

    /// Ask the lifecycle to run an inner game once this hook returns
    pub fn spawn_child(&mut self, request: ChildRequest) {
        if self.spawn.is_some() {
            warn!(activity = %self.core.id, "Replacing pending inner game request");
        }
        self.spawn = Some(request);
    }

    // ===== Players =====

    pub fn eliminate_player(&mut self, player: &PlayerId) -> Result<(), ActivityError> {
        self.core.roster.eliminate(player)?;
        self.channel.emit(SessionEvent::PlayerEliminated {
            channel: self.channel.name().to_string(),
            activity: self.core.id,
            player: player.clone(),
        });
        Ok(())
    }

    pub fn freeze_player(&mut self, player: &PlayerId) -> Result<(), ActivityError> {
        self.core.roster.freeze(player)?;
        Ok(())
    }

    /// Add to a player's points (and their team's); returns the new total
    pub fn add_points(&mut self, player: &PlayerId, points: i64) -> Result<i64, ActivityError> {
        let team = self
            .core
            .roster
            .get(player)
            .ok_or_else(|| ActivityError::PlayerNotFound(player.clone()))?
            .team()
            .cloned();

        let total = self.core.points.get(player).copied().unwrap_or(0) + points;
        if total == 0 {
            self.core.points.remove(player);
        } else {
            self.core.points.insert(player.clone(), total);
        }

        if let (Some(team), Some(teams)) = (team, self.core.teams.as_mut()) {
            if let Some(team) = teams.get_mut(&team) {
                team.points += points;
            }
        }
        Ok(total)
    }

    pub fn set_winner(&mut self, player: &PlayerId, score: i64) {
        self.core.winners.insert(player.clone(), score);
    }

    pub fn rng(&mut self) -> &mut ChaCha8Rng {
        &mut self.channel.rng
    }

    pub fn roll_die(&mut self, sides: u32) -> u32 {
        self.channel.rng.random_range(1..=sides.max(1))
    }

    /// Remaining players in random order
    pub fn shuffled_players(&mut self) -> Vec<PlayerId> {
        let mut ids: Vec<PlayerId> = self
            .core
            .roster
            .remaining()
            .into_iter()
            .map(|p| p.id().clone())
            .collect();
        ids.shuffle(&mut self.channel.rng);
        ids
    }

    // ===== Teams =====

    pub fn teams(&self) -> Result<&TeamSet, ActivityError> {
        self.core
            .teams
            .as_ref()
            .ok_or(ActivityError::MissingState("teams"))
    }

    /// Shuffle the remaining players round-robin into `count` teams
    pub fn generate_teams(
        &mut self,
        count: usize,
        names: Option<Vec<String>>,
    ) -> Result<&TeamSet, ActivityError> {
        let names = match names {
            Some(names) => names,
            None => {
                let lists = team_name_lists(count);
                let list = lists
                    .choose(&mut self.channel.rng)
                    .ok_or(TeamError::NoNamesFor(count))?;
                list.iter().map(|name| name.to_string()).collect()
            }
        };
        if names.len() != count {
            return Err(TeamError::NameCountMismatch {
                expected: count,
                actual: names.len(),
            }
            .into());
        }

        let players = self.shuffled_players();
        let teams = TeamSet::split(&players, &names)?;

        for team in teams.iter() {
            for member in team.members() {
                if let Some(player) = self.core.roster.get_mut(member) {
                    player.set_team(Some(team.id().clone()));
                }
            }
        }
        let teams = self.core.teams.insert(teams);
        Ok(&*teams)
    }

    /// Move a player to another team, taking their points along
    pub fn change_player_team(
        &mut self,
        player: &PlayerId,
        team: &TeamId,
    ) -> Result<(), ActivityError> {
        let points = self.core.points.get(player).copied().unwrap_or(0);
        let teams = self
            .core
            .teams
            .as_mut()
            .ok_or(ActivityError::MissingState("teams"))?;
        teams.move_player(player, team, points)?;

        self.core
            .roster
            .get_mut(player)
            .ok_or_else(|| ActivityError::PlayerNotFound(player.clone()))?
            .set_team(Some(team.clone()));
        Ok(())
    }

    fn remaining_members(&self, team: &Team) -> usize {
        team.members()
            .iter()
            .filter(|id| self.core.roster.get(id).is_some_and(|p| p.is_active()))
            .count()
    }

    /// Team with the most remaining players (earliest on ties)
    pub fn largest_team(&self) -> Result<&Team, ActivityError> {
        let teams = self.teams()?;
        let mut best: Option<(&Team, usize)> = None;
        for team in teams.iter() {
            let count = self.remaining_members(team);
            if best.map_or(true, |(_, most)| count > most) {
                best = Some((team, count));
            }
        }
        best.map(|(team, _)| team)
            .ok_or(ActivityError::MissingState("teams"))
    }

    /// The only team that still has remaining players, if exactly one does
    pub fn final_team(&self) -> Result<Option<&Team>, ActivityError> {
        let alive: Vec<&Team> = self
            .teams()?
            .iter()
            .filter(|team| self.remaining_members(team) > 0)
            .collect();
        Ok(if alive.len() == 1 { Some(alive[0]) } else { None })
    }

    /// Teams without remaining players
    pub fn empty_teams(&self) -> Result<Vec<&Team>, ActivityError> {
        Ok(self
            .teams()?
            .iter()
            .filter(|team| self.remaining_members(team) == 0)
            .collect())
    }

    /// Random turn order of each team's remaining players
    pub fn team_player_orders(
        &mut self,
    ) -> Result<BTreeMap<TeamId, Vec<PlayerId>>, ActivityError> {
        let mut orders = BTreeMap::new();
        for team in self.teams()?.iter() {
            let members: Vec<PlayerId> = team
                .members()
                .iter()
                .filter(|id| self.core.roster.get(id).is_some_and(|p| p.is_active()))
                .cloned()
                .collect();
            orders.insert(team.id().clone(), members);
        }
        for members in orders.values_mut() {
            members.shuffle(&mut self.channel.rng);
        }
        Ok(orders)
    }
}
