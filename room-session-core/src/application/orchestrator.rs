use std::cmp::Ordering;
use tracing::{info, warn};

use crate::application::catalog::FormatSpec;
use crate::application::context::ChannelContext;
use crate::application::lifecycle::{Activity, Transition};
use crate::application::SessionEvent;
use crate::domain::{
    ActivityKind, ActivityPhase, ForceEndReason, GameOptions, PlayerId, Roster, ScoreMap,
};

/// Points used by a head-to-head inner game that scores with points when
/// nothing else is configured
pub const DEFAULT_CHALLENGE_POINTS: i64 = 10;

/// A convener's request for an inner game
#[derive(Debug, Clone, PartialEq)]
pub struct ChildRequest {
    pub spec: FormatSpec,
    /// Moved from the convener's roster into the inner game's
    pub players: Vec<PlayerId>,
    pub min_players: usize,
    /// Apply the configured challenge options for the format
    pub head_to_head: bool,
}

impl ChildRequest {
    pub fn new(spec: FormatSpec, players: Vec<PlayerId>) -> Self {
        Self {
            spec,
            players,
            min_players: 2,
            head_to_head: false,
        }
    }

    pub fn head_to_head(mut self) -> Self {
        self.head_to_head = true;
        self
    }
}

/// Head-to-head outcome: an eliminated side loses, otherwise the strictly
/// greater score wins and a tie has no winner
pub fn head_to_head_winner(
    roster: &Roster,
    first: &PlayerId,
    second: &PlayerId,
    scores: &ScoreMap,
) -> Option<PlayerId> {
    let out = |id: &PlayerId| roster.get(id).map_or(true, |player| player.is_eliminated());

    match (out(first), out(second)) {
        (true, true) => return None,
        (true, false) => return Some(second.clone()),
        (false, true) => return Some(first.clone()),
        (false, false) => {}
    }

    let score = |id: &PlayerId| scores.get(id).copied().unwrap_or(0);
    match score(first).cmp(&score(second)) {
        Ordering::Greater => Some(first.clone()),
        Ordering::Less => Some(second.clone()),
        Ordering::Equal => None,
    }
}

impl Activity {
    /// Create, configure and start an inner game owned by this activity.
    ///
    /// On failure nothing has been lent and the returned reason is what the
    /// convener should force-end with.
    pub(crate) fn spawn_child(
        &mut self,
        ch: &mut ChannelContext,
        request: ChildRequest,
    ) -> Result<(), ForceEndReason> {
        let format = request.spec.format.clone();

        let Some(game) = ch.catalog().create(&request.spec) else {
            warn!(activity = %self.core.id, "Inner game {} could not be created", format);
            ch.say(format!(
                "Error: the format {} could not be started. The game has been cancelled.",
                format
            ));
            return Err(ForceEndReason::SpawnFailed(format));
        };

        // defaults < format config < challenge config < convener overrides
        let mut options = GameOptions::new();
        if let Some(configured) = ch.config().format_options(&format) {
            options.merge(configured);
        }
        if request.head_to_head {
            let challenge = ch.config().challenge_options(&format).cloned();
            if let Some(challenge) = &challenge {
                options.merge(challenge);
            }
            let points_configured = challenge.is_some_and(|c| c.contains("points"))
                || request.spec.options.contains("points");
            if game.default_options().contains("points") && !points_configured {
                options.set("points", DEFAULT_CHALLENGE_POINTS);
            }
        }
        options.merge(&request.spec.options);

        let mut settings = ch.settings().activity_settings();
        settings.min_players = request.min_players;
        settings.max_players = None;
        settings.signup_timeout_ms = None;

        let roster = match self.core.roster.lend(&request.players) {
            Ok(roster) => roster,
            Err(e) => {
                warn!(activity = %self.core.id, "Cannot lend players to {}: {}", format, e);
                return Err(ForceEndReason::SpawnFailed(format));
            }
        };

        let mut child = Activity::new(
            &format,
            ActivityKind::Child {
                parent: self.core.id,
            },
            settings,
            &options,
            game,
        );
        child.core.roster = roster;

        info!(
            parent = %self.core.id,
            child = %child.id(),
            "🎲 Spawned inner game {}",
            format
        );
        ch.emit(SessionEvent::ChildSpawned {
            channel: ch.name().to_string(),
            parent: self.core.id,
            child: child.id(),
            format,
        });

        // Inherited players go straight from signups into the game
        child.open_signups(ch);
        if child.phase() == ActivityPhase::Signups {
            if let Err(e) = child.start(ch) {
                warn!(child = %child.id(), "Inner game could not start: {}", e);
                let _ = child.force_end(ch, ForceEndReason::NotEnoughPlayers);
            }
        }

        self.child = Some(Box::new(child));
        Ok(())
    }

    /// Fold finished inner games back into this activity
    pub(crate) fn settle(&mut self, ch: &mut ChannelContext) {
        loop {
            let finished = match self.child.as_deref_mut() {
                Some(child) => {
                    child.settle(ch);
                    child.phase().is_finished()
                }
                None => false,
            };
            if !finished {
                break;
            }
            let Some(child) = self.child.take() else {
                break;
            };
            let next = self.reap_child(ch, *child);
            self.apply(ch, next);
        }
    }

    fn reap_child(&mut self, ch: &mut ChannelContext, child: Activity) -> Option<Transition> {
        let child_id = child.id();
        let phase = child.phase();
        let format = child.format().to_string();
        let scores = child.core.winners.clone();
        self.core.roster.absorb(child.core.roster);

        if self.core.phase.is_finished() {
            return None;
        }

        match phase {
            ActivityPhase::Ended => {
                info!(parent = %self.core.id, child = %child_id, "Inner game {} completed", format);
                ch.emit(SessionEvent::ChildCompleted {
                    channel: ch.name().to_string(),
                    parent: self.core.id,
                    child: child_id,
                    scores: scores.clone(),
                });
                self.run_hook(ch, "on_child_end", |game, ctx| {
                    game.on_child_end(ctx, &scores)
                })
            }
            _ => {
                ch.say(format!("The {} game was forcibly ended.", format));
                Some(Transition::ForceEnd(ForceEndReason::ChildFailed))
            }
        }
    }

    /// Stop a running inner game because this activity is finishing
    pub(crate) fn retire_child(&mut self, ch: &mut ChannelContext) {
        if let Some(mut child) = self.child.take() {
            if !child.phase().is_finished() {
                let _ = child.force_end(ch, ForceEndReason::ParentEnded);
            }
            self.core.roster.absorb(child.core.roster);
        }
    }
}
