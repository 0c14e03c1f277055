use tracing::debug;

use crate::application::{ActivityCtx, Continuation, Game, HookResult};
use crate::domain::{ActivityError, GameOptions, PlayerId, Team};

/// Each round renders a banner, waits for its echo and then opens for
/// claims; the first claim of a round scores a point. First to `points` wins.
///
/// With `teams` set to 2, 3 or 4 the players are split into teams on start,
/// claims score for the claimer's team and the first team to `points` wins.
#[derive(Debug, Default)]
pub struct PointRace {
    open: bool,
}

impl PointRace {
    pub const FORMAT: &'static str = "pointrace";
    pub const DEFAULT_POINTS: i64 = 3;

    pub fn new() -> Self {
        Self::default()
    }

    fn uhtml_name(ctx: &ActivityCtx<'_>) -> String {
        format!("{}-round", ctx.format())
    }

    fn team_mode(ctx: &ActivityCtx<'_>) -> bool {
        ctx.teams().is_ok()
    }

    fn announce_teams(ctx: &mut ActivityCtx<'_>, count: i64) -> HookResult {
        let count = usize::try_from(count)
            .map_err(|_| ActivityError::InvalidAction(format!("{} teams", count)))?;
        let teams: Vec<(String, Vec<PlayerId>)> = ctx
            .generate_teams(count, None)?
            .iter()
            .map(|team| (team.name().to_string(), team.members().to_vec()))
            .collect();

        for (name, members) in teams {
            let names: Vec<String> = members.iter().map(|id| ctx.display_name(id)).collect();
            ctx.say(format!("Team {}: {}", name, names.join(", ")));
        }
        Ok(())
    }

    fn award_team(ctx: &mut ActivityCtx<'_>, team: &Team) {
        let members: Vec<PlayerId> = team
            .members()
            .iter()
            .filter(|id| ctx.roster().get(id).is_some_and(|p| !p.is_eliminated()))
            .cloned()
            .collect();
        for id in members {
            ctx.set_winner(&id, team.points);
        }
    }

    /// The last team standing wins, otherwise the teams with the most points
    fn finish_teams(ctx: &mut ActivityCtx<'_>) -> HookResult {
        if let Some(team) = ctx.final_team()?.cloned() {
            Self::award_team(ctx, &team);
            return Ok(());
        }

        let teams: Vec<Team> = ctx.teams()?.iter().cloned().collect();
        let Some(best) = teams.iter().map(|team| team.points).max() else {
            return Ok(());
        };
        if best <= 0 {
            return Ok(());
        }
        for team in teams.iter().filter(|team| team.points == best) {
            Self::award_team(ctx, team);
        }
        Ok(())
    }
}

impl Game for PointRace {
    fn name(&self) -> &str {
        "Point Race"
    }

    fn default_options(&self) -> GameOptions {
        GameOptions::new()
            .with("points", Self::DEFAULT_POINTS)
            .with("teams", 0)
    }

    fn on_start(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        let teams = ctx.options().get_or("teams", 0);
        if teams >= 2 {
            Self::announce_teams(ctx, teams)?;
        }

        let target = ctx.options().get_or("points", Self::DEFAULT_POINTS);
        ctx.say(format!("First to {} points wins!", target));
        ctx.next_round();
        Ok(())
    }

    fn on_next_round(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        self.open = false;
        let name = Self::uhtml_name(ctx);
        let html = format!("<b>Round {}</b>: first to claim scores a point", ctx.round());
        ctx.say_uhtml_and_await(&name, &html, Continuation::Signal("open".to_string()));
        Ok(())
    }

    fn on_signal(&mut self, ctx: &mut ActivityCtx<'_>, signal: &str) -> HookResult {
        if signal == "open" {
            self.open = true;
            ctx.arm_next_round();
        }
        Ok(())
    }

    fn on_remove_player(&mut self, ctx: &mut ActivityCtx<'_>, _player: &PlayerId) -> HookResult {
        if !Self::team_mode(ctx) {
            return Ok(());
        }

        let emptied: Vec<String> = ctx
            .empty_teams()?
            .iter()
            .map(|team| team.name().to_string())
            .collect();
        for name in &emptied {
            ctx.say(format!("Team {} has no players left.", name));
        }

        let last = ctx.final_team()?.map(|team| team.name().to_string());
        if let Some(name) = last {
            ctx.say(format!("Team {} is the last team standing!", name));
            ctx.end();
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
            "claim" => {
                if !self.open {
                    return Err(ActivityError::InvalidAction(
                        "the round is not open".to_string(),
                    ));
                }
                if !ctx.roster().get(player).is_some_and(|p| p.is_active()) {
                    return Err(ActivityError::InvalidAction(format!(
                        "{} cannot claim",
                        player
                    )));
                }

                self.open = false;
                let total = ctx.add_points(player, 1)?;
                let name = ctx.display_name(player);
                ctx.say(format!("{} claimed the point! ({} total)", name, total));
                debug!(activity = %ctx.id(), "{} has {} point(s)", player, total);

                let team = ctx
                    .teams()
                    .ok()
                    .and_then(|teams| teams.team_of(player))
                    .map(|team| (team.name().to_string(), team.points));
                let score = match team {
                    Some((team, points)) => {
                        ctx.say(format!("Team {} has {} point(s).", team, points));
                        points
                    }
                    None => total,
                };

                if score >= ctx.options().get_or("points", Self::DEFAULT_POINTS) {
                    ctx.end();
                }
                Ok(())
            }
            "stop" => {
                ctx.freeze_player(player)?;
                let name = ctx.display_name(player);
                ctx.say(format!("{} stopped and keeps their points.", name));
                Ok(())
            }
            other => Err(ActivityError::InvalidAction(other.to_string())),
        }
    }

    /// Most points wins; ties share the win
    fn on_end(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        if Self::team_mode(ctx) {
            return Self::finish_teams(ctx);
        }

        let Some(best) = ctx.points().values().copied().max() else {
            return Ok(());
        };
        if best <= 0 {
            return Ok(());
        }

        let leaders: Vec<PlayerId> = ctx
            .points()
            .iter()
            .filter(|(id, points)| {
                **points == best && ctx.roster().get(id).is_some_and(|p| !p.is_eliminated())
            })
            .map(|(id, _)| id.clone())
            .collect();
        for id in leaders {
            ctx.set_winner(&id, best);
        }
        Ok(())
    }
}
