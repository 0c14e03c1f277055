use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

use crate::application::context::{ActivityCtx, Continuation};
use crate::application::lifecycle::{Game, HookResult};
use crate::domain::{
    ActivityError, ActivitySettings, Board, BoardLocation, GameOptions, MovedBoardLocation,
    PlayerId,
};

const MAX_BOARD_PLAYERS: usize = 25;
const DIE_SIDES: u32 = 6;

/// One player's token on the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardPiece {
    pub player: PlayerId,
    pub letter: char,
    pub location: BoardLocation,
    pub money: Option<i64>,
}

/// Game content plugged into [`BoardGame`]
pub trait BoardRules: Send {
    fn name(&self) -> &str;

    fn board(&self) -> &Board;

    fn start_location(&self) -> BoardLocation;

    fn number_of_dice(&self) -> u32 {
        1
    }

    fn starting_money(&self) -> Option<i64> {
        None
    }

    fn default_options(&self) -> GameOptions {
        GameOptions::new()
    }

    /// Called after every move with the space the piece landed on
    fn on_space_landing(
        &mut self,
        ctx: &mut ActivityCtx<'_>,
        piece: &mut BoardPiece,
        moved: &MovedBoardLocation,
    ) -> HookResult;
}

/// Turn-based board game: players take turns in a shuffled order, each turn
/// is a dice roll moving the player's piece around the board
pub struct BoardGame<R> {
    rules: R,
    order: Vec<PlayerId>,
    pieces: BTreeMap<PlayerId, BoardPiece>,
    turns: VecDeque<PlayerId>,
    current: Option<PlayerId>,
    board_round: u32,
}

impl<R: BoardRules> BoardGame<R> {
    pub fn new(rules: R) -> Self {
        Self {
            rules,
            order: Vec::new(),
            pieces: BTreeMap::new(),
            turns: VecDeque::new(),
            current: None,
            board_round: 0,
        }
    }

    pub fn rules(&self) -> &R {
        &self.rules
    }

    pub fn piece(&self, player: &PlayerId) -> Option<&BoardPiece> {
        self.pieces.get(player)
    }

    pub fn board_round(&self) -> u32 {
        self.board_round
    }

    pub fn current_player(&self) -> Option<&PlayerId> {
        self.current.as_ref()
    }

    fn letters(&self, ctx: &ActivityCtx<'_>) -> String {
        self.order
            .iter()
            .filter(|id| ctx.roster().get(id).is_some_and(|p| !p.is_eliminated()))
            .filter_map(|id| self.pieces.get(id).map(|piece| piece.letter.to_string()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn start_board_round(&mut self, ctx: &mut ActivityCtx<'_>) {
        self.board_round += 1;
        self.turns = self.order.iter().cloned().collect();

        let name = format!("{}-round", ctx.format());
        let html = format!(
            "<b>Round {}</b>. Remaining players: {}",
            self.board_round,
            self.letters(ctx)
        );
        ctx.say_uhtml_and_await(&name, &html, Continuation::ArmNextRound);
    }

    /// Next player who can still act this board round
    fn next_turn(&mut self, ctx: &ActivityCtx<'_>) -> Option<PlayerId> {
        while let Some(player) = self.turns.pop_front() {
            if ctx.roster().get(&player).is_some_and(|p| p.is_active()) {
                return Some(player);
            }
            debug!(activity = %ctx.id(), "Skipping {}", player);
        }
        None
    }

    fn take_turn(&mut self, ctx: &mut ActivityCtx<'_>, player: &PlayerId) -> HookResult {
        ctx.clear_timeout();
        self.current = None;

        let dice: Vec<u32> = (0..self.rules.number_of_dice().max(1))
            .map(|_| ctx.roll_die(DIE_SIDES))
            .collect();
        let total: u32 = dice.iter().sum();
        let steps = i32::try_from(total)
            .map_err(|_| ActivityError::InvalidAction(format!("roll of {}", total)))?;

        let mut piece = self
            .pieces
            .get(player)
            .cloned()
            .ok_or(ActivityError::MissingState("board pieces"))?;
        let moved = self.rules.board().advance(piece.location, steps);
        piece.location = moved.location();

        let space = self
            .rules
            .board()
            .space(piece.location)
            .map(|space| space.name.clone())
            .unwrap_or_default();
        let rolls: Vec<String> = dice.iter().map(u32::to_string).collect();
        ctx.say(format!(
            "**{}** rolled {} and moved to {}.",
            piece.letter,
            rolls.join(" + "),
            space
        ));

        self.rules.on_space_landing(ctx, &mut piece, &moved)?;
        self.pieces.insert(player.clone(), piece);

        if !ctx.is_ending() {
            ctx.arm_next_round();
        }
        Ok(())
    }
}

impl<R: BoardRules> Game for BoardGame<R> {
    fn name(&self) -> &str {
        self.rules.name()
    }

    /// One lettered piece per player caps the table
    fn configure(&mut self, settings: &mut ActivitySettings) {
        let cap = settings
            .max_players
            .map_or(MAX_BOARD_PLAYERS, |max| max.min(MAX_BOARD_PLAYERS));
        settings.max_players = Some(cap);
    }

    fn default_options(&self) -> GameOptions {
        self.rules.default_options()
    }

    fn on_start(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        self.order = ctx.shuffled_players();
        let start = self.rules.start_location();
        let money = self.rules.starting_money();

        for (player, letter) in self.order.iter().zip('A'..='Z') {
            self.pieces.insert(
                player.clone(),
                BoardPiece {
                    player: player.clone(),
                    letter,
                    location: start,
                    money,
                },
            );
            let message = format!("You will play as **{}** for {}!", letter, self.rules.name());
            ctx.say_private(player, message);
        }

        ctx.arm_next_round();
        Ok(())
    }

    fn on_next_round(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        if self.turns.is_empty() {
            self.start_board_round(ctx);
            return Ok(());
        }

        match self.next_turn(ctx) {
            Some(player) => {
                let letter = self
                    .pieces
                    .get(&player)
                    .map(|piece| piece.letter)
                    .ok_or(ActivityError::MissingState("board pieces"))?;
                let name = ctx.display_name(&player);
                ctx.say(format!("**{}** ({}), it's your turn to roll!", letter, name));
                self.current = Some(player);
                let delay = ctx.settings().round_delay_ms;
                ctx.set_timeout(delay, Continuation::Signal("autoroll".to_string()));
            }
            None => self.start_board_round(ctx),
        }
        Ok(())
    }

    fn on_signal(&mut self, ctx: &mut ActivityCtx<'_>, signal: &str) -> HookResult {
        if signal != "autoroll" {
            return Ok(());
        }
        match self.current.clone() {
            Some(player) => self.take_turn(ctx, &player),
            None => Ok(()),
        }
    }

    fn on_action(
        &mut self,
        ctx: &mut ActivityCtx<'_>,
        player: &PlayerId,
        action: &str,
        _args: &[String],
    ) -> HookResult {
        match action {
            "roll" if self.current.as_ref() == Some(player) => self.take_turn(ctx, player),
            "roll" => Err(ActivityError::InvalidAction(
                "it is not your turn".to_string(),
            )),
            other => Err(ActivityError::InvalidAction(other.to_string())),
        }
    }

    /// Every player still on the board wins
    fn on_end(&mut self, ctx: &mut ActivityCtx<'_>) -> HookResult {
        let survivors: Vec<PlayerId> = ctx
            .roster()
            .not_eliminated()
            .into_iter()
            .map(|p| p.id().clone())
            .collect();
        for player in survivors {
            ctx.set_winner(&player, 1);
        }
        Ok(())
    }
}
