use std::collections::BTreeMap;

use crate::application::{ActivityCtx, BoardPiece, BoardRules, HookResult};
use crate::domain::{
    Board, BoardError, BoardLocation, BoardSide, BoardSpace, GameOptions, MovedBoardLocation,
    PlayerId, SpaceKind,
};

const SIDE_LENGTH: usize = 6;
const GO_BONUS: i64 = 200;
const CHANCE_SETBACK: i32 = -3;

/// Race around the board: completing `laps` laps wins and knocks every
/// other player out. Chance spaces send the piece back a few spaces.
#[derive(Debug)]
pub struct LapRace {
    board: Board,
    completed: BTreeMap<PlayerId, i64>,
}

impl LapRace {
    pub const FORMAT: &'static str = "laprace";
    pub const DEFAULT_LAPS: i64 = 1;

    pub fn new() -> Result<Self, BoardError> {
        Ok(Self {
            board: Self::build_board()?,
            completed: BTreeMap::new(),
        })
    }

    fn build_board() -> Result<Board, BoardError> {
        let side = |side: BoardSide, color: &str| -> Vec<BoardSpace> {
            (0..SIDE_LENGTH)
                .map(|index| {
                    let space = BoardSpace::new(format!("{} {}", side, index), color);
                    if index == SIDE_LENGTH / 2 {
                        space.with_kind(SpaceKind::Chance)
                    } else {
                        space
                    }
                })
                .collect()
        };

        let mut left = side(BoardSide::Left, "#4caf50");
        left[0] = BoardSpace::new("Go", "#ffffff");
        Board::new(
            left,
            side(BoardSide::Top, "#2196f3"),
            side(BoardSide::Right, "#f44336"),
            side(BoardSide::Bottom, "#ffeb3b"),
        )
    }

    pub fn laps_completed(&self, player: &PlayerId) -> i64 {
        self.completed.get(player).copied().unwrap_or(0)
    }

    fn crossed_start(&self, moved: &MovedBoardLocation) -> bool {
        let start = self.start_location();
        moved.location() == start || moved.passed_over(start)
    }
}

impl BoardRules for LapRace {
    fn name(&self) -> &str {
        "Lap Race"
    }

    fn board(&self) -> &Board {
        &self.board
    }

    fn start_location(&self) -> BoardLocation {
        BoardLocation::new(BoardSide::Left, 0)
    }

    fn number_of_dice(&self) -> u32 {
        2
    }

    fn starting_money(&self) -> Option<i64> {
        Some(0)
    }

    fn default_options(&self) -> GameOptions {
        GameOptions::new().with("laps", Self::DEFAULT_LAPS)
    }

    fn on_space_landing(
        &mut self,
        ctx: &mut ActivityCtx<'_>,
        piece: &mut BoardPiece,
        moved: &MovedBoardLocation,
    ) -> HookResult {
        if self.crossed_start(moved) {
            let laps = self.completed.entry(piece.player.clone()).or_insert(0);
            *laps += 1;
            let laps = *laps;
            piece.money = Some(piece.money.unwrap_or(0) + GO_BONUS);
            ctx.add_points(&piece.player, 1)?;
            ctx.say(format!("**{}** passed Go! (lap {})", piece.letter, laps));

            if laps >= ctx.options().get_or("laps", Self::DEFAULT_LAPS).max(1) {
                let others: Vec<PlayerId> = ctx
                    .roster()
                    .not_eliminated()
                    .into_iter()
                    .map(|p| p.id().clone())
                    .filter(|id| *id != piece.player)
                    .collect();
                for other in others {
                    ctx.eliminate_player(&other)?;
                }
                ctx.end();
                return Ok(());
            }
        }

        let landed_on_chance = self
            .board
            .space(piece.location)
            .is_some_and(|space| space.kind == SpaceKind::Chance);
        if landed_on_chance {
            let back = self.board.advance(piece.location, CHANCE_SETBACK);
            piece.location = back.location();
            ctx.say(format!(
                "**{}** drew a chance card and moved back to {}.",
                piece.letter,
                back.location()
            ));
        }
        Ok(())
    }
}
