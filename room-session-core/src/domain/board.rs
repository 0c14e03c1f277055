use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four edges of the board loop.
///
/// The declaration order is the forward rotation: left, top, right, bottom,
/// then back to left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoardSide {
    Left,
    Top,
    Right,
    Bottom,
}

impl BoardSide {
    pub const ALL: [BoardSide; 4] = [
        BoardSide::Left,
        BoardSide::Top,
        BoardSide::Right,
        BoardSide::Bottom,
    ];

    fn position(self) -> usize {
        match self {
            BoardSide::Left => 0,
            BoardSide::Top => 1,
            BoardSide::Right => 2,
            BoardSide::Bottom => 3,
        }
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.position() + 1) % 4]
    }

    pub fn previous(self) -> Self {
        Self::ALL[(self.position() + 3) % 4]
    }

    /// Left runs bottom-to-top and top runs left-to-right, so moving forward
    /// walks them in ascending index order; right and bottom descend.
    pub fn ascends_forward(self) -> bool {
        matches!(self, BoardSide::Left | BoardSide::Top)
    }
}

impl fmt::Display for BoardSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardSide::Left => write!(f, "left"),
            BoardSide::Top => write!(f, "top"),
            BoardSide::Right => write!(f, "right"),
            BoardSide::Bottom => write!(f, "bottom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceKind {
    #[default]
    Plain,
    Chance,
    Property,
    Utility,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoardSpace {
    pub name: String,
    /// Hex color used when rendering the space
    pub color: String,
    #[serde(default)]
    pub kind: SpaceKind,
}

impl BoardSpace {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
            kind: SpaceKind::Plain,
        }
    }

    pub fn with_kind(mut self, kind: SpaceKind) -> Self {
        self.kind = kind;
        self
    }
}

/// A space on the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoardLocation {
    pub side: BoardSide,
    pub index: usize,
}

impl BoardLocation {
    pub fn new(side: BoardSide, index: usize) -> Self {
        Self { side, index }
    }
}

impl fmt::Display for BoardLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.side, self.index)
    }
}

/// Destination of a move plus every space crossed on the way
/// (origin included, destination excluded)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovedBoardLocation {
    pub side: BoardSide,
    pub index: usize,
    pub passed: Vec<BoardLocation>,
}

impl MovedBoardLocation {
    pub fn location(&self) -> BoardLocation {
        BoardLocation::new(self.side, self.index)
    }

    pub fn passed_spaces<'a>(&self, board: &'a Board) -> Vec<&'a BoardSpace> {
        self.passed
            .iter()
            .filter_map(|loc| board.space(*loc))
            .collect()
    }

    /// Whether the move crossed `location` without stopping on it
    pub fn passed_over(&self, location: BoardLocation) -> bool {
        self.passed.iter().skip(1).any(|l| *l == location)
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BoardError {
    #[error("Board side {0} must have at least one space")]
    EmptySide(BoardSide),

    #[error("Location {0} is outside the board")]
    OutOfBounds(BoardLocation),
}

/// Four sides of independently configurable length forming a closed loop
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    left: Vec<BoardSpace>,
    top: Vec<BoardSpace>,
    right: Vec<BoardSpace>,
    bottom: Vec<BoardSpace>,
}

impl Board {
    pub fn new(
        left: Vec<BoardSpace>,
        top: Vec<BoardSpace>,
        right: Vec<BoardSpace>,
        bottom: Vec<BoardSpace>,
    ) -> Result<Self, BoardError> {
        let board = Board {
            left,
            top,
            right,
            bottom,
        };

        for side in BoardSide::ALL {
            if board.side(side).is_empty() {
                return Err(BoardError::EmptySide(side));
            }
        }

        Ok(board)
    }

    /// Board of plain spaces named after their location (`"left 0"`, ...)
    pub fn with_lengths(lengths: [usize; 4]) -> Result<Self, BoardError> {
        let make = |side: BoardSide, len: usize| -> Vec<BoardSpace> {
            (0..len)
                .map(|i| BoardSpace::new(format!("{} {}", side, i), "#FFFFFF"))
                .collect()
        };

        Self::new(
            make(BoardSide::Left, lengths[0]),
            make(BoardSide::Top, lengths[1]),
            make(BoardSide::Right, lengths[2]),
            make(BoardSide::Bottom, lengths[3]),
        )
    }

    pub fn side(&self, side: BoardSide) -> &[BoardSpace] {
        match side {
            BoardSide::Left => &self.left,
            BoardSide::Top => &self.top,
            BoardSide::Right => &self.right,
            BoardSide::Bottom => &self.bottom,
        }
    }

    pub fn side_len(&self, side: BoardSide) -> usize {
        self.side(side).len()
    }

    /// Total number of spaces around the loop
    pub fn perimeter(&self) -> usize {
        BoardSide::ALL.iter().map(|s| self.side_len(*s)).sum()
    }

    pub fn contains(&self, location: BoardLocation) -> bool {
        location.index < self.side_len(location.side)
    }

    pub fn location(&self, side: BoardSide, index: usize) -> Result<BoardLocation, BoardError> {
        let location = BoardLocation::new(side, index);
        if self.contains(location) {
            Ok(location)
        } else {
            Err(BoardError::OutOfBounds(location))
        }
    }

    pub fn space(&self, location: BoardLocation) -> Option<&BoardSpace> {
        self.side(location.side).get(location.index)
    }

    /// First location holding a space with this name
    pub fn space_location(&self, name: &str) -> Option<BoardLocation> {
        BoardSide::ALL.iter().find_map(|side| {
            self.side(*side)
                .iter()
                .position(|space| space.name == name)
                .map(|index| BoardLocation::new(*side, index))
        })
    }

    /// Move `steps` single spaces from `from`; negative steps walk backwards.
    ///
    /// Every step is recorded, so moves longer than the perimeter list each
    /// lap in full.
    pub fn advance(&self, from: BoardLocation, steps: i32) -> MovedBoardLocation {
        debug_assert!(self.contains(from), "{} is not on this board", from);

        let forward = steps > 0;
        let count = steps.unsigned_abs() as usize;
        let mut current = from;
        let mut passed = Vec::with_capacity(count);

        for _ in 0..count {
            passed.push(current);
            current = self.step(current, forward);
        }

        MovedBoardLocation {
            side: current.side,
            index: current.index,
            passed,
        }
    }

    fn step(&self, location: BoardLocation, forward: bool) -> BoardLocation {
        let BoardLocation { side, index } = location;
        let ascending = side.ascends_forward() == forward;

        if ascending && index + 1 < self.side_len(side) {
            return BoardLocation::new(side, index + 1);
        }
        if !ascending && index > 0 {
            return BoardLocation::new(side, index - 1);
        }

        // Corner: enter the neighbouring side at its near end
        let next = if forward { side.next() } else { side.previous() };
        let index = if next.ascends_forward() == forward {
            0
        } else {
            self.side_len(next) - 1
        };
        BoardLocation::new(next, index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashSet;

    fn square(len: usize) -> Board {
        Board::with_lengths([len; 4]).unwrap()
    }

    fn loc(side: BoardSide, index: usize) -> BoardLocation {
        BoardLocation::new(side, index)
    }

    #[test]
    fn test_empty_side_rejected_at_construction() {
        let result = Board::with_lengths([4, 0, 4, 4]);
        assert_eq!(result, Err(BoardError::EmptySide(BoardSide::Top)));
    }

    #[test]
    fn test_side_rotation() {
        assert_eq!(BoardSide::Left.next(), BoardSide::Top);
        assert_eq!(BoardSide::Bottom.next(), BoardSide::Left);
        assert_eq!(BoardSide::Left.previous(), BoardSide::Bottom);
        assert_eq!(BoardSide::Right.previous(), BoardSide::Top);
    }

    #[test]
    fn test_top_corner_one_step() {
        let board = square(4);
        let moved = board.advance(loc(BoardSide::Left, 3), 1);

        assert_eq!(moved.location(), loc(BoardSide::Top, 0));
        assert_eq!(moved.passed, vec![loc(BoardSide::Left, 3)]);
    }

    #[test]
    fn test_top_corner_two_steps() {
        let board = square(4);
        let moved = board.advance(loc(BoardSide::Left, 3), 2);

        assert_eq!(moved.location(), loc(BoardSide::Top, 1));
        assert_eq!(
            moved.passed,
            vec![loc(BoardSide::Left, 3), loc(BoardSide::Top, 0)]
        );
    }

    #[test]
    fn test_space_order_on_every_side() {
        let board = square(5);
        let last = 4;

        let cases = [
            (loc(BoardSide::Left, 0), 1, loc(BoardSide::Left, 1)),
            (loc(BoardSide::Left, 0), 2, loc(BoardSide::Left, 2)),
            (loc(BoardSide::Top, 0), 2, loc(BoardSide::Top, 2)),
            (loc(BoardSide::Top, last), 1, loc(BoardSide::Right, last)),
            (loc(BoardSide::Top, last), 2, loc(BoardSide::Right, last - 1)),
            (loc(BoardSide::Right, last), 2, loc(BoardSide::Right, last - 2)),
            (loc(BoardSide::Right, 0), 1, loc(BoardSide::Bottom, last)),
            (loc(BoardSide::Right, 0), 2, loc(BoardSide::Bottom, last - 1)),
            (loc(BoardSide::Bottom, last), 1, loc(BoardSide::Bottom, last - 1)),
            (loc(BoardSide::Bottom, 0), 1, loc(BoardSide::Left, 0)),
            (loc(BoardSide::Bottom, 0), 2, loc(BoardSide::Left, 1)),
        ];

        for (from, steps, expected) in cases {
            assert_eq!(
                board.advance(from, steps).location(),
                expected,
                "{} + {}",
                from,
                steps
            );
        }
    }

    #[test]
    fn test_descending_side_reaches_index_zero() {
        let board = square(4);
        let moved = board.advance(loc(BoardSide::Right, 1), 1);
        assert_eq!(moved.location(), loc(BoardSide::Right, 0));
    }

    #[test]
    fn test_zero_steps() {
        let board = square(4);
        let start = loc(BoardSide::Right, 2);
        let moved = board.advance(start, 0);

        assert_eq!(moved.location(), start);
        assert!(moved.passed.is_empty());
    }

    #[test]
    fn test_backwards_across_corner() {
        let board = square(4);

        let moved = board.advance(loc(BoardSide::Left, 0), -1);
        assert_eq!(moved.location(), loc(BoardSide::Bottom, 0));

        let moved = board.advance(loc(BoardSide::Top, 0), -1);
        assert_eq!(moved.location(), loc(BoardSide::Left, 3));
    }

    #[test]
    fn test_multiple_laps_enumerate_every_space() {
        let board = Board::with_lengths([3, 2, 3, 2]).unwrap();
        let start = loc(BoardSide::Top, 1);
        let steps = (board.perimeter() * 3 + 2) as i32;

        let moved = board.advance(start, steps);

        assert_eq!(moved.passed.len(), steps as usize);
        assert_eq!(moved.location(), board.advance(start, 2).location());
        // the first lap is replayed exactly on every following lap
        let lap = board.perimeter();
        assert_eq!(moved.passed[..lap], moved.passed[lap..2 * lap]);
    }

    #[test]
    fn test_passed_over() {
        let board = square(4);
        let moved = board.advance(loc(BoardSide::Bottom, 1), 3);

        assert!(moved.passed_over(loc(BoardSide::Bottom, 0)));
        assert!(moved.passed_over(loc(BoardSide::Left, 0)));
        assert!(!moved.passed_over(loc(BoardSide::Bottom, 1)));
    }

    #[test]
    fn test_space_location_lookup() {
        let board = square(4);
        assert_eq!(
            board.space_location("right 2"),
            Some(loc(BoardSide::Right, 2))
        );
        assert_eq!(board.space_location("nowhere"), None);
    }

    #[test]
    fn test_location_bounds() {
        let board = Board::with_lengths([2, 3, 2, 3]).unwrap();
        assert!(board.location(BoardSide::Top, 2).is_ok());
        assert_eq!(
            board.location(BoardSide::Left, 2),
            Err(BoardError::OutOfBounds(loc(BoardSide::Left, 2)))
        );
    }

    fn board_and_start() -> impl Strategy<Value = (Board, BoardLocation)> {
        (1usize..7, 1usize..7, 1usize..7, 1usize..7, 0usize..4, 0usize..7).prop_map(
            |(l, t, r, b, side, index)| {
                let board = Board::with_lengths([l, t, r, b]).unwrap();
                let side = BoardSide::ALL[side];
                let index = index % board.side_len(side);
                (board, BoardLocation::new(side, index))
            },
        )
    }

    proptest! {
        #[test]
        fn prop_full_lap_visits_every_space_once((board, start) in board_and_start()) {
            let perimeter = board.perimeter();
            let moved = board.advance(start, perimeter as i32);

            prop_assert_eq!(moved.location(), start);
            prop_assert_eq!(moved.passed.len(), perimeter);
            let unique: HashSet<BoardLocation> = moved.passed.iter().copied().collect();
            prop_assert_eq!(unique.len(), perimeter);
            prop_assert!(moved.passed.iter().all(|l| board.contains(*l)));
        }

        #[test]
        fn prop_reverse_move_returns_home(
            (board, start) in board_and_start(),
            steps in -60i32..60,
        ) {
            let there = board.advance(start, steps);
            let back = board.advance(there.location(), -steps);

            prop_assert_eq!(back.location(), start);
            prop_assert_eq!(there.passed.len(), steps.unsigned_abs() as usize);
        }
    }
}
