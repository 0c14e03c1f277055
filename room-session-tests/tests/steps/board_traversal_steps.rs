use cucumber::{given, then, when};
use room_session_core::{Board, BoardLocation, BoardSide};
use room_session_tests::SessionWorld;

fn side(name: &str) -> BoardSide {
    match name {
        "left" => BoardSide::Left,
        "top" => BoardSide::Top,
        "right" => BoardSide::Right,
        "bottom" => BoardSide::Bottom,
        other => panic!("Unknown board side '{}'", other),
    }
}

fn board(world: &SessionWorld) -> &Board {
    world.board.as_ref().expect("no board")
}

fn move_piece(world: &mut SessionWorld, steps: i32) {
    let from = world.location.expect("no piece on the board");
    let moved = board(world).advance(from, steps);
    world.location = Some(moved.location());
    world.last_move = Some(moved);
}

// ===== Given Steps =====

#[given(expr = "a board with sides of {int} spaces")]
async fn square_board(world: &mut SessionWorld, len: usize) {
    world.board = Some(Board::with_lengths([len; 4]).expect("valid board"));
}

#[given(expr = "a board with side lengths {int}, {int}, {int} and {int}")]
async fn uneven_board(
    world: &mut SessionWorld,
    left: usize,
    top: usize,
    right: usize,
    bottom: usize,
) {
    world.board = Some(Board::with_lengths([left, top, right, bottom]).expect("valid board"));
}

#[given(expr = "a piece on {word} {int}")]
async fn piece_on(world: &mut SessionWorld, name: String, index: usize) {
    let location = board(world)
        .location(side(&name), index)
        .expect("location on the board");
    world.location = Some(location);
}

// ===== When Steps =====

#[when(expr = "the piece moves {int} space(s)")]
async fn piece_moves(world: &mut SessionWorld, steps: i32) {
    move_piece(world, steps);
}

#[when(expr = "the piece moves back {int} space(s)")]
async fn piece_moves_back(world: &mut SessionWorld, steps: i32) {
    move_piece(world, -steps);
}

// ===== Then Steps =====

#[then(expr = "the piece is on {word} {int}")]
async fn piece_is_on(world: &mut SessionWorld, name: String, index: usize) {
    assert_eq!(world.location, Some(BoardLocation::new(side(&name), index)));
}

#[then(expr = "the move passed {int} spaces")]
async fn move_passed(world: &mut SessionWorld, count: usize) {
    let moved = world.last_move.as_ref().expect("no move");
    assert_eq!(moved.passed.len(), count);
    assert_eq!(moved.passed_spaces(board(world)).len(), count);
}

#[then(expr = "the move passed over {word} {int}")]
async fn move_passed_over(world: &mut SessionWorld, name: String, index: usize) {
    let moved = world.last_move.as_ref().expect("no move");
    assert!(moved.passed_over(BoardLocation::new(side(&name), index)));
}

#[then(expr = "the move did not pass over {word} {int}")]
async fn move_did_not_pass_over(world: &mut SessionWorld, name: String, index: usize) {
    let moved = world.last_move.as_ref().expect("no move");
    assert!(!moved.passed_over(BoardLocation::new(side(&name), index)));
}

#[then(expr = "the space named {string} is at {word} {int}")]
async fn space_named(world: &mut SessionWorld, space: String, name: String, index: usize) {
    assert_eq!(
        board(world).space_location(&space),
        Some(BoardLocation::new(side(&name), index))
    );
}

#[then(expr = "no space is named {string}")]
async fn no_space_named(world: &mut SessionWorld, space: String) {
    assert_eq!(board(world).space_location(&space), None);
}
