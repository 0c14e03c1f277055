use cucumber::{given, then, when};
use room_session_core::{ChannelCommand, GameOptions, PlayerId, SessionEvent};
use room_session_tests::{SessionWorld, CHANNEL};

// ===== Given Steps =====

#[given(expr = "challenge games of {string} are played to {int} point(s)")]
async fn challenge_points(world: &mut SessionWorld, format: String, points: i64) {
    world.configure(|config| {
        config.with_challenge_options(&format, GameOptions::new().with("points", points))
    });
}

// ===== When Steps =====

#[when(expr = "{string} challenges {string} to {string}")]
async fn challenges(
    world: &mut SessionWorld,
    challenger: String,
    defender: String,
    format: String,
) {
    world.execute(ChannelCommand::Challenge {
        channel: CHANNEL.to_string(),
        challenger,
        defender,
        format,
    });
}

#[when(expr = "{string} performs {string}")]
async fn performs(world: &mut SessionWorld, player: String, action: String) {
    world.execute(ChannelCommand::Action {
        channel: CHANNEL.to_string(),
        player,
        action,
        args: Vec::new(),
    });
}

// ===== Then Steps =====

#[then(expr = "an inner {string} game is running")]
async fn inner_game_running(world: &mut SessionWorld, format: String) {
    let game = world.game().expect("no game in the channel");
    let child = game.child().expect("no inner game");
    assert_eq!(child.format(), format);
    assert!(!child.phase().is_finished());
    assert!(world
        .events
        .iter()
        .any(|event| matches!(event, SessionEvent::ChildSpawned { .. })));
}

#[then(expr = "the inner game has players {string}")]
async fn inner_game_players(world: &mut SessionWorld, players: String) {
    let game = world.game().expect("no game in the channel");
    let child = game.child().expect("no inner game");
    for name in players.split(',') {
        let id = PlayerId::from_name(name.trim());
        assert!(child.roster().contains(&id), "{} not in the inner game", id);
        assert!(!game.roster().contains(&id), "{} still held by the convener", id);
    }
}

#[then(expr = "the inner game is played to {int} point(s)")]
async fn inner_game_points(world: &mut SessionWorld, points: i64) {
    let game = world.game().expect("no game in the channel");
    let child = game.child().expect("no inner game");
    assert_eq!(child.options().get("points"), Some(points));
}

#[then("the inner game reported its scores")]
async fn inner_game_reported(world: &mut SessionWorld) {
    assert!(world
        .events
        .iter()
        .any(|event| matches!(event, SessionEvent::ChildCompleted { .. })));
}

#[then(expr = "the channel output included {string}")]
async fn output_included(world: &mut SessionWorld, line: String) {
    assert!(
        world.output.iter().any(|out| out.to_string() == line),
        "output: {:?}",
        world.output
    );
}
