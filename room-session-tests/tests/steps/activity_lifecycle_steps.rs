use cucumber::{given, then, when};
use room_session_core::{
    ChannelCommand, ChannelSettings, ForceEndReason, GameOptions, PlayerId, SessionEvent,
};
use room_session_tests::{SessionWorld, CHANNEL};

fn names(list: &str) -> Vec<String> {
    list.split(',')
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

fn create(world: &mut SessionWorld, format: &str, options: GameOptions) {
    world.execute(ChannelCommand::CreateGame {
        channel: CHANNEL.to_string(),
        format: format.to_string(),
        options,
    });
}

fn join(world: &mut SessionWorld, player: &str) {
    world.execute(ChannelCommand::Join {
        channel: CHANNEL.to_string(),
        player: player.to_string(),
    });
}

fn act(world: &mut SessionWorld, player: &str, action: &str) -> bool {
    let failed = world
        .execute(ChannelCommand::Action {
            channel: CHANNEL.to_string(),
            player: player.to_string(),
            action: action.to_string(),
            args: Vec::new(),
        })
        .is_failure();
    !failed
}

// ===== Given Steps =====

#[given(expr = "the round delay is {int} ms")]
async fn round_delay(world: &mut SessionWorld, ms: u64) {
    world.configure(|config| config.with_round_delay(ms));
}

#[given(expr = "signups time out after {int} ms")]
async fn signup_timeout(world: &mut SessionWorld, ms: u64) {
    world.configure(|config| {
        let defaults = ChannelSettings {
            signup_timeout_ms: Some(ms),
            ..config.defaults.clone()
        };
        config.with_defaults(defaults)
    });
}

#[given(expr = "a game cooldown of {int} minute(s)")]
async fn game_cooldown(world: &mut SessionWorld, minutes: u64) {
    world.configure(|config| config.with_cooldown(minutes * 60_000));
}

#[given(expr = "a {string} game with players {string}")]
async fn game_with_players(world: &mut SessionWorld, format: String, players: String) {
    create(world, &format, GameOptions::new());
    for player in names(&players) {
        join(world, &player);
    }
}

#[given(expr = "a {string} game to {int} points with players {string}")]
async fn game_to_points(world: &mut SessionWorld, format: String, points: i64, players: String) {
    create(world, &format, GameOptions::new().with("points", points));
    for player in names(&players) {
        join(world, &player);
    }
}

// ===== When Steps =====

#[when(expr = "a {string} game is created")]
async fn game_created(world: &mut SessionWorld, format: String) {
    create(world, &format, GameOptions::new());
}

#[when(expr = "{string} joins")]
async fn player_joins(world: &mut SessionWorld, player: String) {
    join(world, &player);
}

#[when(expr = "{string} leaves")]
async fn player_leaves(world: &mut SessionWorld, player: String) {
    world.execute(ChannelCommand::Leave {
        channel: CHANNEL.to_string(),
        player,
    });
}

#[when("signups close")]
async fn signups_close(world: &mut SessionWorld) {
    world.execute(ChannelCommand::CloseSignups {
        channel: CHANNEL.to_string(),
    });
}

#[when("the game is ended")]
async fn game_ended(world: &mut SessionWorld) {
    world.execute(ChannelCommand::EndGame {
        channel: CHANNEL.to_string(),
    });
}

#[when("a moderator force-ends the game")]
async fn moderator_force_ends(world: &mut SessionWorld) {
    world.execute(ChannelCommand::ForceEnd {
        channel: CHANNEL.to_string(),
        reason: ForceEndReason::Moderator,
    });
}

#[when(expr = "{int} ms pass")]
async fn time_passes(world: &mut SessionWorld, ms: u64) {
    world.advance(ms);
}

#[when("the server echoes the channel output")]
async fn server_echoes(world: &mut SessionWorld) {
    world.echo_pending();
}

#[when(expr = "{string} wins {int} round(s)")]
async fn wins_rounds(world: &mut SessionWorld, player: String, rounds: usize) {
    let delay = world.config.defaults.round_delay_ms;
    for round in 0..rounds {
        world.echo_pending();
        assert!(act(world, &player, "claim"), "claim {} failed", round + 1);
        world.advance(delay);
    }
}

// ===== Then Steps =====

#[then(expr = "{string} can {string}")]
async fn player_can(world: &mut SessionWorld, player: String, action: String) {
    assert!(act(world, &player, &action), "{:?}", world.last_event);
}

#[then(expr = "{string} cannot {string}")]
async fn player_cannot(world: &mut SessionWorld, player: String, action: String) {
    assert!(!act(world, &player, &action));
}

#[then(expr = "the game phase is {string}")]
async fn game_phase(world: &mut SessionWorld, phase: String) {
    let game = world.game().expect("no game in the channel");
    assert_eq!(format!("{:?}", game.phase()), phase);
}

#[then(expr = "the game is in round {int}")]
async fn game_round(world: &mut SessionWorld, round: u32) {
    let game = world.game().expect("no game in the channel");
    assert_eq!(game.round(), round);
}

#[then(expr = "the game started with {int} players")]
async fn game_started_with(world: &mut SessionWorld, count: usize) {
    let started = world.events.iter().find_map(|event| match event {
        SessionEvent::GameStarted { players, .. } => Some(players.len()),
        _ => None,
    });
    assert_eq!(started, Some(count));
}

#[then("there is no game")]
async fn no_game(world: &mut SessionWorld) {
    assert!(world.game().is_none());
}

#[then(expr = "the game was force-ended because of {string}")]
async fn force_ended_because(world: &mut SessionWorld, reason: String) {
    let reasons: Vec<String> = world
        .events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::GameForceEnded { reason, .. } => Some(reason.to_string()),
            _ => None,
        })
        .collect();
    assert!(reasons.contains(&reason), "force ends: {:?}", reasons);
}

#[then(expr = "the channel announced {string}")]
async fn channel_announced(world: &mut SessionWorld, text: String) {
    assert!(world.said(&text), "output: {:?}", world.output);
}

#[then(expr = "the channel did not announce {string}")]
async fn channel_did_not_announce(world: &mut SessionWorld, text: String) {
    assert!(!world.said(&text));
}

#[then(expr = "{string} is eliminated")]
async fn player_eliminated(world: &mut SessionWorld, player: String) {
    let game = world.game().expect("no game in the channel");
    let player = game
        .roster()
        .get(&PlayerId::from_name(&player))
        .expect("player not in the roster");
    assert!(player.is_eliminated());
}

#[then(expr = "{int} game(s) was/were recorded")]
async fn games_recorded(world: &mut SessionWorld, count: usize) {
    assert_eq!(world.recorder.records().len(), count);
}

#[then("the last command failed")]
async fn last_command_failed(world: &mut SessionWorld) {
    assert!(world.last_command_failed());
}

#[then(expr = "the last command failed with {string}")]
async fn last_command_failed_with(world: &mut SessionWorld, text: String) {
    match &world.last_event {
        Some(SessionEvent::CommandFailed { reason, .. }) => {
            assert!(reason.contains(&text), "reason: {}", reason)
        }
        other => panic!("Expected CommandFailed, got {:?}", other),
    }
}

#[then("the last command succeeded")]
async fn last_command_succeeded(world: &mut SessionWorld) {
    assert!(!world.last_command_failed(), "{:?}", world.last_event);
}
