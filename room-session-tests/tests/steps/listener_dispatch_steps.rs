use cucumber::{given, then, when};
use room_session_core::application::ListenerKey;
use room_session_core::InboundLine;
use room_session_tests::SessionWorld;

fn dispatch(world: &mut SessionWorld, line: InboundLine) {
    if let Some(label) = world.listeners.take_match(&line) {
        world.fired.push(label);
    }
}

// ===== Given Steps =====

#[given(expr = "a text listener {string} waiting for {string}")]
async fn text_listener(world: &mut SessionWorld, label: String, content: String) {
    world.listeners.register(ListenerKey::text(&content), label);
}

#[given(expr = "a named update listener {string} waiting for block {string} with {string}")]
async fn named_listener(world: &mut SessionWorld, label: String, name: String, content: String) {
    world
        .listeners
        .register(ListenerKey::named_update(&name, &content), label);
}

// ===== When Steps =====

#[when(expr = "the text line {string} arrives")]
async fn text_arrives(world: &mut SessionWorld, content: String) {
    dispatch(world, InboundLine::text(content));
}

#[when(expr = "the html line {string} arrives")]
async fn html_arrives(world: &mut SessionWorld, content: String) {
    dispatch(world, InboundLine::html(content));
}

#[when(expr = "the named update {string} with {string} arrives")]
async fn named_arrives(world: &mut SessionWorld, name: String, content: String) {
    dispatch(world, InboundLine::named_update(name, content));
}

// ===== Then Steps =====

#[then(expr = "the listener {string} fires")]
async fn listener_fires(world: &mut SessionWorld, label: String) {
    assert_eq!(world.fired.last(), Some(&label), "fired: {:?}", world.fired);
}

#[then(expr = "the listener {string} fired {int} time(s)")]
async fn listener_fired_times(world: &mut SessionWorld, label: String, times: usize) {
    let count = world.fired.iter().filter(|l| **l == label).count();
    assert_eq!(count, times);
}

#[then("no listener fires")]
async fn no_listener_fires(world: &mut SessionWorld) {
    assert!(world.fired.is_empty(), "fired: {:?}", world.fired);
}

#[then("no listeners are pending")]
async fn no_listeners_pending(world: &mut SessionWorld) {
    assert!(world.listeners.is_empty());
}

#[then(expr = "{int} listener(s) is/are pending")]
async fn listeners_pending(world: &mut SessionWorld, count: usize) {
    assert_eq!(world.listeners.len(), count);
}
