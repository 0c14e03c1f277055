use cucumber::World;
use room_session_core::application::ListenerRegistry;
use room_session_core::domain::MovedBoardLocation;
use room_session_core::{
    Activity, Board, BoardLocation, ChannelCommand, ChannelEventLoop, EngineConfig, GameCatalog,
    InboundLine, MemoryRecorder, Outbound, SessionEvent,
};
use std::sync::Arc;

pub const CHANNEL: &str = "lobby";

#[derive(Debug, World)]
#[world(init = Self::new)]
pub struct SessionWorld {
    /// Configuration the engine was built from
    pub config: EngineConfig,

    /// Channel event loop (the system under test)
    pub engine: ChannelEventLoop,

    pub recorder: Arc<MemoryRecorder>,

    /// Last command result (for assertions)
    pub last_event: Option<SessionEvent>,

    /// Lifecycle events drained so far
    pub events: Vec<SessionEvent>,

    /// Channel output drained so far
    pub output: Vec<Outbound>,

    /// Output lines the server has not echoed yet
    pub unechoed: Vec<InboundLine>,

    /// Standalone registry for dispatch scenarios; callbacks are labels
    pub listeners: ListenerRegistry<String>,

    /// Labels of listeners that fired
    pub fired: Vec<String>,

    pub board: Option<Board>,
    pub location: Option<BoardLocation>,
    pub last_move: Option<MovedBoardLocation>,
}

impl SessionWorld {
    pub fn new() -> Self {
        let config = EngineConfig::default().with_seed(7);
        let recorder = Arc::new(MemoryRecorder::new());
        Self {
            engine: Self::build_engine(&config, &recorder),
            config,
            recorder,
            last_event: None,
            events: Vec::new(),
            output: Vec::new(),
            unechoed: Vec::new(),
            listeners: ListenerRegistry::new(),
            fired: Vec::new(),
            board: None,
            location: None,
            last_move: None,
        }
    }

    fn build_engine(config: &EngineConfig, recorder: &Arc<MemoryRecorder>) -> ChannelEventLoop {
        ChannelEventLoop::new(
            Arc::new(config.clone()),
            Arc::new(GameCatalog::standard()),
            recorder.clone(),
        )
    }

    /// Change the configuration and rebuild the engine (setup steps only)
    pub fn configure(&mut self, change: impl FnOnce(EngineConfig) -> EngineConfig) {
        self.config = change(self.config.clone());
        self.engine = Self::build_engine(&self.config, &self.recorder);
    }

    /// Execute a command and collect what it caused
    pub fn execute(&mut self, command: ChannelCommand) -> &SessionEvent {
        let event = self.engine.handle_command(command);
        self.collect();
        self.last_event.insert(event)
    }

    pub fn last_command_failed(&self) -> bool {
        matches!(self.last_event, Some(SessionEvent::CommandFailed { .. }))
    }

    pub fn game(&self) -> Option<&Activity> {
        self.engine.game(CHANNEL)
    }

    /// Move the clock forward and collect what the timers caused
    pub fn advance(&mut self, ms: u64) -> usize {
        let fired = self.engine.advance(ms);
        self.collect();
        fired
    }

    /// Play the server: echo every line sent so far that expects one.
    /// Returns how many echoes matched a listener.
    pub fn echo_pending(&mut self) -> usize {
        let mut matched = 0;
        while !self.unechoed.is_empty() {
            for echo in std::mem::take(&mut self.unechoed) {
                if self.engine.receive(CHANNEL, &echo) {
                    matched += 1;
                }
            }
            self.collect();
        }
        matched
    }

    /// Drain output and events, remembering which lines await an echo
    pub fn collect(&mut self) {
        let out = self.engine.drain_outbound(CHANNEL);
        self.unechoed
            .extend(out.iter().filter_map(Outbound::expected_echo));
        self.output.extend(out);
        self.events.extend(self.engine.drain_events());
    }

    pub fn said(&self, text: &str) -> bool {
        self.output
            .iter()
            .any(|out| matches!(out, Outbound::Text { content } if content == text))
    }
}

impl Default for SessionWorld {
    fn default() -> Self {
        Self::new()
    }
}
