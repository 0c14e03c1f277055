use room_session_core::application::runtime::SessionLoop;
use room_session_core::{ChannelEventLoop, Outbound, SessionEvent};
use tracing::{debug, warn};

use crate::application::ConsoleInput;
use crate::infrastructure::Result;

const COMMAND_BATCH: usize = 10;
const MAX_QUEUE: usize = 100;
const MAX_ECHO_PASSES: usize = 64;

/// What one step of the runtime did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeStats {
    pub commands_processed: usize,
    pub lines_matched: usize,
    pub timers_fired: usize,
    pub echoes_fed: usize,
}

/// Drives a single channel of the engine from the console.
///
/// The engine clock follows wall time (milliseconds since start) plus
/// whatever `wait` inputs added on top.
pub struct ConsoleRuntime {
    session: SessionLoop,
    channel: String,
    auto_echo: bool,
    skipped_ms: u64,
    output: Vec<Outbound>,
}

impl ConsoleRuntime {
    pub fn new(event_loop: ChannelEventLoop, channel: impl Into<String>, auto_echo: bool) -> Self {
        Self {
            session: SessionLoop::new(event_loop, COMMAND_BATCH, MAX_QUEUE),
            channel: channel.into(),
            auto_echo,
            skipped_ms: 0,
            output: Vec::new(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn engine(&self) -> &ChannelEventLoop {
        self.session.event_loop()
    }

    /// Next timer deadline in wall-clock milliseconds since start
    pub fn next_deadline(&self) -> Option<u64> {
        self.engine()
            .next_deadline()
            .map(|deadline| deadline.saturating_sub(self.skipped_ms))
    }

    /// Apply one console input at `elapsed_ms` since start
    pub fn apply(&mut self, input: ConsoleInput, elapsed_ms: u64) -> Result<RuntimeStats> {
        let mut stats = self.tick(elapsed_ms);

        match input {
            ConsoleInput::Command(command) => {
                self.session.submit(command)?;
                stats.commands_processed += self.session.poll();
            }
            ConsoleInput::Line(line) => {
                if self.session.event_loop_mut().receive(&self.channel, &line) {
                    stats.lines_matched += 1;
                }
            }
            ConsoleInput::Wait(ms) => {
                self.skipped_ms = self.skipped_ms.saturating_add(ms);
                stats.timers_fired += self.advance(elapsed_ms);
            }
            ConsoleInput::Help | ConsoleInput::Quit => {}
        }

        stats.echoes_fed += self.collect_output();
        Ok(stats)
    }

    /// Fire timers that are due at `elapsed_ms`
    pub fn tick(&mut self, elapsed_ms: u64) -> RuntimeStats {
        let timers_fired = self.advance(elapsed_ms);
        let echoes_fed = self.collect_output();
        RuntimeStats {
            timers_fired,
            echoes_fed,
            ..Default::default()
        }
    }

    /// Outbound lines produced since the last call
    pub fn drain_output(&mut self) -> Vec<Outbound> {
        std::mem::take(&mut self.output)
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        let mut events = self.session.drain_events();
        events.extend(self.session.event_loop_mut().drain_events());
        events
    }

    /// Stop whatever is still running
    pub fn shutdown(&mut self) {
        let engine = self.session.event_loop_mut();
        engine.shutdown();
        self.collect_output();
    }

    fn advance(&mut self, elapsed_ms: u64) -> usize {
        let now = elapsed_ms.saturating_add(self.skipped_ms);
        self.session.event_loop_mut().advance_to(now)
    }

    /// Move channel output into the buffer. With auto-echo the lines the
    /// server would echo are fed straight back in.
    fn collect_output(&mut self) -> usize {
        let mut fed = 0;

        for _ in 0..MAX_ECHO_PASSES {
            let out = self.session.event_loop_mut().drain_outbound(&self.channel);
            if out.is_empty() {
                return fed;
            }

            let echoes: Vec<_> = if self.auto_echo {
                out.iter().filter_map(Outbound::expected_echo).collect()
            } else {
                Vec::new()
            };
            self.output.extend(out);

            for echo in echoes {
                if self.session.event_loop_mut().receive(&self.channel, &echo) {
                    debug!(channel = %self.channel, "🔁 Echo fed back: {}", echo.content());
                    fed += 1;
                }
            }
            if !self.auto_echo {
                return fed;
            }
        }

        warn!(channel = %self.channel, "Echo feedback did not settle");
        fed
    }
}
