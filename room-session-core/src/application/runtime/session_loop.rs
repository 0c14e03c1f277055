use crate::application::runtime::{CommandQueue, QueueError};
use crate::application::{ChannelCommand, ChannelEventLoop, SessionEvent};

/// Batch driver over [`ChannelEventLoop`]: commands are queued and processed
/// `batch_size` at a time
pub struct SessionLoop {
    event_loop: ChannelEventLoop,
    inbound: CommandQueue,
    /// Command results followed by the lifecycle events they caused
    outbound: Vec<SessionEvent>,
    batch_size: usize,
}

impl SessionLoop {
    pub fn new(event_loop: ChannelEventLoop, batch_size: usize, max_queue_size: usize) -> Self {
        Self {
            event_loop,
            inbound: CommandQueue::new(max_queue_size),
            outbound: Vec::new(),
            batch_size,
        }
    }

    /// Submit a command (non-blocking)
    pub fn submit(&mut self, cmd: ChannelCommand) -> Result<(), QueueError> {
        self.inbound.push(cmd)
    }

    /// Process up to `batch_size` commands.
    /// Returns number of commands processed
    pub fn poll(&mut self) -> usize {
        let mut processed = 0;

        while processed < self.batch_size {
            let Some(cmd) = self.inbound.pop() else {
                break;
            };
            let event = self.event_loop.handle_command(cmd);
            self.outbound.push(event);
            self.outbound.extend(self.event_loop.drain_events());
            processed += 1;
        }

        processed
    }

    /// Fire timers due within `delta_ms` and collect what they caused
    pub fn tick(&mut self, delta_ms: u64) -> usize {
        let fired = self.event_loop.advance(delta_ms);
        self.outbound.extend(self.event_loop.drain_events());
        fired
    }

    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.outbound)
    }

    pub fn event_loop(&self) -> &ChannelEventLoop {
        &self.event_loop
    }

    pub fn event_loop_mut(&mut self) -> &mut ChannelEventLoop {
        &mut self.event_loop
    }
}
