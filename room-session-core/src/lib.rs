//! Session engine for round-based games hosted in shared chat channels.
//!
//! The `domain` layer holds players, teams, boards and protocol lines; the
//! `application` layer runs activities, dispatches echoes and timers, and
//! orchestrates inner games.

pub mod application;
pub mod config;
pub mod domain;
pub mod games;
pub mod recorder;

pub use application::{
    Activity, ActivityCtx, ChannelCommand, ChannelEventLoop, Continuation, FormatSpec, Game,
    GameCatalog, HookResult, SessionEvent,
};
pub use config::{ChannelOverrides, ChannelSettings, ConfigError, EngineConfig};
pub use domain::{
    ActivityError, ActivityId, ActivityPhase, Board, BoardLocation, BoardSide, ForceEndReason,
    GameOptions, InboundLine, Outbound, PlayerId,
};
pub use recorder::{MemoryRecorder, NoopRecorder, OutcomeRecorder, RecordError};

/// Route engine logs to the test output; `RUST_LOG` picks the level
#[cfg(test)]
pub(crate) fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
