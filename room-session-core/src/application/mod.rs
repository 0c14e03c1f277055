mod board_game;
mod catalog;
mod commands;
mod context;
mod event_loop;
mod events;
mod lifecycle;
mod listeners;
mod orchestrator;
pub mod runtime;
mod timers;

pub use board_game::{BoardGame, BoardPiece, BoardRules};
pub use catalog::{FormatSpec, GameCatalog};
pub use commands::ChannelCommand;
pub use context::{ActivityCtx, ChannelContext, Continuation, PendingListener, Scheduled};
pub use event_loop::ChannelEventLoop;
pub use events::SessionEvent;
pub use lifecycle::{Activity, ActivityCore, Game, HookResult};
pub use listeners::{ListenerKey, ListenerRegistry};
pub use orchestrator::{head_to_head_winner, ChildRequest, DEFAULT_CHALLENGE_POINTS};
pub use timers::{TimerHandle, TimerQueue};
