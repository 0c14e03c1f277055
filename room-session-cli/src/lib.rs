pub mod application;
pub mod infrastructure;

pub use application::{parse_input, ConsoleInput, ConsoleRuntime, RuntimeStats};
pub use infrastructure::{CliError, LogConfig, Result};
