pub mod input;
pub mod runtime;

pub use input::{parse_input, ConsoleInput, HELP};
pub use runtime::{ConsoleRuntime, RuntimeStats};
