pub mod commands;
mod terminal;

pub use commands::{Cli, Commands};
pub use terminal::{run_chat, run_interview};
