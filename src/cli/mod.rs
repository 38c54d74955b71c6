pub mod commands;
pub mod progress;
pub mod scan;
pub mod tools;

pub use commands::{Cli, Commands, LogFormat};
