//! Subprocess transport for CLI communication
//!
//! Spawns the Claude Code CLI and exchanges newline-delimited JSON with it over
//! stdin/stdout.

pub mod cli;
mod lines;
pub mod process;
pub mod resolve;

pub use cli::CliTransport;
pub use process::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_MAX_BUFFER_SIZE, ENTRYPOINT_ENV, ENTRYPOINT_VALUE,
    ProcessConfig,
};
pub use resolve::{CliResolver, DefaultCliResolver, FixedCliResolver};
