//! Subprocess transport for the Claude Code CLI
//!
//! Provides the [`Transport`] abstraction the agent session talks through, and
//! [`CliTransport`], which runs the CLI as a child process.
//!
//! # Architecture
//!
//! - **Transport trait**: connect / send / inbound lines / errors / close
//! - **Subprocess transport**: CLI process with piped stdio and a background reader
//! - **Executable lookup**: pluggable [`CliResolver`], defaulting to `PATH` plus known install dirs
//! - **Error handling**: [`TransportError`], returned from calls or delivered on the error channel
//!
//! # Usage
//!
//! ```ignore
//! use claudewire_transport::{CliTransport, ProcessConfig, Transport};
//! use tokio_util::sync::CancellationToken;
//!
//! let transport = CliTransport::new(ProcessConfig::new().with_args(["--verbose"]));
//! let mut lines = transport.take_messages().expect("fresh transport");
//! transport.connect(&CancellationToken::new()).await?;
//! while let Some(line) = lines.recv().await {
//!     println!("{}", String::from_utf8_lossy(&line));
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod subprocess;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use subprocess::{
    CliResolver, CliTransport, DefaultCliResolver, FixedCliResolver, ProcessConfig,
};
pub use traits::Transport;
