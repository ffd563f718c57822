//! Agent session for interactive conversations with the Claude Code CLI
//!
//! # Module Organization
//!
//! - [`state`] - connection state and the message stream
//! - [`core`] - AgentSession struct and lifecycle (new, connect, close)
//! - [`query`] - prompts and message streaming
//! - [`control`] - runtime control (interrupt, permission mode, model, rewind)
//!
//! # Examples
//!
//! ```no_run
//! # use claudewire::{AgentSession, ClientOptions};
//! # use tokio_util::sync::CancellationToken;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let cancel = CancellationToken::new();
//! let session = AgentSession::new(ClientOptions::builder().max_turns(1).build()?);
//! session.connect(&cancel).await?;
//!
//! session.query(&cancel, "What is 2+2?").await?;
//! if let Some(messages) = session.messages().await {
//!     for message in messages.collect_until_result().await {
//!         println!("{:?}", message);
//!     }
//! }
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod control;
pub mod core;
pub mod query;
pub mod state;

pub use self::core::AgentSession;
pub use self::state::MessageStream;
