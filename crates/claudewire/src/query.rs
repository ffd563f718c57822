//! One-shot queries
//!
//! [`query`] connects a fresh session, sends one prompt and relays the
//! replies until the result message, then closes the session.

use crate::config::ClientOptions;
use crate::error::{AgentError, Result};
use crate::session::AgentSession;
use claudewire_protocol::{Message, ResultMessage};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Capacity of the channel returned by [`query`]
pub const ONE_SHOT_CHANNEL_CAPACITY: usize = 100;

/// Run a single prompt and stream its messages
///
/// The returned channel yields every message of the exchange, the result
/// message last, and then closes. Cancelling `cancel` stops the relay and
/// closes the session early.
///
/// # Example
///
/// ```no_run
/// # use claudewire::{ClientOptions, query};
/// # use tokio_util::sync::CancellationToken;
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let options = ClientOptions::builder().max_turns(1).build()?;
/// let mut messages = query("What is 2+2?", options, &CancellationToken::new()).await?;
/// while let Some(message) = messages.recv().await {
///     println!("{:?}", message);
/// }
/// # Ok(())
/// # }
/// ```
pub async fn query(
    prompt: impl Into<String>,
    options: ClientOptions,
    cancel: &CancellationToken,
) -> Result<mpsc::Receiver<Message>> {
    let session = AgentSession::new(options);
    session.connect(cancel).await?;

    if let Err(e) = session.query(cancel, prompt).await {
        let _ = session.close().await;
        return Err(e);
    }
    let Some(messages) = session.messages().await else {
        return Err(AgentError::NotConnected);
    };

    let (tx, rx) = mpsc::channel(ONE_SHOT_CHANNEL_CAPACITY);
    let cancel = cancel.clone();
    tokio::spawn(async move {
        loop {
            let message = tokio::select! {
                _ = cancel.cancelled() => break,
                message = messages.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            let done = message.is_result();
            tokio::select! {
                _ = cancel.cancelled() => break,
                sent = tx.send(message) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
            if done {
                break;
            }
        }
        if let Err(e) = session.close().await {
            debug!(error = %e, "one-shot session close failed");
        }
    });

    Ok(rx)
}

/// Run a single prompt and return its result message
///
/// Fails with [`AgentError::NoResult`] if the exchange ends without one, or
/// [`AgentError::Cancelled`] if `cancel` fired first.
pub async fn query_result(
    prompt: impl Into<String>,
    options: ClientOptions,
    cancel: &CancellationToken,
) -> Result<ResultMessage> {
    let mut messages = query(prompt, options, cancel).await?;
    let mut result = None;
    while let Some(message) = messages.recv().await {
        if let Message::Result(message) = message {
            result = Some(message);
        }
    }
    match result {
        Some(result) => Ok(result),
        None if cancel.is_cancelled() => Err(AgentError::Cancelled),
        None => Err(AgentError::NoResult),
    }
}
