//! Simple Query Example
//!
//! Sends one prompt through a fresh CLI process and prints the replies.
//!
//! Run with: cargo run --example simple_query

use claudewire::{ClientOptions, ContentBlock, Message, query};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = ClientOptions::builder()
        .model("claude-sonnet-4-5")
        .max_turns(1)
        .build()?;

    println!("Sending query to Claude...");
    let mut messages = query(
        "What is 2 + 2? Respond with just the answer.",
        options,
        &CancellationToken::new(),
    )
    .await?;

    while let Some(message) = messages.recv().await {
        match message {
            Message::Assistant(assistant) => {
                for block in &assistant.content {
                    match block {
                        ContentBlock::Text { text } => println!("{}", text),
                        ContentBlock::ToolUse { name, .. } => println!("(tool use: {})", name),
                        _ => println!("(non-text content)"),
                    }
                }
            }
            Message::Result(result) => {
                println!(
                    "\nFinished in {} ms over {} turn(s), cost ${:.4}",
                    result.duration_ms,
                    result.num_turns,
                    result.total_cost_usd.unwrap_or_default()
                );
            }
            _ => {}
        }
    }

    Ok(())
}
