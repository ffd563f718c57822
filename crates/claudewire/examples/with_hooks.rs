//! Example Using Hooks
//!
//! Registers a PreToolUse hook that blocks destructive shell commands and a
//! PostToolUse hook that logs every tool result, then runs a prompt that is
//! likely to use the shell.
//!
//! Run with: cargo run --example with_hooks

use claudewire::{
    AgentSession, ClientOptions, Hook, HookContext, HookOutput, Message, PostToolUseInput,
    PreToolUseInput, StopInput,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn guard_shell(input: PreToolUseInput, ctx: HookContext) -> anyhow::Result<HookOutput> {
    let command = input
        .tool_input
        .get("command")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    println!("[hook] session {:?} wants to run: {}", ctx.session.session_id, command);

    if command.contains("rm -rf") || command.contains("mkfs") {
        return Ok(HookOutput::deny("destructive commands are not allowed here"));
    }
    Ok(HookOutput::allow())
}

async fn log_result(input: PostToolUseInput, _ctx: HookContext) -> anyhow::Result<HookOutput> {
    println!(
        "[hook] {} finished{}",
        input.tool_name,
        if input.is_error { " with an error" } else { "" }
    );
    Ok(HookOutput::default())
}

async fn on_stop(_input: StopInput, _ctx: HookContext) -> anyhow::Result<HookOutput> {
    println!("[hook] agent stopped");
    Ok(HookOutput::default().suppressed())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = ClientOptions::builder()
        .max_turns(3)
        .allowed_tool("Bash")
        .hook(Hook::pre_tool_use("Bash", guard_shell).with_timeout(Duration::from_secs(30)))
        .hook(Hook::post_tool_use("", log_result))
        .hook(Hook::stop(on_stop))
        .build()?;

    let cancel = CancellationToken::new();
    let session = AgentSession::new(options);
    session.connect(&cancel).await?;

    println!("Sending query with hooks enabled...\n");
    session
        .query(&cancel, "List the files in the current directory")
        .await?;

    if let Some(messages) = session.messages().await {
        for message in messages.collect_until_result().await {
            match message {
                Message::Assistant(assistant) => println!("{}", assistant.text()),
                Message::Result(result) => println!("\nDone: {}", result.subtype),
                _ => {}
            }
        }
    }

    session.close().await?;
    Ok(())
}
