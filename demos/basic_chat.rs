//! Minimal non-streaming chat completion, checking availability first.
//!
//! Run with `ANTHROPIC_API_KEY` set in the environment:
//! `cargo run -p conduit-demos --example basic_chat`

use conduit_core::{AIProvider, Availability, GenerateConfig, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = conduit_anthropic::anthropic(None);

    if let Availability::Unavailable(reason) = provider.availability() {
        eprintln!("provider unavailable: {reason:?}");
        return Ok(());
    }

    let messages = vec![
        Message::system("You are a concise assistant."),
        Message::user("Say hello in one short sentence."),
    ];
    let config = GenerateConfig::new().with_temperature(0.0).with_max_tokens(64);

    let result = provider.generate(&messages, "claude-sonnet-4-5", &config).await?;
    println!("{}", result.text);
    if let Some(usage) = result.usage {
        println!("(prompt: {}, completion: {})", usage.prompt_tokens, usage.completion_tokens);
    }
    Ok(())
}
