//! Minimal non-streaming chat completion against OpenAI.
//!
//! Run with `OPENAI_API_KEY` set in the environment:
//! `cargo run -p conduit-openai --example basic_chat`

use conduit_core::{AIProvider, GenerateConfig, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = conduit_openai::openai(None);
    let messages = vec![Message::user("Say hello in one short sentence.")];
    let config = GenerateConfig::new().with_temperature(0.0).with_max_tokens(32);

    let result = provider.generate(&messages, "gpt-4o-mini", &config).await?;
    println!("{}", result.text);
    Ok(())
}
