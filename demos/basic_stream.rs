//! Streams a completion chunk-by-chunk from an OpenRouter-backed model and
//! prints the deltas as they arrive, then reports the final usage.
//!
//! Run with `OPENROUTER_API_KEY` set in the environment:
//! `cargo run -p conduit-demos --example basic_stream`

use conduit_core::{AIProvider, GenerateConfig, Message};
use conduit_openai_compatible::presets::OPENROUTER_BASE_URL;
use conduit_openai_compatible::{OpenAiCompatibleConfig, OpenAiCompatibleProvider};
use futures_util::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let api_key = std::env::var("OPENROUTER_API_KEY").ok();
    let mut config = OpenAiCompatibleConfig::new(OPENROUTER_BASE_URL);
    if let Some(key) = api_key {
        config = config.with_api_key(key);
    }
    let provider = OpenAiCompatibleProvider::new(config);

    let messages = vec![Message::user("Write a four-line poem about Rust's borrow checker.")];
    let request = GenerateConfig::new().with_temperature(0.7).with_max_tokens(200);

    let mut stream = provider.stream(&messages, "openai/gpt-4o-mini", &request).await?;
    let mut completion_tokens = 0u32;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        print!("{}", chunk.text);
        std::io::stdout().flush()?;
        completion_tokens = chunk.token_count;
        if chunk.is_complete {
            println!("\n\nfinish reason: {:?}", chunk.finish_reason);
        }
    }
    println!("completion tokens (last chunk): {completion_tokens}");
    Ok(())
}
