//! Streaming text generation against HuggingFace's Inference API.
//!
//! Run with `HF_TOKEN` set in the environment:
//! `cargo run -p conduit-huggingface --example streaming_chat`

use conduit_core::{AIProvider, GenerateConfig, Message};
use futures_util::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = conduit_huggingface::huggingface("meta-llama/Llama-3.1-8B-Instruct", None);
    let messages = vec![Message::user("Write a haiku about programming.")];
    let config = GenerateConfig::new().with_temperature(0.8);

    print!("Response: ");
    let mut stream = provider.stream(&messages, "meta-llama/Llama-3.1-8B-Instruct", &config).await?;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        if !chunk.text.is_empty() {
            print!("{}", chunk.text);
            std::io::stdout().flush()?;
        }
        if chunk.is_complete {
            println!("\n\nFinish reason: {:?}", chunk.finish_reason);
        }
    }

    Ok(())
}
