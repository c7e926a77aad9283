//! Minimal non-streaming text generation against HuggingFace's Inference API.
//!
//! Run with `HF_TOKEN` set in the environment:
//! `cargo run -p conduit-huggingface --example basic_chat`

use conduit_core::{AIProvider, GenerateConfig, Message};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = conduit_huggingface::huggingface("meta-llama/Llama-3.1-8B-Instruct", None);
    let messages = vec![Message::user("What is the capital of France? Please be concise.")];
    let config = GenerateConfig::new().with_temperature(0.7).with_max_tokens(100);

    let result = provider.generate(&messages, "meta-llama/Llama-3.1-8B-Instruct", &config).await?;

    println!("Response: {}", result.text);
    if let Some(usage) = result.usage {
        println!("\nUsage:");
        println!("  Completion tokens: {}", usage.completion_tokens);
    }
    println!("\nFinish reason: {:?}", result.finish_reason);

    Ok(())
}
