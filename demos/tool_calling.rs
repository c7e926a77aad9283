//! Drives the multi-step tool-execution loop against a single `get_weather`
//! tool, letting the model ask for the city's weather and then answer using
//! the tool's output.
//!
//! Run with `OPENAI_API_KEY` set in the environment:
//! `cargo run -p conduit-demos --example tool_calling`

use async_trait::async_trait;
use conduit::{Tool, ToolError, ToolExecutor};
use conduit_core::{GenerateConfig, Message, Property, Schema, StructuredContent, ToolChoice, ToolDefinition};
use conduit_openai::openai;
use std::sync::Arc;

struct WeatherTool;

#[async_trait]
impl Tool for WeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    async fn execute(&self, arguments: &StructuredContent) -> Result<StructuredContent, ToolError> {
        let city = arguments.get("city").map_err(|e| ToolError {
            tool: self.name().to_string(),
            underlying: e.to_string(),
        })?;
        let mut result = StructuredContent::object();
        result.insert("city".to_string(), city.clone());
        result.insert("temperature_f".to_string(), StructuredContent::Number(72.0));
        result.insert("conditions".to_string(), StructuredContent::String("Partly cloudy".to_string()));
        Ok(StructuredContent::Object(result))
    }
}

fn weather_tool_definition() -> ToolDefinition {
    let mut properties = indexmap::IndexMap::new();
    properties.insert(
        "city".to_string(),
        Property::required(
            Schema::String { constraints: vec![] },
            Some("The city to get weather for, e.g. San Francisco".to_string()),
        ),
    );
    ToolDefinition {
        name: "get_weather".to_string(),
        description: "Get the current weather for a given city".to_string(),
        parameters: Schema::Object { name: "GetWeatherArgs".to_string(), description: None, properties },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = openai(None);
    let config = GenerateConfig::new()
        .with_temperature(0.0)
        .with_tools(vec![weather_tool_definition()])
        .with_tool_choice(ToolChoice::Auto);

    let executor = ToolExecutor::new(vec![Arc::new(WeatherTool) as Arc<dyn Tool>]);
    let messages = vec![Message::user("What's the weather like in San Francisco?")];

    let answer = executor.execute(&provider, messages, "gpt-4o-mini", &config).await?;
    println!("{answer}");
    Ok(())
}
