//! Streams a recipe out of a model as structured JSON, printing each partial
//! value as it arrives and the final typed value once the document completes.
//!
//! Run with `OPENAI_API_KEY` set in the environment:
//! `cargo run -p conduit-demos --example partial_output`

use conduit::{schema_for, structured_stream, StructuredEvent};
use conduit_core::{
    AIProvider, GenerateConfig, Generable, Message, PartialGenerable, Property, Schema, StructuredContent,
    StructuredContentError,
};
use conduit_openai::openai;
use futures::stream::StreamExt;

#[derive(Debug, Clone, PartialEq)]
struct Recipe {
    name: String,
    ingredients: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, std::hash::Hash)]
struct RecipePartial {
    name: Option<String>,
    ingredients: Vec<String>,
}

impl Generable for Recipe {
    type Partial = RecipePartial;

    fn schema() -> Schema {
        let mut properties = indexmap::IndexMap::new();
        properties.insert("name".to_string(), Property::required(Schema::String { constraints: vec![] }, None));
        properties.insert(
            "ingredients".to_string(),
            Property::required(
                Schema::Array { items: Box::new(Schema::String { constraints: vec![] }), constraints: vec![] },
                None,
            ),
        );
        Schema::Object { name: "Recipe".to_string(), description: None, properties }
    }

    fn to_structured_content(&self) -> StructuredContent {
        let mut obj = indexmap::IndexMap::new();
        obj.insert("name".to_string(), StructuredContent::String(self.name.clone()));
        obj.insert(
            "ingredients".to_string(),
            StructuredContent::Array(self.ingredients.iter().cloned().map(StructuredContent::String).collect()),
        );
        StructuredContent::Object(obj)
    }

    fn from_structured_content(content: &StructuredContent) -> Result<Self, StructuredContentError> {
        let name = content.get("name")?.as_str()?.to_string();
        let ingredients = content
            .get("ingredients")?
            .as_array()?
            .iter()
            .map(|v| v.as_str().map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Recipe { name, ingredients })
    }
}

impl PartialGenerable<Recipe> for RecipePartial {
    fn from_partial_content(content: &StructuredContent) -> Result<Self, StructuredContentError> {
        let name = match content.get("name") {
            Ok(v) => Some(v.as_str()?.to_string()),
            Err(_) => None,
        };
        let ingredients = match content.get("ingredients") {
            Ok(v) => v.as_array()?.iter().filter_map(|i| i.as_str().ok().map(str::to_string)).collect(),
            Err(_) => Vec::new(),
        };
        Ok(RecipePartial { name, ingredients })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let provider = openai(None);

    let schema_json = schema_for::<Recipe>().to_json_schema();
    let prompt = format!(
        "Generate a recipe for chocolate chip cookies as JSON matching this schema, \
         with no surrounding prose: {schema_json}"
    );
    let messages = vec![Message::user(prompt)];
    let config = GenerateConfig::new().with_temperature(0.7).with_max_tokens(300);

    let chunks = provider.stream(&messages, "gpt-4o-mini", &config).await?;
    let mut events = structured_stream::<Recipe>(chunks);

    while let Some(event) = events.next().await {
        match event? {
            StructuredEvent::Partial(partial) => println!("partial: {partial:?}"),
            StructuredEvent::Complete(recipe) => println!("complete: {recipe:?}"),
        }
    }
    Ok(())
}
