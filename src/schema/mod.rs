//! Schema definitions for every object exchanged with the model and the client.
//!
//! Output types (`blog`) describe themselves to the model through
//! [`OutputSchema`], using the OpenAPI subset the Gemini API accepts for
//! `responseSchema`. Request types (`requests`) enforce their field
//! constraints through [`Validate`].

pub mod blog;
pub mod requests;

use serde_json::{Map, Value, json};

use crate::errors::ValidationError;

pub use blog::{
    BlogPost, PartialBlogPost, PartialPostSummary, PartialSubtopic, PostSummary, Subtopic,
};
pub use requests::{
    AnalyzeBlogPostRequest, CompletePostRequest, PostSummariesRequest, StructuredOutputRequest,
    SubtopicsRequest,
};

/// A type whose shape can be handed to the model as a response schema.
pub trait OutputSchema {
    fn schema() -> Value;
}

impl<T: OutputSchema> OutputSchema for Vec<T> {
    fn schema() -> Value {
        json!({ "type": "ARRAY", "items": T::schema() })
    }
}

/// Declarative input constraints, checked before any model call.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

pub fn string(description: &str) -> Value {
    json!({ "type": "STRING", "description": description })
}

pub fn number(description: &str) -> Value {
    json!({ "type": "NUMBER", "description": description })
}

pub fn array(items: Value, description: &str) -> Value {
    json!({ "type": "ARRAY", "items": items, "description": description })
}

/// Object schema; property order is preserved so the model emits fields in
/// declaration order, which keeps partial snapshots readable.
pub fn object(properties: &[(&str, Value)], required: &[&str]) -> Value {
    let mut props = Map::new();
    for (name, schema) in properties {
        props.insert((*name).to_string(), schema.clone());
    }
    let ordering: Vec<&str> = properties.iter().map(|(name, _)| *name).collect();
    json!({
        "type": "OBJECT",
        "properties": props,
        "required": required,
        "propertyOrdering": ordering,
    })
}

/// Length rule for a required string field, counted in characters.
pub(crate) fn check_required(
    field: &'static str,
    value: &str,
    label: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new(field, format!("{} is required", label)));
    }
    check_max(field, value, label, max)
}

pub(crate) fn check_max(
    field: &'static str,
    value: &str,
    label: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.chars().count() > max {
        return Err(ValidationError::new(
            field,
            format!("{} must be less than {} characters", label, max),
        ));
    }
    Ok(())
}
