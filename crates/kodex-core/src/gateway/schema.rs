//! Response-schema helpers
//!
//! Capabilities describe their structured output once, as standard JSON
//! Schema. That same schema validates the reply locally; a trimmed,
//! upper-cased copy is what Gemini's `responseSchema` field accepts.

use jsonschema::JSONSchema;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::errors::GatewayError;

/// Keywords the Gemini OpenAPI subset rejects.
const UNSUPPORTED_KEYWORDS: [&str; 5] = [
    "$schema",
    "additionalProperties",
    "pattern",
    "title",
    "default",
];

/// Converts a JSON Schema into the OpenAPI-subset form Gemini expects.
pub fn to_gemini_schema(schema: &Value) -> Value {
    match schema {
        Value::Object(map) => {
            let mut converted = Map::new();
            for (key, value) in map {
                if UNSUPPORTED_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                let value = match key.as_str() {
                    "type" => match value.as_str() {
                        Some(t) => Value::String(t.to_ascii_uppercase()),
                        None => value.clone(),
                    },
                    // Property names are data, not schema keywords.
                    "properties" => match value.as_object() {
                        Some(props) => Value::Object(
                            props
                                .iter()
                                .map(|(name, prop)| (name.clone(), to_gemini_schema(prop)))
                                .collect(),
                        ),
                        None => value.clone(),
                    },
                    _ => to_gemini_schema(value),
                };
                converted.insert(key.clone(), value);
            }
            Value::Object(converted)
        }
        Value::Array(items) => Value::Array(items.iter().map(to_gemini_schema).collect()),
        other => other.clone(),
    }
}

/// Validates `instance` against `schema`, collecting every violation.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), GatewayError> {
    let compiled = JSONSchema::compile(schema)
        .map_err(|e| GatewayError::Configuration(format!("Invalid response schema: {}", e)))?;

    if let Err(errors) = compiled.validate(instance) {
        let messages: Vec<String> = errors
            .map(|e| {
                let path = e.instance_path.to_string();
                if path.is_empty() {
                    e.to_string()
                } else {
                    format!("{} at {}", e, path)
                }
            })
            .collect();
        return Err(GatewayError::SchemaValidation(messages.join("; ")));
    }

    Ok(())
}

/// Parses raw reply text as JSON, validates it and deserializes it.
///
/// Models occasionally wrap JSON in a markdown fence even when asked for
/// `application/json`; the fence is stripped before parsing.
pub fn parse_structured<T: DeserializeOwned>(
    schema: &Value,
    raw: Option<&str>,
) -> Result<T, GatewayError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| GatewayError::EmptyResponse("Expected a JSON reply".to_string()))?;

    let body = strip_code_fence(raw);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| GatewayError::Parsing(format!("Reply is not valid JSON: {}", e)))?;

    validate(schema, &value)?;

    serde_json::from_value(value)
        .map_err(|e| GatewayError::Parsing(format!("Reply has an unexpected shape: {}", e)))
}

fn strip_code_fence(raw: &str) -> &str {
    let Some(rest) = raw.strip_prefix("```") else {
        return raw;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}
