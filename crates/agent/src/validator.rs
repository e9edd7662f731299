//! Tool argument validation against the advertised input schema.

use jsonschema::JSONSchema;
use serde_json::Value;
use tracing::debug;

/// Why a set of arguments was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

/// Check `arguments` against an object schema of the form
/// `{type: object, properties, required}`.
///
/// Never panics. A schema the validator cannot compile degrades to a
/// plain required-field check.
pub fn validate(schema: &Value, arguments: &Value) -> Result<(), ValidationError> {
    let Some(fields) = arguments.as_object() else {
        return Err(ValidationError(format!(
            "arguments must be a JSON object, got {}",
            kind_of(arguments)
        )));
    };

    let compiled = match JSONSchema::compile(schema) {
        Ok(compiled) => compiled,
        Err(e) => {
            debug!(error = %e, "Tool schema did not compile, checking required fields only");
            return check_required(schema, fields);
        }
    };

    if let Err(errors) = compiled.validate(arguments) {
        let messages: Vec<String> = errors.map(|e| describe(&e)).collect();
        return Err(ValidationError(messages.join("; ")));
    }

    Ok(())
}

fn describe(error: &jsonschema::ValidationError<'_>) -> String {
    let path = error.instance_path.to_string();
    if path.is_empty() {
        error.to_string()
    } else {
        format!("{path}: {error}")
    }
}

fn check_required(
    schema: &Value,
    fields: &serde_json::Map<String, Value>,
) -> Result<(), ValidationError> {
    let missing: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|required| {
            required
                .iter()
                .filter_map(Value::as_str)
                .filter(|name| !fields.contains_key(*name))
                .collect()
        })
        .unwrap_or_default();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(ValidationError(format!(
            "missing required field(s): {}",
            missing.join(", ")
        )))
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
