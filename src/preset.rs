//! Pre-supplied answers.
//! Preset data replaces interactive input for every key it contains. Values
//! are used verbatim; only their JSON type is checked against the declared
//! fields before the run starts.

use std::io::Read;
use std::path::PathBuf;

use log::debug;
use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::meta::{ElementKind, FieldKind, MetaField, NumberKind};

/// Where preset data comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum PresetSource {
    /// Inline JSON text
    Data(String),
    /// JSON file
    File(PathBuf),
    /// JSON read from standard input
    Stdin,
    None,
}

impl PresetSource {
    pub fn from_args(data: Option<String>, data_file: Option<PathBuf>, stdin: bool) -> Self {
        match (data, data_file, stdin) {
            (Some(data), _, _) => PresetSource::Data(data),
            (None, Some(path), _) => PresetSource::File(path),
            (None, None, true) => PresetSource::Stdin,
            (None, None, false) => PresetSource::None,
        }
    }
}

/// Reads preset data from `source`.
///
/// # Errors
/// * `Error::PresetDataError` if the data is not valid JSON
pub fn load_preset(source: &PresetSource) -> Result<Option<Value>> {
    let text = match source {
        PresetSource::None => return Ok(None),
        PresetSource::Data(data) => data.clone(),
        PresetSource::File(path) => std::fs::read_to_string(path)?,
        PresetSource::Stdin => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            buffer
        }
    };
    debug!("Loaded {} bytes of preset data", text.len());

    serde_json::from_str(text.trim())
        .map(Some)
        .map_err(|e| Error::PresetDataError(format!("invalid JSON: {}", e)))
}

/// JSON Schema accepted for preset values of a field kind.
pub fn value_schema(kind: &FieldKind) -> Value {
    let element = |element: &ElementKind| match element {
        ElementKind::String => json!({ "type": "string" }),
        ElementKind::Number(NumberKind::Integer) => json!({ "type": "integer" }),
        ElementKind::Number(NumberKind::Real) => json!({ "type": "number" }),
    };
    match kind {
        FieldKind::String { .. } | FieldKind::Path { .. } => json!({ "type": "string" }),
        FieldKind::Number { number: NumberKind::Integer, .. } => json!({ "type": ["integer", "null"] }),
        FieldKind::Number { number: NumberKind::Real, .. } => json!({ "type": ["number", "null"] }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::Choice { element: kind, .. } => element(kind),
        FieldKind::MultiSelect { element: kind, .. } => {
            json!({ "type": "array", "items": element(kind) })
        }
    }
}

/// Checks that `preset` is an object whose values have the JSON type of the
/// matching fields. Keys without a field are kept and left unchecked.
///
/// # Errors
/// * `Error::PresetDataError` describing the first offending value
pub fn validate_preset(fields: &[MetaField], preset: &Value) -> Result<Map<String, Value>> {
    let Value::Object(preset) = preset else {
        return Err(Error::PresetDataError(format!(
            "expected a JSON object, got {}",
            preset
        )));
    };

    for field in fields {
        let Some(value) = preset.get(field.key()) else {
            continue;
        };
        let schema = value_schema(field.kind());
        let validator = jsonschema::validator_for(&schema)
            .map_err(|e| Error::PresetDataError(format!("invalid schema for '{}': {}", field.key(), e)))?;
        let first_error = validator.iter_errors(value).next().map(|error| error.to_string());
        if let Some(error) = first_error {
            return Err(Error::PresetDataError(format!(
                "value of '{}' does not match a `{}` field: {}",
                field.key(),
                field.kind().name(),
                error
            )));
        }
    }
    Ok(preset.clone())
}
