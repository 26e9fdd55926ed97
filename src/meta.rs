//! Metadata field descriptors.
//! A `MetaField` describes one piece of project metadata declared under the
//! `meta` key of a template configuration: its kind, label, default and the
//! constraints an answer must satisfy.

use std::path::Path;
use std::sync::LazyLock;

use cruet::Inflector;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::constants::RESERVED_WORDS;
use crate::error::FieldError;

static KEY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("key pattern is valid"));

const COMMON_OPTIONS: [&str; 5] = ["prompt", "type", "default", "required", "choices"];
const STRING_OPTIONS: [&str; 2] = ["min_length", "max_length"];
const NUMBER_OPTIONS: [&str; 2] = ["min", "max"];
const PATH_OPTIONS: [&str; 3] = ["exists", "is_dir", "is_file"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Integer,
    Real,
}

/// Type of the options of a `Choice` or `MultiSelect` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    String,
    Number(NumberKind),
}

/// What must hold on disk for a path answer to be accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathCheck {
    Any,
    Exists,
    Dir,
    File,
}

/// The kind of a field together with its kind-specific constraints.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    String { min_length: Option<usize>, max_length: Option<usize> },
    Number { number: NumberKind, min: Option<f64>, max: Option<f64> },
    Boolean,
    Path { check: PathCheck },
    Choice { element: ElementKind, options: Vec<Value> },
    MultiSelect { element: ElementKind, options: Vec<Value> },
}

/// An immutable descriptor for one metadata field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaField {
    key: String,
    prompt: String,
    kind: FieldKind,
    default: Option<Value>,
    required: bool,
}

impl MetaField {
    /// Builds a field from its raw configuration value.
    ///
    /// # Arguments
    /// * `key` - Field key, used as the template variable name
    /// * `raw` - `null`, a bare scalar, a bare list of choices, or an options record
    ///
    /// # Errors
    /// * `FieldError` describing the first rule the declaration violates
    pub fn from_raw(key: &str, raw: &Value) -> Result<Self, FieldError> {
        if !KEY_PATTERN.is_match(key) || RESERVED_WORDS.contains(&key) {
            return Err(FieldError::InvalidFieldKey { key: key.to_string() });
        }
        let prompt = key.to_title_case();

        match raw {
            Value::Object(options) => Self::from_options(key, prompt, options),
            Value::Null => Ok(Self {
                key: key.to_string(),
                prompt,
                kind: FieldKind::String { min_length: None, max_length: None },
                default: None,
                required: true,
            }),
            Value::Array(choices) => {
                let first = choices.first().ok_or_else(|| FieldError::EmptyChoices {
                    key: key.to_string(),
                })?;
                let element = element_of(key, first)?;
                let options = check_choices(key, element, choices)?;
                Ok(Self {
                    key: key.to_string(),
                    prompt,
                    default: options.first().cloned(),
                    kind: FieldKind::Choice { element, options },
                    required: false,
                })
            }
            scalar => Ok(Self {
                key: key.to_string(),
                prompt,
                kind: scalar_kind(scalar),
                default: Some(scalar.clone()),
                required: false,
            }),
        }
    }

    fn from_options(
        key: &str,
        label: String,
        options: &Map<String, Value>,
    ) -> Result<Self, FieldError> {
        let is_known = |option: &str| {
            COMMON_OPTIONS.contains(&option)
                || STRING_OPTIONS.contains(&option)
                || NUMBER_OPTIONS.contains(&option)
                || PATH_OPTIONS.contains(&option)
        };
        if let Some(option) = options.keys().find(|option| !is_known(option.as_str())) {
            return Err(unknown_option(key, option));
        }

        let prompt = match options.get("prompt") {
            None | Some(Value::Null) => label,
            Some(Value::String(prompt)) => prompt.clone(),
            Some(_) => return Err(mismatch(key, "`prompt` must be a string")),
        };
        let default = options.get("default").filter(|v| !v.is_null()).cloned();
        let required = match options.get("required") {
            None | Some(Value::Null) => None,
            Some(Value::Bool(required)) => Some(*required),
            Some(_) => return Err(mismatch(key, "`required` must be a boolean")),
        };
        let choices = match options.get("choices") {
            None | Some(Value::Null) => None,
            Some(Value::Array(choices)) if choices.is_empty() => {
                return Err(FieldError::EmptyChoices { key: key.to_string() })
            }
            Some(Value::Array(choices)) => Some(choices),
            Some(_) => return Err(mismatch(key, "`choices` must be a list")),
        };
        let type_name = match options.get("type") {
            Some(Value::String(name)) => name.clone(),
            None | Some(Value::Null) => infer_type_name(key, default.as_ref(), choices.is_some())?,
            Some(other) => {
                return Err(FieldError::UnsupportedType {
                    key: key.to_string(),
                    type_name: other.to_string(),
                })
            }
        };

        let extras: &[&str] = match type_name.as_str() {
            "str" => &STRING_OPTIONS,
            "int" | "float" => &NUMBER_OPTIONS,
            "path" => &PATH_OPTIONS,
            "bool" | "choice" | "select" => &[],
            _ => {
                return Err(FieldError::UnsupportedType {
                    key: key.to_string(),
                    type_name: type_name.clone(),
                })
            }
        };
        let allowed = |option: &str| COMMON_OPTIONS.contains(&option) || extras.contains(&option);
        if let Some(option) = options.keys().find(|option| !allowed(option.as_str())) {
            return Err(unknown_option(key, option));
        }

        if required == Some(true) && default.is_some() {
            return Err(conflict(key, "a required field cannot declare a default"));
        }
        let required = required.unwrap_or(default.is_none());

        let kind = match (type_name.as_str(), choices) {
            ("bool" | "path", Some(_)) => {
                return Err(mismatch(key, &format!("`{}` fields cannot declare choices", type_name)))
            }
            ("choice" | "select", None) => {
                return Err(conflict(key, &format!("`{}` fields require `choices`", type_name)))
            }
            (name, Some(choices)) => {
                if extras.iter().any(|option| options.contains_key(*option)) {
                    return Err(conflict(key, "bounds cannot be combined with choices"));
                }
                let element = match name {
                    "str" => ElementKind::String,
                    "int" => ElementKind::Number(NumberKind::Integer),
                    "float" => ElementKind::Number(NumberKind::Real),
                    _ => element_of(key, &choices[0])?,
                };
                let options = check_choices(key, element, choices)?;
                if name == "select" {
                    FieldKind::MultiSelect { element, options }
                } else {
                    FieldKind::Choice { element, options }
                }
            }
            ("str", None) => string_kind(key, options)?,
            ("int", None) => number_kind(key, NumberKind::Integer, options)?,
            ("float", None) => number_kind(key, NumberKind::Real, options)?,
            ("bool", None) => FieldKind::Boolean,
            (_, None) => FieldKind::Path { check: path_check(key, options)? },
        };

        let default = match default {
            Some(value) => Some(check_default(key, &kind, value)?),
            None => None,
        };

        Ok(Self { key: key.to_string(), prompt, kind, default, required })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Human readable label shown when prompting.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    /// Declared default; string defaults may still contain template syntax.
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn required(&self) -> bool {
        self.required
    }
}

impl FieldKind {
    /// Name of the kind as written in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::String { .. } => "str",
            FieldKind::Number { number: NumberKind::Integer, .. } => "int",
            FieldKind::Number { number: NumberKind::Real, .. } => "float",
            FieldKind::Boolean => "bool",
            FieldKind::Path { .. } => "path",
            FieldKind::Choice { .. } => "choice",
            FieldKind::MultiSelect { .. } => "select",
        }
    }

    /// Constraint hint displayed next to the prompt label.
    pub fn hint(&self, default: Option<&Value>) -> Option<String> {
        match self {
            FieldKind::String { min_length, max_length } => match (min_length, max_length) {
                (Some(min), Some(max)) => Some(format!("{}-{} characters", min, max)),
                (Some(min), None) => Some(format!(">= {} characters", min)),
                (None, Some(max)) => Some(format!("<= {} characters", max)),
                (None, None) => None,
            },
            FieldKind::Number { min, max, .. } => match (min, max) {
                (Some(min), Some(max)) => Some(format!("{}-{}", min, max)),
                (Some(min), None) => Some(format!(">={}", min)),
                (None, Some(max)) => Some(format!("<={}", max)),
                (None, None) => None,
            },
            FieldKind::Boolean => match default.and_then(Value::as_bool) {
                Some(true) => Some("Y/n".to_string()),
                Some(false) => Some("y/N".to_string()),
                None => Some("y/n".to_string()),
            },
            FieldKind::Path { check } => match check {
                PathCheck::Dir => Some("dir".to_string()),
                PathCheck::File => Some("file".to_string()),
                PathCheck::Exists => Some("exists".to_string()),
                PathCheck::Any => None,
            },
            FieldKind::Choice { options, .. } => Some(join_values(options)),
            FieldKind::MultiSelect { options, .. } => {
                Some(format!("{}; comma-separated", join_values(options)))
            }
        }
    }

    /// Converts one line of non-empty input into a value of this kind.
    ///
    /// # Returns
    /// * `Err(message)` - The message shown before prompting again
    pub fn coerce(&self, input: &str) -> Result<Value, String> {
        match self {
            FieldKind::String { .. } | FieldKind::Path { .. } => {
                Ok(Value::String(input.to_string()))
            }
            FieldKind::Number { number, .. } => parse_number(*number, input),
            FieldKind::Boolean => parse_bool(input)
                .map(Value::Bool)
                .ok_or_else(|| "Input must be yes or no.".to_string()),
            FieldKind::Choice { element, .. } => parse_element(*element, input),
            FieldKind::MultiSelect { element, .. } => input
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(|item| parse_element(*element, item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
        }
    }

    /// Checks a candidate answer against the constraints of this kind.
    ///
    /// # Returns
    /// * `Err(message)` - The message shown before prompting again
    pub fn check(&self, value: &Value) -> Result<(), String> {
        match self {
            FieldKind::String { min_length, max_length } => {
                let text = value.as_str().ok_or_else(|| "Input must be text.".to_string())?;
                let length = text.chars().count();
                if let Some(min) = min_length.filter(|min| length < *min) {
                    return Err(format!("Input must be at least {} characters long.", min));
                }
                if let Some(max) = max_length.filter(|max| length > *max) {
                    return Err(format!("Input must be at most {} characters long.", max));
                }
                Ok(())
            }
            FieldKind::Number { number, min, max } => {
                if value.is_null() {
                    return Ok(());
                }
                if *number == NumberKind::Integer && !is_integer(value) {
                    return Err("Input must be an integer.".to_string());
                }
                let number = value.as_f64().ok_or_else(|| "Input must be a number.".to_string())?;
                if let Some(min) = min.filter(|min| number < *min) {
                    return Err(format!("Input must be at least {}.", min));
                }
                if let Some(max) = max.filter(|max| number > *max) {
                    return Err(format!("Input must be at most {}.", max));
                }
                Ok(())
            }
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(()),
                _ => Err("Input must be yes or no.".to_string()),
            },
            FieldKind::Path { check } => {
                let path = Path::new(value.as_str().ok_or_else(|| "Input must be a path.".to_string())?);
                match check {
                    PathCheck::Exists if !path.exists() => Err("Path does not exist.".to_string()),
                    PathCheck::Dir if !path.is_dir() => Err("Path is not a directory.".to_string()),
                    PathCheck::File if !path.is_file() => Err("Path is not a file.".to_string()),
                    _ => Ok(()),
                }
            }
            FieldKind::Choice { options, .. } => {
                if options.contains(value) {
                    Ok(())
                } else {
                    Err(not_a_choice(options))
                }
            }
            FieldKind::MultiSelect { options, .. } => match value {
                Value::Array(items) if items.iter().all(|item| options.contains(item)) => Ok(()),
                _ => Err(not_a_choice(options)),
            },
        }
    }

    /// Value used when input is left empty and the field has no default.
    /// `None` means an explicit answer is needed.
    pub fn fallback(&self) -> Option<Value> {
        match self {
            FieldKind::String { .. } | FieldKind::Path { .. } => Some(Value::String(String::new())),
            FieldKind::Number { .. } => Some(Value::Null),
            FieldKind::Boolean => Some(Value::Bool(false)),
            FieldKind::MultiSelect { .. } => Some(Value::Array(Vec::new())),
            FieldKind::Choice { .. } => None,
        }
    }

    /// Options of a choice kind, if any.
    pub fn options(&self) -> Option<&[Value]> {
        match self {
            FieldKind::Choice { options, .. } | FieldKind::MultiSelect { options, .. } => {
                Some(options)
            }
            _ => None,
        }
    }

    /// Returns a copy of this kind with its options replaced.
    /// Non-choice kinds are returned unchanged.
    pub fn with_options(&self, rendered: Vec<Value>) -> FieldKind {
        match self {
            FieldKind::Choice { element, .. } => {
                FieldKind::Choice { element: *element, options: rendered }
            }
            FieldKind::MultiSelect { element, .. } => {
                FieldKind::MultiSelect { element: *element, options: rendered }
            }
            other => other.clone(),
        }
    }
}

/// Renders a value the way it is shown in prompts.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => join_values(items),
        other => other.to_string(),
    }
}

fn join_values(values: &[Value]) -> String {
    values.iter().map(display_value).collect::<Vec<_>>().join(", ")
}

fn not_a_choice(options: &[Value]) -> String {
    format!("Input must be one of the following choices: {}.", join_values(options))
}

fn unknown_option(key: &str, option: &str) -> FieldError {
    FieldError::UnknownFieldOption { key: key.to_string(), option: option.to_string() }
}

fn mismatch(key: &str, reason: &str) -> FieldError {
    FieldError::TypeMismatch { key: key.to_string(), reason: reason.to_string() }
}

fn conflict(key: &str, reason: &str) -> FieldError {
    FieldError::ConflictingConstraint { key: key.to_string(), reason: reason.to_string() }
}

fn is_integer(value: &Value) -> bool {
    value.is_i64() || value.is_u64()
}

fn scalar_kind(scalar: &Value) -> FieldKind {
    match scalar {
        Value::Bool(_) => FieldKind::Boolean,
        Value::Number(_) if is_integer(scalar) => {
            FieldKind::Number { number: NumberKind::Integer, min: None, max: None }
        }
        Value::Number(_) => FieldKind::Number { number: NumberKind::Real, min: None, max: None },
        _ => FieldKind::String { min_length: None, max_length: None },
    }
}

fn infer_type_name(
    key: &str,
    default: Option<&Value>,
    has_choices: bool,
) -> Result<String, FieldError> {
    let name = match default {
        Some(Value::String(_)) => "str",
        Some(Value::Bool(_)) => "bool",
        Some(value @ Value::Number(_)) if is_integer(value) => "int",
        Some(Value::Number(_)) => "float",
        Some(Value::Array(_)) => "select",
        Some(_) => return Err(mismatch(key, "`default` must be a scalar or a list")),
        None if has_choices => "choice",
        None => "str",
    };
    Ok(name.to_string())
}

fn element_of(key: &str, option: &Value) -> Result<ElementKind, FieldError> {
    match option {
        Value::String(_) => Ok(ElementKind::String),
        Value::Number(_) if is_integer(option) => Ok(ElementKind::Number(NumberKind::Integer)),
        Value::Number(_) => Ok(ElementKind::Number(NumberKind::Real)),
        _ => Err(mismatch(key, "choices must be strings or numbers")),
    }
}

/// Returns the value as an option of `element`, normalizing real numbers.
fn assign_element(element: ElementKind, value: &Value) -> Option<Value> {
    match (element, value) {
        (ElementKind::String, Value::String(_)) => Some(value.clone()),
        (ElementKind::Number(NumberKind::Integer), _) if is_integer(value) => Some(value.clone()),
        (ElementKind::Number(NumberKind::Real), Value::Number(number)) => {
            number.as_f64().map(Value::from)
        }
        _ => None,
    }
}

fn element_name(element: ElementKind) -> &'static str {
    match element {
        ElementKind::String => "strings",
        ElementKind::Number(NumberKind::Integer) => "integers",
        ElementKind::Number(NumberKind::Real) => "numbers",
    }
}

fn check_choices(
    key: &str,
    element: ElementKind,
    choices: &[Value],
) -> Result<Vec<Value>, FieldError> {
    choices
        .iter()
        .map(|choice| {
            assign_element(element, choice).ok_or_else(|| {
                mismatch(key, &format!("all choices must be {}", element_name(element)))
            })
        })
        .collect()
}

fn check_default(key: &str, kind: &FieldKind, default: Value) -> Result<Value, FieldError> {
    let checked = match kind {
        FieldKind::String { .. } | FieldKind::Path { .. } => {
            default.is_string().then_some(default)
        }
        FieldKind::Number { number: NumberKind::Integer, .. } => {
            is_integer(&default).then_some(default)
        }
        FieldKind::Number { number: NumberKind::Real, .. } => {
            default.as_f64().map(Value::from)
        }
        FieldKind::Boolean => default.is_boolean().then_some(default),
        FieldKind::Choice { element, .. } => assign_element(*element, &default),
        FieldKind::MultiSelect { element, .. } => match &default {
            Value::Array(items) => items
                .iter()
                .map(|item| assign_element(*element, item))
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
            _ => None,
        },
    };
    checked.ok_or_else(|| {
        mismatch(key, &format!("default is not assignable to a `{}` field", kind.name()))
    })
}

fn string_kind(key: &str, options: &Map<String, Value>) -> Result<FieldKind, FieldError> {
    let length = |option: &str| -> Result<Option<usize>, FieldError> {
        match options.get(option) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => match (value.as_u64(), value.as_i64()) {
                (Some(length), _) => Ok(Some(length as usize)),
                (None, Some(_)) => Err(conflict(key, &format!("`{}` cannot be negative", option))),
                (None, None) => Err(mismatch(key, &format!("`{}` must be an integer", option))),
            },
        }
    };
    let min_length = length("min_length")?;
    let max_length = length("max_length")?;
    if let (Some(min), Some(max)) = (min_length, max_length) {
        if min > max {
            return Err(conflict(key, "`min_length` cannot be greater than `max_length`"));
        }
    }
    Ok(FieldKind::String { min_length, max_length })
}

fn number_kind(
    key: &str,
    number: NumberKind,
    options: &Map<String, Value>,
) -> Result<FieldKind, FieldError> {
    let bound = |option: &str| -> Result<Option<f64>, FieldError> {
        match options.get(option) {
            None | Some(Value::Null) => Ok(None),
            Some(value) if number == NumberKind::Integer && !is_integer(value) => {
                Err(mismatch(key, &format!("`{}` of an integer field must be an integer", option)))
            }
            Some(value) => value
                .as_f64()
                .map(Some)
                .ok_or_else(|| mismatch(key, &format!("`{}` must be a number", option))),
        }
    };
    let min = bound("min")?;
    let max = bound("max")?;
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            return Err(conflict(key, "`min` cannot be greater than `max`"));
        }
    }
    Ok(FieldKind::Number { number, min, max })
}

fn path_check(key: &str, options: &Map<String, Value>) -> Result<PathCheck, FieldError> {
    let flag = |option: &str| -> Result<Option<bool>, FieldError> {
        match options.get(option) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Bool(flag)) => Ok(Some(*flag)),
            Some(_) => Err(mismatch(key, &format!("`{}` must be a boolean", option))),
        }
    };
    let exists = flag("exists")?;
    let is_dir = flag("is_dir")?.unwrap_or(false);
    let is_file = flag("is_file")?.unwrap_or(false);

    if is_dir && is_file {
        return Err(conflict(key, "`is_dir` and `is_file` cannot both be set"));
    }
    if (is_dir || is_file) && exists == Some(false) {
        return Err(conflict(key, "`is_dir` and `is_file` require `exists`"));
    }
    Ok(match (is_dir, is_file, exists) {
        (true, _, _) => PathCheck::Dir,
        (_, true, _) => PathCheck::File,
        (_, _, Some(true)) => PathCheck::Exists,
        _ => PathCheck::Any,
    })
}

fn parse_number(number: NumberKind, input: &str) -> Result<Value, String> {
    match number {
        NumberKind::Integer => input
            .parse::<i64>()
            .map(Value::from)
            .map_err(|_| "Input must be an integer.".to_string()),
        NumberKind::Real => match input.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Value::from(value)),
            _ => Err("Input must be a number.".to_string()),
        },
    }
}

fn parse_element(element: ElementKind, input: &str) -> Result<Value, String> {
    match element {
        ElementKind::String => Ok(Value::String(input.to_string())),
        ElementKind::Number(number) => parse_number(number, input),
    }
}

/// Parses a yes/no answer, case-insensitively.
pub fn parse_bool(input: &str) -> Option<bool> {
    match input.to_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" => Some(true),
        "no" | "n" | "false" | "f" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_check_resolution() {
        let options = json!({"exists": true}).as_object().cloned().unwrap();
        assert_eq!(path_check("p", &options).unwrap(), PathCheck::Exists);

        let options = json!({"is_file": true}).as_object().cloned().unwrap();
        assert_eq!(path_check("p", &options).unwrap(), PathCheck::File);

        let options = json!({}).as_object().cloned().unwrap();
        assert_eq!(path_check("p", &options).unwrap(), PathCheck::Any);
    }

    #[test]
    fn test_real_choices_are_normalized() {
        let options = check_choices("k", ElementKind::Number(NumberKind::Real), &[json!(1), json!(2.5)])
            .unwrap();
        assert_eq!(options, vec![json!(1.0), json!(2.5)]);
    }

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("text")), "text");
        assert_eq!(display_value(&json!(["a", 2])), "a, 2");
        assert_eq!(display_value(&json!(true)), "true");
    }
}
