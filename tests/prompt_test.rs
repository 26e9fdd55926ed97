use kiln::config::EngineConfig;
use kiln::error::Error;
use kiln::meta::MetaField;
use kiln::prompt::{resolve_field, DefaultsPrompter, LinePrompter};
use kiln::renderer::{Metadata, MiniJinjaRenderer};
use serde_json::{json, Map, Value};

fn renderer() -> MiniJinjaRenderer {
    MiniJinjaRenderer::new(&EngineConfig::default()).unwrap()
}

/// Resolves `field` against `input` and returns the value with everything
/// the prompter printed.
fn resolve(field: &MetaField, metadata: &Metadata, input: &str) -> (kiln::error::Result<Value>, String) {
    let mut prompter = LinePrompter::new(input.as_bytes(), Vec::new());
    let result = resolve_field(field, &renderer(), metadata, None, &mut prompter);
    let output = String::from_utf8(prompter.into_inner().1).unwrap();
    (result, output)
}

fn field(key: &str, raw: Value) -> MetaField {
    MetaField::from_raw(key, &raw).unwrap()
}

#[test]
fn test_preset_value_is_used_verbatim() {
    let field = field("name", json!({"type": "str", "min_length": 10}));
    let mut preset = Map::new();
    preset.insert("name".to_string(), json!("ab"));

    let mut prompter = LinePrompter::new("".as_bytes(), Vec::new());
    let value =
        resolve_field(&field, &renderer(), &Metadata::new(), Some(&preset), &mut prompter).unwrap();

    assert_eq!(value, json!("ab"));
    assert!(prompter.output().is_empty());
}

#[test]
fn test_empty_input_uses_default() {
    let (value, output) = resolve(&field("version", json!("0.1.0")), &Metadata::new(), "\n");
    assert_eq!(value.unwrap(), json!("0.1.0"));
    assert_eq!(output, "Version [0.1.0]: ");
}

#[test]
fn test_required_field_prompts_again() {
    let (value, output) = resolve(&field("project_name", Value::Null), &Metadata::new(), "\n  \nacme\n");
    assert_eq!(value.unwrap(), json!("acme"));
    assert_eq!(
        output,
        "Project Name: This field is required.\nProject Name: This field is required.\nProject Name: "
    );
}

#[test]
fn test_input_is_trimmed() {
    let (value, _) = resolve(&field("project_name", Value::Null), &Metadata::new(), "  acme \n");
    assert_eq!(value.unwrap(), json!("acme"));
}

#[test]
fn test_boolean_prompt() {
    let (value, output) = resolve(&field("use_docker", json!(true)), &Metadata::new(), "n\n");
    assert_eq!(value.unwrap(), json!(false));
    assert_eq!(output, "Use Docker (Y/n): ");

    let (value, output) = resolve(&field("use_docker", json!(true)), &Metadata::new(), "perhaps\n\n");
    assert_eq!(value.unwrap(), json!(true));
    assert_eq!(output, "Use Docker (Y/n): Input must be yes or no.\nUse Docker (Y/n): ");
}

#[test]
fn test_choice_rejects_unknown_option() {
    let (value, output) = resolve(&field("level", json!([1, 2, 3])), &Metadata::new(), "5\n2\n");
    assert_eq!(value.unwrap(), json!(2));
    assert_eq!(
        output,
        "Level (1, 2, 3) [1]: Input must be one of the following choices: 1, 2, 3.\nLevel (1, 2, 3) [1]: "
    );
}

#[test]
fn test_integer_parse_failure() {
    let field = field("workers", json!({"type": "int", "min": 1, "max": 8, "default": 2}));
    let (value, output) = resolve(&field, &Metadata::new(), "many\n9\n7\n");
    assert_eq!(value.unwrap(), json!(7));
    assert_eq!(
        output,
        "Workers (1-8) [2]: Input must be an integer.\n\
         Workers (1-8) [2]: Input must be at most 8.\n\
         Workers (1-8) [2]: "
    );
}

#[test]
fn test_optional_number_without_default() {
    let field = field("port", json!({"type": "int", "required": false}));
    let (value, _) = resolve(&field, &Metadata::new(), "\n");
    assert_eq!(value.unwrap(), Value::Null);
}

#[test]
fn test_default_is_checked_against_constraints() {
    let field = field("name", json!({"type": "str", "default": "ab", "min_length": 3}));
    let (value, output) = resolve(&field, &Metadata::new(), "\nabcd\n");
    assert_eq!(value.unwrap(), json!("abcd"));
    assert!(output.contains("Input must be at least 3 characters long.\n"));
}

#[test]
fn test_templated_default() {
    let mut metadata = Metadata::new();
    metadata.insert("project_name".to_string(), json!("Demo App"));

    let field = field("package", json!("[[ project_name | snake_case ]]"));
    let (value, output) = resolve(&field, &metadata, "\n");
    assert_eq!(value.unwrap(), json!("demo_app"));
    assert_eq!(output, "Package [demo_app]: ");
}

#[test]
fn test_templated_choices() {
    let mut metadata = Metadata::new();
    metadata.insert("name".to_string(), json!("acme"));

    let field = field("crate_kind", json!({"choices": ["[[ name ]]-core", "plain"]}));
    let (value, output) = resolve(&field, &metadata, "acme-core\n");
    assert_eq!(value.unwrap(), json!("acme-core"));
    assert_eq!(output, "Crate Kind (acme-core, plain): ");
}

#[test]
fn test_multi_select() {
    let field = field("features", json!({"type": "select", "choices": ["ci", "docs", "lint"]}));
    let (value, output) = resolve(&field, &Metadata::new(), "ci, web\nci, docs\n");
    assert_eq!(value.unwrap(), json!(["ci", "docs"]));
    assert!(output.starts_with("Features (ci, docs, lint; comma-separated): Input must be one of"));
}

#[test]
fn test_reference_to_unresolved_field_fails() {
    let field = field("package", json!("[[ project_name ]]"));
    let (value, output) = resolve(&field, &Metadata::new(), "\n");
    assert!(matches!(value, Err(Error::TemplateStringError { template, .. }) if template == "[[ project_name ]]"));
    assert!(output.is_empty());
}

#[test]
fn test_closed_input_aborts() {
    let (value, _) = resolve(&field("project_name", Value::Null), &Metadata::new(), "");
    assert!(matches!(value, Err(Error::PromptAbortedError { key, .. }) if key == "project_name"));
}

#[test]
fn test_defaults_prompter_uses_defaults() {
    let mut prompter = DefaultsPrompter::new();
    let value =
        resolve_field(&field("version", json!("0.1.0")), &renderer(), &Metadata::new(), None, &mut prompter)
            .unwrap();
    assert_eq!(value, json!("0.1.0"));

    let value = resolve_field(&field("use_docker", json!(true)), &renderer(), &Metadata::new(), None, &mut prompter)
        .unwrap();
    assert_eq!(value, json!(true));
}

#[test]
fn test_defaults_prompter_fails_required_field() {
    let mut prompter = DefaultsPrompter::new();
    let err = resolve_field(&field("project_name", Value::Null), &renderer(), &Metadata::new(), None, &mut prompter)
        .unwrap_err();
    assert!(matches!(err, Error::PromptAbortedError { ref key, .. } if key == "project_name"));
    assert_eq!(err.to_string(), "Prompt for 'project_name' aborted: This field is required.");
}
