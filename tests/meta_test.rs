use kiln::error::FieldError;
use kiln::meta::{ElementKind, FieldKind, MetaField, NumberKind, PathCheck};
use serde_json::{json, Value};

fn field(key: &str, raw: Value) -> MetaField {
    MetaField::from_raw(key, &raw).unwrap()
}

fn field_err(key: &str, raw: Value) -> FieldError {
    MetaField::from_raw(key, &raw).unwrap_err()
}

#[test]
fn test_null_is_required_string() {
    let field = field("project_name", Value::Null);
    assert_eq!(field.key(), "project_name");
    assert_eq!(field.prompt(), "Project Name");
    assert_eq!(field.kind(), &FieldKind::String { min_length: None, max_length: None });
    assert_eq!(field.default(), None);
    assert!(field.required());
}

#[test]
fn test_bare_scalars_infer_kind() {
    let version = field("version", json!("0.1.0"));
    assert_eq!(version.kind().name(), "str");
    assert_eq!(version.default(), Some(&json!("0.1.0")));
    assert!(!version.required());

    assert_eq!(
        field("workers", json!(4)).kind(),
        &FieldKind::Number { number: NumberKind::Integer, min: None, max: None }
    );
    assert_eq!(
        field("ratio", json!(0.5)).kind(),
        &FieldKind::Number { number: NumberKind::Real, min: None, max: None }
    );
    assert_eq!(field("use_docker", json!(false)).kind(), &FieldKind::Boolean);
}

#[test]
fn test_bare_list_is_choice() {
    let license = field("license", json!(["MIT", "BSD-3"]));
    assert_eq!(
        license.kind(),
        &FieldKind::Choice { element: ElementKind::String, options: vec![json!("MIT"), json!("BSD-3")] }
    );
    assert_eq!(license.default(), Some(&json!("MIT")));
    assert!(!license.required());
}

#[test]
fn test_record_with_bounds() {
    let workers = field("workers", json!({"type": "int", "min": 1, "max": 16, "default": 4}));
    assert_eq!(
        workers.kind(),
        &FieldKind::Number { number: NumberKind::Integer, min: Some(1.0), max: Some(16.0) }
    );
    assert_eq!(workers.default(), Some(&json!(4)));
    assert!(!workers.required());
    assert_eq!(workers.kind().hint(workers.default()).as_deref(), Some("1-16"));

    let name = field("name", json!({"prompt": "Package name", "min_length": 2}));
    assert_eq!(name.prompt(), "Package name");
    assert_eq!(name.kind(), &FieldKind::String { min_length: Some(2), max_length: None });
    assert!(name.required());
}

#[test]
fn test_record_type_inference() {
    assert_eq!(field("flag", json!({"default": true})).kind(), &FieldKind::Boolean);
    assert_eq!(field("level", json!({"choices": [1, 2, 3]})).kind().name(), "choice");
    assert_eq!(field("tags", json!({"choices": ["a", "b"], "default": ["a"]})).kind().name(), "select");

    let level = field("level", json!({"type": "float", "choices": [1, 2.5]}));
    assert_eq!(
        level.kind(),
        &FieldKind::Choice {
            element: ElementKind::Number(NumberKind::Real),
            options: vec![json!(1.0), json!(2.5)]
        }
    );
}

#[test]
fn test_select_field() {
    let tags = field("tags", json!({"type": "select", "choices": ["ci", "docs"], "default": ["docs"]}));
    assert_eq!(
        tags.kind(),
        &FieldKind::MultiSelect {
            element: ElementKind::String,
            options: vec![json!("ci"), json!("docs")]
        }
    );
    assert_eq!(tags.default(), Some(&json!(["docs"])));
}

#[test]
fn test_path_field() {
    let existing = field("config", json!({"type": "path", "exists": true, "is_dir": true}));
    assert_eq!(existing.kind(), &FieldKind::Path { check: PathCheck::Dir });

    let any = field("target", json!({"type": "path", "default": "out"}));
    assert_eq!(any.kind(), &FieldKind::Path { check: PathCheck::Any });
}

#[test]
fn test_required_override() {
    let optional = field("notes", json!({"type": "str", "required": false}));
    assert!(!optional.required());
    assert_eq!(optional.default(), None);
}

#[test]
fn test_invalid_keys() {
    for key in ["1st", "my-key", "", "for", "true", "None", "loop"] {
        assert_eq!(
            field_err(key, Value::Null),
            FieldError::InvalidFieldKey { key: key.to_string() },
            "key {:?}",
            key
        );
    }
}

#[test]
fn test_unknown_options() {
    assert!(matches!(
        field_err("name", json!({"colour": "red"})),
        FieldError::UnknownFieldOption { option, .. } if option == "colour"
    ));
    assert!(matches!(
        field_err("name", json!({"type": "str", "min": 1})),
        FieldError::UnknownFieldOption { option, .. } if option == "min"
    ));
    assert!(matches!(
        field_err("flag", json!({"type": "bool", "exists": true})),
        FieldError::UnknownFieldOption { option, .. } if option == "exists"
    ));
}

#[test]
fn test_unsupported_type() {
    assert_eq!(
        field_err("name", json!({"type": "complex"})),
        FieldError::UnsupportedType { key: "name".to_string(), type_name: "complex".to_string() }
    );
}

#[test]
fn test_conflicting_constraints() {
    let cases = [
        json!({"required": true, "default": "x"}),
        json!({"type": "int", "min": 5, "max": 1}),
        json!({"type": "str", "min_length": 4, "max_length": 2}),
        json!({"type": "str", "min_length": -1}),
        json!({"type": "path", "is_dir": true, "is_file": true}),
        json!({"type": "path", "is_dir": true, "exists": false}),
        json!({"type": "int", "choices": [1, 2], "min": 0}),
        json!({"type": "choice"}),
    ];
    for raw in cases {
        assert!(
            matches!(field_err("value", raw.clone()), FieldError::ConflictingConstraint { .. }),
            "{}",
            raw
        );
    }
}

#[test]
fn test_type_mismatches() {
    let cases = [
        json!({"type": "int", "default": "abc"}),
        json!({"type": "int", "default": 1.5}),
        json!({"type": "bool", "default": "yes"}),
        json!({"type": "bool", "choices": [true, false]}),
        json!({"choices": ["a", 1]}),
        json!({"type": "int", "choices": [1, 2], "default": "1"}),
        json!({"type": "int", "min": 0.5}),
        json!({"prompt": 3}),
    ];
    for raw in cases {
        assert!(
            matches!(field_err("value", raw.clone()), FieldError::TypeMismatch { .. }),
            "{}",
            raw
        );
    }
}

#[test]
fn test_empty_choices() {
    assert_eq!(field_err("license", json!([])), FieldError::EmptyChoices { key: "license".to_string() });
    assert_eq!(
        field_err("license", json!({"choices": []})),
        FieldError::EmptyChoices { key: "license".to_string() }
    );
}

#[test]
fn test_error_carries_key() {
    assert_eq!(field_err("workers", json!({"type": "int", "default": "x"})).key(), "workers");
}

#[test]
fn test_coerce_input() {
    let integer = FieldKind::Number { number: NumberKind::Integer, min: None, max: None };
    assert_eq!(integer.coerce("42"), Ok(json!(42)));
    assert_eq!(integer.coerce("4.2"), Err("Input must be an integer.".to_string()));

    let real = FieldKind::Number { number: NumberKind::Real, min: None, max: None };
    assert_eq!(real.coerce("4.5"), Ok(json!(4.5)));
    assert_eq!(real.coerce("four"), Err("Input must be a number.".to_string()));

    assert_eq!(FieldKind::Boolean.coerce("Yes"), Ok(json!(true)));
    assert_eq!(FieldKind::Boolean.coerce("F"), Ok(json!(false)));
    assert_eq!(FieldKind::Boolean.coerce("maybe"), Err("Input must be yes or no.".to_string()));

    let tags = FieldKind::MultiSelect {
        element: ElementKind::String,
        options: vec![json!("a"), json!("b")],
    };
    assert_eq!(tags.coerce("a, b"), Ok(json!(["a", "b"])));
}

#[test]
fn test_check_value() {
    let name = FieldKind::String { min_length: Some(3), max_length: Some(5) };
    assert_eq!(name.check(&json!("ab")), Err("Input must be at least 3 characters long.".to_string()));
    assert_eq!(name.check(&json!("abcdef")), Err("Input must be at most 5 characters long.".to_string()));
    assert!(name.check(&json!("abcd")).is_ok());

    let workers = FieldKind::Number { number: NumberKind::Integer, min: Some(1.0), max: Some(10.0) };
    assert_eq!(workers.check(&json!(11)), Err("Input must be at most 10.".to_string()));
    assert_eq!(workers.check(&json!(0)), Err("Input must be at least 1.".to_string()));
    assert!(workers.check(&Value::Null).is_ok());

    let license = FieldKind::Choice {
        element: ElementKind::String,
        options: vec![json!("MIT"), json!("BSD")],
    };
    assert_eq!(
        license.check(&json!("GPL")),
        Err("Input must be one of the following choices: MIT, BSD.".to_string())
    );
}

#[test]
fn test_check_path() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap().to_string();
    let missing = temp_dir.path().join("missing").to_str().unwrap().to_string();

    assert!(FieldKind::Path { check: PathCheck::Dir }.check(&json!(dir)).is_ok());
    assert!(FieldKind::Path { check: PathCheck::File }.check(&json!(dir)).is_err());
    assert!(FieldKind::Path { check: PathCheck::Exists }.check(&json!(missing)).is_err());
    assert!(FieldKind::Path { check: PathCheck::Any }.check(&json!(missing)).is_ok());
}
