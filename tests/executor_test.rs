use std::fs;
use std::path::{Path, PathBuf};

use kiln::error::Error;
use kiln::executor::{run, Executor};
use kiln::path::{Content, TempPath};
use kiln::plugin::{Plugin, PluginContext, PluginRegistry};
use kiln::prompt::LinePrompter;
use serde_json::{json, Value};
use tempfile::TempDir;

const CONFIG: &str = r#"
name: demo-template
meta:
  project_name:
  version: "0.1.0"
  package_name: "[[ project_name | snake_case ]]"
"#;

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn template() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "kiln.yaml", CONFIG);
    write(dir.path(), "src/[[ package_name ]]/__init__.py", "__version__ = \"[[ version ]]\"\n");
    write(dir.path(), "src/README.md", "# [[ project_name ]]\n");
    write(dir.path(), "src/[% if false %]ci[% endif %]/build.yml", "");
    dir
}

fn silent() -> LinePrompter<&'static [u8], Vec<u8>> {
    LinePrompter::new("\n\n".as_bytes(), Vec::new())
}

struct Notes;

impl Plugin for Notes {
    fn name(&self) -> &str {
        "notes"
    }

    fn on_paths(&mut self, ctx: &PluginContext, paths: &[TempPath]) -> anyhow::Result<Option<Vec<TempPath>>> {
        let mut paths = paths.to_vec();
        let text = format!("[[ raw ]] for {}\n", ctx.render("[[ project_name ]]")?);
        paths.push(TempPath::virtual_file("notes.txt", Content::Text(text), None));
        Ok(Some(paths))
    }
}

#[test_log::test]
fn test_run_with_preset() {
    let template = template();
    let output = TempDir::new().unwrap();
    let expected = TempDir::new().unwrap();
    write(expected.path(), "demo/__init__.py", "__version__ = \"0.1.0\"\n");
    write(expected.path(), "README.md", "# demo\n");

    let preset = json!({"project_name": "demo"});
    let mut prompter = silent();
    let written =
        run(template.path(), output.path(), Some(&preset), &mut prompter, PluginRegistry::new()).unwrap();

    assert_eq!(
        written,
        vec![output.path().join("README.md"), output.path().join("demo"), output.path().join("demo/__init__.py")]
    );
    assert!(!dir_diff::is_different(output.path(), expected.path()).unwrap());
}

#[test]
fn test_metadata_follows_declaration_order() {
    let template = template();
    let output = TempDir::new().unwrap();
    let mut executor = Executor::new(template.path(), output.path()).unwrap();
    let preset = executor.check_preset(&json!({"project_name": "Acme Tools"})).unwrap();

    let mut prompter = silent();
    executor.prompt(&mut prompter, Some(&preset)).unwrap();

    let metadata: Vec<(&str, &Value)> =
        executor.metadata().iter().map(|(key, value)| (key.as_str(), value)).collect();
    assert_eq!(
        metadata,
        vec![
            ("project_name", &json!("Acme Tools")),
            ("version", &json!("0.1.0")),
            ("package_name", &json!("acme_tools")),
        ]
    );
    assert_eq!(
        String::from_utf8(prompter.into_inner().1).unwrap(),
        "Version [0.1.0]: Package Name [acme_tools]: "
    );
}

#[test]
fn test_same_answers_give_same_metadata() {
    let template = template();
    let resolve = || {
        let output = TempDir::new().unwrap();
        let mut executor = Executor::new(template.path(), output.path()).unwrap();
        let preset = executor.check_preset(&json!({"project_name": "demo", "version": "2.0.0"})).unwrap();
        executor.prompt(&mut silent(), Some(&preset)).unwrap();
        executor.metadata().clone()
    };
    assert_eq!(resolve(), resolve());
}

#[test]
fn test_plugin_adds_virtual_file() {
    let template = template();
    let output = TempDir::new().unwrap();
    let mut registry = PluginRegistry::new();
    registry.register("notes", || Box::new(Notes) as Box<dyn Plugin>);

    let preset = json!({"project_name": "demo"});
    let written = run(template.path(), output.path(), Some(&preset), &mut silent(), registry).unwrap();

    assert!(written.contains(&output.path().join("notes.txt")));
    assert_eq!(fs::read_to_string(output.path().join("notes.txt")).unwrap(), "[[ raw ]] for demo\n");
}

#[test]
fn test_existing_directory_stops_the_run() {
    let template = template();
    let output = TempDir::new().unwrap();
    write(output.path(), "demo/keep.txt", "keep");

    let preset = json!({"project_name": "demo"});
    let err = run(template.path(), output.path(), Some(&preset), &mut silent(), PluginRegistry::new())
        .unwrap_err();

    assert!(matches!(err, Error::PathConflictError { ref path } if *path == output.path().join("demo")));
    assert_eq!(fs::read_to_string(output.path().join("demo/keep.txt")).unwrap(), "keep");
    assert!(!output.path().join("demo/__init__.py").exists());
}

#[test]
fn test_invalid_preset_fails_before_output() {
    let template = template();
    let output = TempDir::new().unwrap();
    let target = output.path().join("project");

    let preset = json!({"project_name": 42});
    let err = run(template.path(), &target, Some(&preset), &mut silent(), PluginRegistry::new()).unwrap_err();
    assert!(matches!(err, Error::PresetDataError(_)));

    let err = run(template.path(), &target, Some(&json!([1])), &mut silent(), PluginRegistry::new())
        .unwrap_err();
    assert!(matches!(err, Error::PresetDataError(_)));
    assert!(!target.exists());
}

#[test]
fn test_invalid_ignore_pattern_fails_before_prompting() {
    let template = template();
    write(template.path(), "kiln.yaml", &format!("{}ignore: ['a[']\n", CONFIG));
    let output = TempDir::new().unwrap();
    let target = output.path().join("project");

    let mut prompter = silent();
    let err = run(template.path(), &target, None, &mut prompter, PluginRegistry::new()).unwrap_err();

    assert!(matches!(err, Error::ConfigError(ref message) if message.contains("a[")));
    assert!(!target.exists());
    assert!(prompter.output().is_empty());
}

#[test]
fn test_load_plugins() {
    let template = template();
    let output = TempDir::new().unwrap();
    let mut registry = PluginRegistry::new();
    registry.register("notes", || Box::new(Notes) as Box<dyn Plugin>);

    let mut executor = Executor::new(template.path(), output.path()).unwrap();
    assert!(executor.plugins().names().is_empty());
    executor.load_plugins(&registry).unwrap();
    assert_eq!(executor.plugins().names(), vec!["notes"]);
}

#[test]
fn test_missing_source_dir() {
    let template = TempDir::new().unwrap();
    write(template.path(), "kiln.yaml", "name: empty\nsource_dir: files\n");

    match Executor::new(template.path(), PathBuf::from("out")) {
        Err(Error::SourceDirNotFoundError { source_dir }) => {
            assert!(source_dir.ends_with("files"))
        }
        Err(other) => panic!("Expected SourceDirNotFoundError, got {:?}", other),
        Ok(_) => panic!("Expected SourceDirNotFoundError"),
    }
}

#[cfg(unix)]
#[test]
fn test_script_plugins_in_template() {
    use std::os::unix::fs::PermissionsExt;

    let template = template();
    write(
        template.path(),
        "plugins/stamp",
        "#!/bin/sh\ncat >/dev/null\ncase \"$1\" in\n  on_load) echo '{\"hooks\": [\"on_render\"]}' ;;\n  on_render) echo '\"stamped\"' ;;\nesac\n",
    );
    let script = template.path().join("plugins/stamp");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

    let output = TempDir::new().unwrap();
    let preset = json!({"project_name": "demo"});
    run(template.path(), output.path(), Some(&preset), &mut silent(), PluginRegistry::new()).unwrap();

    assert_eq!(fs::read_to_string(output.path().join("README.md")).unwrap(), "stamped");
    assert!(!output.path().join("plugins").exists());
}
