//! Plugins implemented as executables.
//! A script is run once per enabled hook as `<script> <stage>`. The request
//! is written to its stdin as JSON and the reply is read from its stdout.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{Plugin, PluginContext};
use crate::hooks::Stage;
use crate::meta::MetaField;
use crate::path::{Content, Node, Origin, TempPath};

/// Entry of the path list as exchanged with scripts.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathEntry {
    pub path: PathBuf,
    pub is_dir: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Raw bytes of binary content
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<Vec<u8>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<u32>,
}

impl From<&TempPath> for PathEntry {
    fn from(temp: &TempPath) -> Self {
        let mut entry = PathEntry {
            path: temp.rendered().to_path_buf(),
            is_dir: temp.is_dir(),
            ..Default::default()
        };
        match temp.origin() {
            Origin::Source { path, mode, .. } => {
                entry.source = Some(path.clone());
                entry.mode = *mode;
            }
            Origin::Virtual(node) => {
                entry.mode = node.mode();
                match node {
                    Node::File { content: Content::Text(text), .. } => {
                        entry.content = Some(text.clone())
                    }
                    Node::File { content: Content::Binary(bytes), .. } => {
                        entry.bytes = Some(bytes.clone())
                    }
                    Node::Dir { .. } => {}
                }
            }
        }
        entry
    }
}

impl From<PathEntry> for TempPath {
    fn from(entry: PathEntry) -> Self {
        match (entry.source, entry.is_dir) {
            (Some(source), is_dir) => {
                TempPath::from_source(entry.path, source, is_dir).with_mode(entry.mode)
            }
            (None, true) => TempPath::virtual_dir(entry.path, entry.mode),
            (None, false) => {
                let content = match (entry.bytes, entry.content) {
                    (Some(bytes), _) => Content::Binary(bytes),
                    (None, text) => Content::Text(text.unwrap_or_default()),
                };
                TempPath::virtual_file(entry.path, content, entry.mode)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct LoadReply {
    hooks: Option<Vec<Stage>>,
}

/// Plugin backed by an executable file.
pub struct ScriptPlugin {
    name: String,
    script: PathBuf,
    /// Stages the script asked for; `None` means all of them
    hooks: Option<Vec<Stage>>,
}

impl ScriptPlugin {
    pub fn new<P: AsRef<Path>>(script: P) -> Self {
        let script = script.as_ref().to_path_buf();
        let name = script
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| script.display().to_string());
        Self { name, script, hooks: None }
    }

    fn enabled(&self, stage: Stage) -> bool {
        self.hooks.as_ref().map_or(true, |hooks| hooks.contains(&stage))
    }

    /// Runs the script for `stage` and returns its parsed reply.
    /// Disabled stages and empty replies yield `Value::Null`.
    fn call(&self, ctx: &PluginContext, stage: Stage, payload: Value) -> anyhow::Result<Value> {
        if stage != Stage::OnLoad && !self.enabled(stage) {
            return Ok(Value::Null);
        }

        let mut request = json!({
            "stage": stage,
            "template": {
                "name": ctx.config.name,
                "authors": ctx.config.authors,
                "description": ctx.config.description,
            },
            "metadata": ctx.metadata,
            "template_dir": ctx.template_dir,
            "output_dir": ctx.output_dir,
        });
        if let (Some(request), Value::Object(payload)) = (request.as_object_mut(), payload) {
            request.extend(payload);
        }

        debug!("Running plugin script '{}' for stage '{}'", self.script.display(), stage);
        let mut child = Command::new(&self.script)
            .arg(stage.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start '{}'", self.script.display()))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(request.to_string().as_bytes()).context("failed to write request")?;
        }

        let output = child.wait_with_output().context("failed to wait for script")?;
        if !output.status.success() {
            bail!("script exited with {}", output.status);
        }

        let reply = String::from_utf8(output.stdout).context("reply is not valid UTF-8")?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(reply).context("reply is not valid JSON")
    }

    fn call_flag(&self, ctx: &PluginContext, stage: Stage, payload: Value) -> anyhow::Result<bool> {
        match self.call(ctx, stage, payload)? {
            Value::Null => Ok(false),
            Value::Bool(flag) => Ok(flag),
            other => bail!("expected a boolean reply, got {}", other),
        }
    }

    fn notify(&self, ctx: &PluginContext, stage: Stage, payload: Value) -> anyhow::Result<()> {
        self.call(ctx, stage, payload).map(|_| ())
    }
}

impl Plugin for ScriptPlugin {
    fn name(&self) -> &str {
        &self.name
    }

    fn on_load(&mut self, ctx: &PluginContext) -> anyhow::Result<()> {
        let reply = self.call(ctx, Stage::OnLoad, Value::Null)?;
        if !reply.is_null() {
            let reply: LoadReply =
                serde_json::from_value(reply).context("invalid on_load reply")?;
            self.hooks = reply.hooks;
        }
        Ok(())
    }

    fn pre_prompt(&mut self, ctx: &PluginContext, field: &MetaField) -> anyhow::Result<bool> {
        self.call_flag(ctx, Stage::PrePrompt, json!({ "field": field }))
    }

    fn post_prompt(
        &mut self,
        ctx: &PluginContext,
        field: &MetaField,
        value: &Value,
    ) -> anyhow::Result<bool> {
        self.call_flag(ctx, Stage::PostPrompt, json!({ "field": field, "value": value }))
    }

    fn initialize(&mut self, ctx: &PluginContext) -> anyhow::Result<()> {
        self.notify(ctx, Stage::Initialize, Value::Null)
    }

    fn on_paths(
        &mut self,
        ctx: &PluginContext,
        paths: &[TempPath],
    ) -> anyhow::Result<Option<Vec<TempPath>>> {
        let entries: Vec<PathEntry> = paths.iter().map(PathEntry::from).collect();
        match self.call(ctx, Stage::OnPaths, json!({ "paths": entries }))? {
            Value::Null => Ok(None),
            reply => {
                let entries: Vec<PathEntry> =
                    serde_json::from_value(reply).context("invalid on_paths reply")?;
                Ok(Some(entries.into_iter().map(TempPath::from).collect()))
            }
        }
    }

    fn pre_create(&mut self, ctx: &PluginContext, path: &TempPath) -> anyhow::Result<()> {
        self.notify(ctx, Stage::PreCreate, json!({ "path": PathEntry::from(path) }))
    }

    fn on_render(
        &mut self,
        ctx: &PluginContext,
        path: &TempPath,
        content: &str,
    ) -> anyhow::Result<Option<String>> {
        let payload = json!({ "path": path.rendered(), "content": content });
        match self.call(ctx, Stage::OnRender, payload)? {
            Value::Null => Ok(None),
            Value::String(content) => Ok(Some(content)),
            other => bail!("expected a string reply, got {}", other),
        }
    }

    fn post_create(&mut self, ctx: &PluginContext, path: &TempPath) -> anyhow::Result<()> {
        self.notify(ctx, Stage::PostCreate, json!({ "path": PathEntry::from(path) }))
    }

    fn finalize(&mut self, ctx: &PluginContext) -> anyhow::Result<()> {
        self.notify(ctx, Stage::Finalize, Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_entry_conversion() {
        let temp = TempPath::virtual_file("notes.txt", Content::Text("hi".to_string()), Some(0o644));
        let entry = PathEntry::from(&temp);
        assert_eq!(entry.content.as_deref(), Some("hi"));
        assert_eq!(TempPath::from(entry), temp);

        let entry: PathEntry = serde_json::from_value(json!({"path": "docs", "is_dir": true})).unwrap();
        assert_eq!(TempPath::from(entry), TempPath::virtual_dir("docs", None));
    }

    #[test]
    fn test_source_entry_keeps_mode() {
        let entry: PathEntry = serde_json::from_value(
            json!({"path": "run.sh", "source": "/tmp/run.sh", "mode": 0o755}),
        )
        .unwrap();
        let temp = TempPath::from(entry);
        assert_eq!(temp.source(), Some(Path::new("/tmp/run.sh")));

        let entry = PathEntry::from(&temp);
        assert_eq!(entry.mode, Some(0o755));
        assert_eq!(entry.source, Some(PathBuf::from("/tmp/run.sh")));

        let temp = TempPath::from_source("lib.rs", "/tmp/lib.rs", false);
        assert_eq!(PathEntry::from(&temp).mode, None);
    }
}
