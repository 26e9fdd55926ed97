//! Plugin hook stages and the chains that run them.
//! Every stage runs across the loaded plugins in load order; the first
//! failing plugin aborts the run with `Error::PluginError`.

use std::fmt;
use std::str::FromStr;

use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::meta::MetaField;
use crate::path::TempPath;
use crate::plugin::{Plugin, PluginContext};
use crate::prompt::Prompter;

/// Extension points of a run, in invocation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    OnLoad,
    PrePrompt,
    PostPrompt,
    Initialize,
    OnPaths,
    PreCreate,
    OnRender,
    PostCreate,
    Finalize,
}

impl Stage {
    pub const ALL: [Stage; 9] = [
        Stage::OnLoad,
        Stage::PrePrompt,
        Stage::PostPrompt,
        Stage::Initialize,
        Stage::OnPaths,
        Stage::PreCreate,
        Stage::OnRender,
        Stage::PostCreate,
        Stage::Finalize,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::OnLoad => "on_load",
            Stage::PrePrompt => "pre_prompt",
            Stage::PostPrompt => "post_prompt",
            Stage::Initialize => "initialize",
            Stage::OnPaths => "on_paths",
            Stage::PreCreate => "pre_create",
            Stage::OnRender => "on_render",
            Stage::PostCreate => "post_create",
            Stage::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or_else(|| format!("unknown hook stage '{}'", s))
    }
}

/// Asks whether plugin scripts shipped with a template may run.
///
/// # Arguments
/// * `prompter` - Source of the answer
/// * `skip_plugins_check` - Answer yes without asking
pub fn confirm_plugin_execution(
    prompter: &mut dyn Prompter,
    skip_plugins_check: bool,
) -> Result<bool> {
    if skip_plugins_check {
        return Ok(true);
    }
    Ok(prompter.confirm(
        "WARNING: This template contains plugins that will execute commands on your system. Do you want to run them?",
        false,
    )?)
}

fn failure(plugin: &dyn Plugin, stage: Stage, source: anyhow::Error) -> Error {
    Error::PluginError { plugin: plugin.name().to_string(), stage, source }
}

/// Loaded plugin instances, in load order.
#[derive(Default)]
pub struct Plugins {
    plugins: Vec<Box<dyn Plugin>>,
}

impl Plugins {
    pub fn new(plugins: Vec<Box<dyn Plugin>>) -> Self {
        Self { plugins }
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(|plugin| plugin.name()).collect()
    }

    pub fn on_load(&mut self, ctx: &PluginContext) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.on_load(ctx).map_err(|e| failure(plugin.as_ref(), Stage::OnLoad, e))?;
        }
        Ok(())
    }

    /// Returns `true` as soon as one plugin asks to skip the field.
    pub fn pre_prompt(&mut self, ctx: &PluginContext, field: &MetaField) -> Result<bool> {
        for plugin in self.plugins.iter_mut() {
            let skip = plugin
                .pre_prompt(ctx, field)
                .map_err(|e| failure(plugin.as_ref(), Stage::PrePrompt, e))?;
            if skip {
                debug!("Plugin '{}' skipped field '{}'", plugin.name(), field.key());
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Returns `true` as soon as one plugin intercepts the value.
    pub fn post_prompt(&mut self, ctx: &PluginContext, field: &MetaField, value: &Value) -> Result<bool> {
        for plugin in self.plugins.iter_mut() {
            let intercepted = plugin
                .post_prompt(ctx, field, value)
                .map_err(|e| failure(plugin.as_ref(), Stage::PostPrompt, e))?;
            if intercepted {
                debug!("Plugin '{}' intercepted value of '{}'", plugin.name(), field.key());
                return Ok(true);
            }
        }
        Ok(false)
    }

    pub fn initialize(&mut self, ctx: &PluginContext) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.initialize(ctx).map_err(|e| failure(plugin.as_ref(), Stage::Initialize, e))?;
        }
        Ok(())
    }

    /// Threads the path list through every plugin; a replacement is seen by
    /// the plugins that follow.
    pub fn on_paths(&mut self, ctx: &PluginContext, mut paths: Vec<TempPath>) -> Result<Vec<TempPath>> {
        for plugin in self.plugins.iter_mut() {
            let replaced = plugin
                .on_paths(ctx, &paths)
                .map_err(|e| failure(plugin.as_ref(), Stage::OnPaths, e))?;
            if let Some(replaced) = replaced {
                debug!("Plugin '{}' replaced the path list ({} entries)", plugin.name(), replaced.len());
                paths = replaced;
            }
        }
        Ok(paths)
    }

    pub fn pre_create(&mut self, ctx: &PluginContext, path: &TempPath) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.pre_create(ctx, path).map_err(|e| failure(plugin.as_ref(), Stage::PreCreate, e))?;
        }
        Ok(())
    }

    /// Threads file content through every plugin.
    pub fn on_render(&mut self, ctx: &PluginContext, path: &TempPath, mut content: String) -> Result<String> {
        for plugin in self.plugins.iter_mut() {
            let replaced = plugin
                .on_render(ctx, path, &content)
                .map_err(|e| failure(plugin.as_ref(), Stage::OnRender, e))?;
            if let Some(replaced) = replaced {
                content = replaced;
            }
        }
        Ok(content)
    }

    pub fn post_create(&mut self, ctx: &PluginContext, path: &TempPath) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.post_create(ctx, path).map_err(|e| failure(plugin.as_ref(), Stage::PostCreate, e))?;
        }
        Ok(())
    }

    pub fn finalize(&mut self, ctx: &PluginContext) -> Result<()> {
        for plugin in self.plugins.iter_mut() {
            plugin.finalize(ctx).map_err(|e| failure(plugin.as_ref(), Stage::Finalize, e))?;
        }
        Ok(())
    }
}
