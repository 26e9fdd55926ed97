//! Plugin contract.
//! A plugin observes or rewrites the stages of a run through the hooks of
//! the `Plugin` trait. Every hook has a no-op default, so a plugin only
//! implements the stages it cares about.

mod registry;
mod script;

pub use registry::{discover_scripts, PluginFactory, PluginRegistry};
pub use script::ScriptPlugin;

use std::path::Path;

use serde_json::Value;

use crate::config::Config;
use crate::error::Result;
use crate::meta::MetaField;
use crate::path::TempPath;
use crate::renderer::{metadata_context, Metadata, TemplateRenderer};

/// Read-only view of a run handed to every hook.
#[derive(Clone, Copy)]
pub struct PluginContext<'a> {
    pub config: &'a Config,
    pub renderer: &'a dyn TemplateRenderer,
    /// Metadata resolved so far
    pub metadata: &'a Metadata,
    pub template_dir: &'a Path,
    pub output_dir: &'a Path,
}

impl PluginContext<'_> {
    /// Renders `template` against the metadata resolved so far.
    pub fn render(&self, template: &str) -> Result<String> {
        self.renderer.render(template, &metadata_context(self.metadata))
    }
}

pub trait Plugin {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    /// Called once, right after the plugin is instantiated.
    fn on_load(&mut self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returning `true` skips the field: it is neither prompted nor stored.
    fn pre_prompt(&mut self, _ctx: &PluginContext, _field: &MetaField) -> anyhow::Result<bool> {
        Ok(false)
    }

    /// Returning `true` keeps the resolved value out of the metadata.
    fn post_prompt(
        &mut self,
        _ctx: &PluginContext,
        _field: &MetaField,
        _value: &Value,
    ) -> anyhow::Result<bool> {
        Ok(false)
    }

    fn initialize(&mut self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returning `Some` replaces the list of entries to create.
    fn on_paths(
        &mut self,
        _ctx: &PluginContext,
        _paths: &[TempPath],
    ) -> anyhow::Result<Option<Vec<TempPath>>> {
        Ok(None)
    }

    fn pre_create(&mut self, _ctx: &PluginContext, _path: &TempPath) -> anyhow::Result<()> {
        Ok(())
    }

    /// Returning `Some` replaces the text about to be written to `path`.
    fn on_render(
        &mut self,
        _ctx: &PluginContext,
        _path: &TempPath,
        _content: &str,
    ) -> anyhow::Result<Option<String>> {
        Ok(None)
    }

    fn post_create(&mut self, _ctx: &PluginContext, _path: &TempPath) -> anyhow::Result<()> {
        Ok(())
    }

    fn finalize(&mut self, _ctx: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
}
