//! Run lifecycle.
//! The `Executor` owns everything a run touches: the configuration, the
//! renderer, the metadata mapping and the loaded plugins. Plugins only see
//! them through `PluginContext`.

use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use log::{debug, info};
use serde_json::{Map, Value};

use crate::config::{get_config, Config};
use crate::error::{Error, Result};
use crate::hooks::Plugins;
use crate::ignore::build_ignore_set;
use crate::plugin::{PluginContext, PluginRegistry};
use crate::preset::validate_preset;
use crate::processor::{order_paths, Processor};
use crate::prompt::{resolve_field, Prompter};
use crate::renderer::{metadata_context, Metadata, MiniJinjaRenderer};

pub struct Executor {
    config: Config,
    template_dir: PathBuf,
    output_dir: PathBuf,
    renderer: MiniJinjaRenderer,
    /// Default and configured ignore patterns
    ignored: GlobSet,
    metadata: Metadata,
    plugins: Plugins,
}

/// Builds a `PluginContext` from individual fields so that the plugin list
/// can be borrowed mutably at the same time.
macro_rules! plugin_context {
    ($executor:ident) => {
        PluginContext {
            config: &$executor.config,
            renderer: &$executor.renderer,
            metadata: &$executor.metadata,
            template_dir: &$executor.template_dir,
            output_dir: &$executor.output_dir,
        }
    };
}

impl Executor {
    /// Loads the configuration of `template_dir`.
    ///
    /// # Errors
    /// * Configuration and field errors of `get_config`
    /// * `Error::SourceDirNotFoundError` if the source directory is missing
    /// * `Error::ConfigError` for invalid delimiters or ignore patterns
    pub fn new<T: AsRef<Path>, O: AsRef<Path>>(template_dir: T, output_dir: O) -> Result<Self> {
        let template_dir = template_dir.as_ref().to_path_buf();
        let config = get_config(&template_dir)?;

        let source_root = config.source_root(&template_dir);
        if !source_root.is_dir() {
            return Err(Error::SourceDirNotFoundError {
                source_dir: source_root.display().to_string(),
            });
        }
        let renderer = MiniJinjaRenderer::new(&config.engine)?;
        let ignored = build_ignore_set(&config.ignore)?;

        Ok(Self {
            config,
            template_dir,
            output_dir: output_dir.as_ref().to_path_buf(),
            renderer,
            ignored,
            metadata: Metadata::new(),
            plugins: Plugins::default(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn plugins(&self) -> &Plugins {
        &self.plugins
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn plugin_dir(&self) -> PathBuf {
        self.config.plugin_root(&self.template_dir)
    }

    /// Checks preset data against the declared fields.
    pub fn check_preset(&self, preset: &Value) -> Result<Map<String, Value>> {
        validate_preset(&self.config.fields, preset)
    }

    /// Instantiates every registered plugin and runs `on_load`.
    pub fn load_plugins(&mut self, registry: &PluginRegistry) -> Result<()> {
        self.plugins = Plugins::new(registry.instantiate());
        debug!("Loaded plugins: {:?}", self.plugins.names());
        let ctx = plugin_context!(self);
        self.plugins.on_load(&ctx)
    }

    /// Resolves every field in declaration order.
    ///
    /// A field skipped by `pre_prompt` or intercepted by `post_prompt` is left
    /// out of the metadata.
    pub fn prompt(
        &mut self,
        prompter: &mut dyn Prompter,
        preset: Option<&Map<String, Value>>,
    ) -> Result<()> {
        for field in &self.config.fields {
            let ctx = plugin_context!(self);
            if self.plugins.pre_prompt(&ctx, field)? {
                continue;
            }
            let value = resolve_field(field, &self.renderer, &self.metadata, preset, prompter)?;
            if self.plugins.post_prompt(&ctx, field, &value)? {
                continue;
            }
            debug!("Resolved '{}' = {}", field.key(), value);
            self.metadata.insert(field.key().to_string(), value);
        }
        Ok(())
    }

    /// Renders the source tree into the output directory.
    ///
    /// # Returns
    /// * `Result<Vec<PathBuf>>` - Written paths, in creation order
    pub fn render(&mut self) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(&self.output_dir)?;

        let source_root = self.config.source_root(&self.template_dir);
        let plugin_root = self.config.plugin_root(&self.template_dir);
        let context = metadata_context(&self.metadata);
        let ctx = plugin_context!(self);
        let processor =
            Processor::new(&self.renderer, &source_root, &self.output_dir, &context, &self.ignored)
                .exclude(&plugin_root);

        self.plugins.initialize(&ctx)?;
        let paths = processor.collect()?;
        let mut paths = self.plugins.on_paths(&ctx, paths)?;
        order_paths(&mut paths)?;

        let plugins = &mut self.plugins;
        let mut written = Vec::with_capacity(paths.len());
        for temp in &paths {
            plugins.pre_create(&ctx, temp)?;
            let target =
                processor.materialize(temp, |temp, text| plugins.on_render(&ctx, temp, text))?;
            plugins.post_create(&ctx, temp)?;
            written.push(target);
        }

        plugins.finalize(&ctx)?;
        info!("Created {} entries in '{}'", written.len(), self.output_dir.display());
        Ok(written)
    }
}

/// Runs a template from start to finish.
///
/// # Arguments
/// * `template_dir` - Directory holding the template configuration
/// * `output_dir` - Directory the project is generated into
/// * `preset` - Answers used in place of prompting for the keys they contain
/// * `prompter` - Source of answers for everything else
/// * `registry` - Plugins of the run; scripts of the template plugin directory are added to it
///
/// # Errors
/// * `Error::PresetDataError` before anything runs if `preset` does not fit the fields
pub fn run<T: AsRef<Path>, O: AsRef<Path>>(
    template_dir: T,
    output_dir: O,
    preset: Option<&Value>,
    prompter: &mut dyn Prompter,
    mut registry: PluginRegistry,
) -> Result<Vec<PathBuf>> {
    let mut executor = Executor::new(template_dir, output_dir)?;
    let preset = preset.map(|preset| executor.check_preset(preset)).transpose()?;

    registry.discover(executor.plugin_dir())?;
    executor.load_plugins(&registry)?;
    executor.prompt(prompter, preset.as_ref())?;
    executor.render()
}
