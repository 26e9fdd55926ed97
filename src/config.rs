//! Configuration handling for kiln templates.
//! This module locates the configuration file of a template directory
//! (kiln.json, kiln.yaml, kiln.yml, kiln.toml or their dotted variants),
//! parses it and validates the declared metadata fields.

use crate::constants::{CONFIG_FILES, DEFAULT_PLUGIN_DIR, DEFAULT_SOURCE_DIR};
use crate::error::{Error, Result};
use crate::meta::MetaField;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Settings of the templating engine.
///
/// The default delimiters (`[[ ]]`, `[% %]`, `[# #]`) keep templates readable
/// inside files that use curly braces themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub block_start: String,
    pub block_end: String,
    pub variable_start: String,
    pub variable_end: String,
    pub comment_start: String,
    pub comment_end: String,
    pub line_statement_prefix: Option<String>,
    pub line_comment_prefix: Option<String>,
    pub trim_blocks: bool,
    pub lstrip_blocks: bool,
    pub keep_trailing_newline: bool,
    pub newline_sequence: String,
    pub autoescape: bool,
    /// Fail on undefined variables instead of rendering them as empty
    pub strict_undefined: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            block_start: "[%".to_string(),
            block_end: "%]".to_string(),
            variable_start: "[[".to_string(),
            variable_end: "]]".to_string(),
            comment_start: "[#".to_string(),
            comment_end: "#]".to_string(),
            line_statement_prefix: None,
            line_comment_prefix: None,
            trim_blocks: true,
            lstrip_blocks: true,
            keep_trailing_newline: true,
            newline_sequence: "\n".to_string(),
            autoescape: false,
            strict_undefined: true,
        }
    }
}

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Json,
    Yaml,
    Toml,
}

impl ConfigFormat {
    /// Picks the format from a configuration file name.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Self> {
        match path.as_ref().extension()?.to_str()? {
            "json" => Some(Self::Json),
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigFormat::Json => write!(f, "JSON"),
            ConfigFormat::Yaml => write!(f, "YAML"),
            ConfigFormat::Toml => write!(f, "TOML"),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    name: String,
    #[serde(default)]
    authors: Vec<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_source_dir")]
    source_dir: PathBuf,
    #[serde(default = "default_plugin_dir")]
    plugin_dir: PathBuf,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default, alias = "jinja")]
    engine: EngineConfig,
    #[serde(default)]
    meta: IndexMap<String, serde_json::Value>,
}

fn default_source_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SOURCE_DIR)
}

fn default_plugin_dir() -> PathBuf {
    PathBuf::from(DEFAULT_PLUGIN_DIR)
}

/// Validated template configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Display name of the template
    pub name: String,
    pub authors: Vec<String>,
    pub description: Option<String>,
    /// Source tree, relative to the template directory
    pub source_dir: PathBuf,
    /// Plugin scripts, relative to the template directory
    pub plugin_dir: PathBuf,
    /// Extra glob patterns excluded from the source tree
    pub ignore: Vec<String>,
    pub engine: EngineConfig,
    /// Metadata fields in declaration order
    pub fields: Vec<MetaField>,
}

impl Config {
    pub fn source_root<P: AsRef<Path>>(&self, template_dir: P) -> PathBuf {
        template_dir.as_ref().join(&self.source_dir)
    }

    pub fn plugin_root<P: AsRef<Path>>(&self, template_dir: P) -> PathBuf {
        template_dir.as_ref().join(&self.plugin_dir)
    }
}

/// Finds the configuration file of a template directory.
///
/// # Arguments
/// * `template_dir` - Directory containing the template configuration
///
/// # Returns
/// * `Result<PathBuf>` - The first configuration file found, in `CONFIG_FILES` order
///
/// # Errors
/// * `Error::ConfigNotFoundError` if no candidate exists
pub fn find_config_file<P: AsRef<Path>>(template_dir: P) -> Result<PathBuf> {
    let template_dir = template_dir.as_ref();
    for file in CONFIG_FILES {
        let config_path = template_dir.join(file);
        if config_path.is_file() {
            return Ok(config_path);
        }
    }

    Err(Error::ConfigNotFoundError {
        template_dir: template_dir.display().to_string(),
        tried: CONFIG_FILES.join(", "),
    })
}

/// Loads and validates the configuration of a template directory.
pub fn get_config<P: AsRef<Path>>(template_dir: P) -> Result<Config> {
    let config_path = find_config_file(template_dir)?;
    debug!("Loading configuration from {}", config_path.display());

    let format = ConfigFormat::from_path(&config_path).ok_or_else(|| {
        Error::ConfigError(format!("unsupported configuration file '{}'", config_path.display()))
    })?;
    let content = std::fs::read_to_string(&config_path)?;
    parse_config(&content, format)
}

/// Parses configuration content and validates every declaration in it.
///
/// # Errors
/// * `Error::ConfigParseError` if the content does not match the configuration layout
/// * `Error::ConfigError` if values are inconsistent
/// * `Error::FieldError` for the first invalid metadata field
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<Config> {
    let parse_error = |reason: String| Error::ConfigParseError { format: format.to_string(), reason };
    let raw: RawConfig = match format {
        ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
        ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_error(e.to_string()))?,
    };

    if raw.name.trim().is_empty() {
        return Err(Error::ConfigError("`name` cannot be empty".to_string()));
    }
    check_relative("source_dir", &raw.source_dir)?;
    check_relative("plugin_dir", &raw.plugin_dir)?;
    check_engine(&raw.engine)?;

    let fields = raw
        .meta
        .iter()
        .map(|(key, value)| MetaField::from_raw(key, value))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    debug!("Loaded {} metadata field(s) for template '{}'", fields.len(), raw.name);

    Ok(Config {
        name: raw.name,
        authors: raw.authors,
        description: raw.description,
        source_dir: raw.source_dir,
        plugin_dir: raw.plugin_dir,
        ignore: raw.ignore,
        engine: raw.engine,
        fields,
    })
}

fn check_relative(option: &str, path: &Path) -> Result<()> {
    let escapes = path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
    if path.as_os_str().is_empty() || escapes {
        return Err(Error::ConfigError(format!(
            "`{}` must be a relative path inside the template, got '{}'",
            option,
            path.display()
        )));
    }
    Ok(())
}

fn check_engine(engine: &EngineConfig) -> Result<()> {
    let delimiters = [
        &engine.block_start,
        &engine.block_end,
        &engine.variable_start,
        &engine.variable_end,
        &engine.comment_start,
        &engine.comment_end,
    ];
    if delimiters.iter().any(|delimiter| delimiter.is_empty()) {
        return Err(Error::ConfigError("template delimiters cannot be empty".to_string()));
    }
    if !matches!(engine.newline_sequence.as_str(), "\n" | "\r\n" | "\r") {
        return Err(Error::ConfigError(format!(
            "`newline_sequence` must be \\n, \\r\\n or \\r, got {:?}",
            engine.newline_sequence
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_relative() {
        assert!(check_relative("source_dir", Path::new("src")).is_ok());
        assert!(check_relative("source_dir", Path::new("./template/src")).is_ok());
        assert!(check_relative("source_dir", Path::new("../src")).is_err());
        assert!(check_relative("source_dir", Path::new("/src")).is_err());
        assert!(check_relative("source_dir", Path::new("")).is_err());
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(ConfigFormat::from_path("kiln.json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_path(".kiln.yml"), Some(ConfigFormat::Yaml));
        assert_eq!(ConfigFormat::from_path("kiln.toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_path("kiln.ini"), None);
    }
}
