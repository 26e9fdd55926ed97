//! Error handling for kiln.
//! Defines the error taxonomy shared by configuration loading, field
//! validation, prompting, rendering and plugin execution.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::hooks::Stage;

/// Custom error types for kiln operations.
///
/// Configuration, field and preset errors are raised before the output
/// directory is touched. Errors raised while rendering abort the run and leave
/// already-written entries on disk.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur during file system operations
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    #[error("No configuration file found in '{template_dir}' (tried: {tried}).")]
    ConfigNotFoundError { template_dir: String, tried: String },

    #[error("Failed to parse {format} configuration: {reason}.")]
    ConfigParseError { format: String, reason: String },

    /// Inconsistent configuration that parsed successfully
    #[error("Configuration error: {0}.")]
    ConfigError(String),

    #[error(transparent)]
    FieldError(#[from] FieldError),

    #[error("Template source directory '{source_dir}' not found.")]
    SourceDirNotFoundError { source_dir: String },

    #[error("Template '{template_dir}' does not exist.")]
    TemplateDoesNotExistError { template_dir: String },

    #[error("Preset data error: {0}.")]
    PresetDataError(String),

    /// Input was closed or interrupted while a field was being prompted
    #[error("Prompt for '{key}' aborted: {source}.")]
    PromptAbortedError {
        key: String,
        #[source]
        source: io::Error,
    },

    #[error("Error in template \"{template}\": {source}")]
    TemplateStringError {
        template: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("Error in template file '{}': {source}", path.display())]
    TemplateFileError {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },

    #[error("Path '{}' already exists.", path.display())]
    PathConflictError { path: PathBuf },

    #[error("Invalid output path '{}': {reason}.", path.display())]
    InvalidPathError { path: PathBuf, reason: String },

    /// The creation order was violated; this is a defect, not a user error
    #[error(
        "Parent directory '{}' of '{}' does not exist; entries were not created in order.",
        parent.display(),
        path.display()
    )]
    ParentMissingError { path: PathBuf, parent: PathBuf },

    #[error("Error in plugin '{plugin}' during stage '{stage}': {source:#}")]
    PluginError {
        plugin: String,
        stage: Stage,
        #[source]
        source: anyhow::Error,
    },

    #[error("Git error: {0}.")]
    GitError(#[from] git2::Error),
}

/// Errors raised while building a `MetaField` from its configuration entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Invalid field key '{key}': keys must be identifiers and not reserved words.")]
    InvalidFieldKey { key: String },

    #[error("Unknown option '{option}' for field '{key}'.")]
    UnknownFieldOption { key: String, option: String },

    #[error("Unsupported type '{type_name}' for field '{key}'.")]
    UnsupportedType { key: String, type_name: String },

    #[error("Conflicting constraints for field '{key}': {reason}.")]
    ConflictingConstraint { key: String, reason: String },

    #[error("Type mismatch for field '{key}': {reason}.")]
    TypeMismatch { key: String, reason: String },

    #[error("Field '{key}' declares an empty list of choices.")]
    EmptyChoices { key: String },
}

impl FieldError {
    /// The configuration key the error refers to.
    pub fn key(&self) -> &str {
        match self {
            FieldError::InvalidFieldKey { key }
            | FieldError::UnknownFieldOption { key, .. }
            | FieldError::UnsupportedType { key, .. }
            | FieldError::ConflictingConstraint { key, .. }
            | FieldError::TypeMismatch { key, .. }
            | FieldError::EmptyChoices { key } => key,
        }
    }
}

/// Convenience type alias for Results with kiln's Error as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("{}", err);
    std::process::exit(1);
}
