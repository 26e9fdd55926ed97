//! kiln is a template processing system for project scaffolding.
//! It collects typed metadata, renders a template tree against it and lets
//! plugins observe or rewrite every stage of a run.

/// Command-line interface module for the kiln application
pub mod cli;

/// Template configuration
/// Supports JSON, YAML and TOML formats (kiln.json, kiln.yaml, kiln.yml, kiln.toml)
pub mod config;

pub mod constants;

/// Error types and handling for the kiln application
pub mod error;

/// Run lifecycle: load plugins, prompt, render
pub mod executor;

/// Hook stages and plugin chains
pub mod hooks;

/// File and directory ignore patterns
pub mod ignore;

/// Local and git template acquisition
pub mod loader;

/// Metadata field descriptors
pub mod meta;

/// Planned output entries
pub mod path;

/// Plugin contract, registry and script plugins
pub mod plugin;

/// Pre-supplied answers
pub mod preset;

/// Source tree walk and materialization
pub mod processor;

/// User input and interaction handling
pub mod prompt;

/// Template string rendering
pub mod renderer;

pub use executor::{run, Executor};
