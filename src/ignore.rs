//! Ignore patterns for template source trees.
//! Patterns are globs matched against source-relative paths, before any
//! rendering takes place.

use crate::constants::DEFAULT_IGNORE_PATTERNS;
use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use log::debug;

/// Builds the set of ignored paths from the default patterns and `patterns`.
///
/// # Arguments
/// * `patterns` - Additional glob patterns, usually the `ignore` list of the configuration
///
/// # Errors
/// * `Error::ConfigError` if a pattern is not a valid glob
///
/// # Example
/// ```ignore
/// # kiln.yaml
/// ignore:
///   - "**/*.pyc"
///   - "**/__pycache__"
/// ```
pub fn build_ignore_set<S: AsRef<str>>(patterns: &[S]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    let patterns = DEFAULT_IGNORE_PATTERNS
        .iter()
        .copied()
        .chain(patterns.iter().map(|pattern| pattern.as_ref()));
    for pattern in patterns {
        debug!("Adding ignore pattern '{}'", pattern);
        builder.add(Glob::new(pattern).map_err(|e| {
            Error::ConfigError(format!("invalid ignore pattern '{}': {}", pattern, e))
        })?);
    }

    builder
        .build()
        .map_err(|e| Error::ConfigError(format!("failed to build ignore patterns: {}", e)))
}
