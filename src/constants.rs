//! Common constants used throughout kiln.

/// Supported configuration file names, in lookup order
pub const CONFIG_FILES: [&str; 8] = [
    "kiln.json",
    ".kiln.json",
    "kiln.yaml",
    ".kiln.yaml",
    "kiln.yml",
    ".kiln.yml",
    "kiln.toml",
    ".kiln.toml",
];

/// Source tree location, relative to the template directory
pub const DEFAULT_SOURCE_DIR: &str = "src";

/// Plugin scripts location, relative to the template directory
pub const DEFAULT_PLUGIN_DIR: &str = "plugins";

/// Patterns that are never copied from a template source tree
pub const DEFAULT_IGNORE_PATTERNS: [&str; 2] = ["**/.DS_Store", "**/.git"];

/// Words that cannot be used as metadata keys because templates could not
/// reference them as plain variables.
pub const RESERVED_WORDS: &[&str] = &[
    "and", "as", "block", "call", "elif", "else", "endautoescape", "endblock", "endcall",
    "endfilter", "endfor", "endif", "endmacro", "endraw", "endset", "endwith", "extends",
    "false", "False", "filter", "for", "from", "if", "import", "in", "include", "is",
    "loop", "macro", "none", "None", "not", "or", "raw", "recursive", "self", "set", "super",
    "true", "True", "with", "autoescape", "continue", "break",
];
