//! Planned output entries.
//! A `TempPath` pairs a destination-relative path with where its content comes
//! from: an entry of the template source tree that has not been read yet, or a
//! node synthesized in memory by a plugin.

use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Number of leading bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 8192;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    /// Classifies raw bytes: NUL bytes early in the data or invalid UTF-8 mean binary.
    pub fn sniff(bytes: Vec<u8>) -> Self {
        let head = &bytes[..bytes.len().min(SNIFF_LEN)];
        if head.contains(&0) {
            return Content::Binary(bytes);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Content::Text(text),
            Err(e) => Content::Binary(e.into_bytes()),
        }
    }
}

/// A materialized entry. Directories carry no content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Dir { mode: Option<u32> },
    File { content: Content, mode: Option<u32> },
}

impl Node {
    pub fn mode(&self) -> Option<u32> {
        match self {
            Node::Dir { mode } | Node::File { mode, .. } => *mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// Entry of the template source tree, read when resolved.
    /// `mode` overrides the permission bits of the source.
    Source { path: PathBuf, is_dir: bool, mode: Option<u32> },
    /// Entry synthesized in memory
    Virtual(Node),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TempPath {
    rendered: PathBuf,
    origin: Origin,
}

impl TempPath {
    /// An entry backed by `source`, written to `rendered`.
    pub fn from_source<P: Into<PathBuf>, S: Into<PathBuf>>(rendered: P, source: S, is_dir: bool) -> Self {
        Self {
            rendered: rendered.into(),
            origin: Origin::Source { path: source.into(), is_dir, mode: None },
        }
    }

    /// Replaces the permission bits the entry is written with.
    pub fn with_mode(mut self, mode: Option<u32>) -> Self {
        match &mut self.origin {
            Origin::Source { mode: current, .. } => *current = mode,
            Origin::Virtual(Node::Dir { mode: current }) => *current = mode,
            Origin::Virtual(Node::File { mode: current, .. }) => *current = mode,
        }
        self
    }

    pub fn virtual_dir<P: Into<PathBuf>>(rendered: P, mode: Option<u32>) -> Self {
        Self { rendered: rendered.into(), origin: Origin::Virtual(Node::Dir { mode }) }
    }

    pub fn virtual_file<P: Into<PathBuf>>(rendered: P, content: Content, mode: Option<u32>) -> Self {
        Self {
            rendered: rendered.into(),
            origin: Origin::Virtual(Node::File { content, mode }),
        }
    }

    /// Destination path, relative to the output directory.
    pub fn rendered(&self) -> &Path {
        &self.rendered
    }

    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// Source entry this path is copied from, if any.
    pub fn source(&self) -> Option<&Path> {
        match &self.origin {
            Origin::Source { path, .. } => Some(path),
            Origin::Virtual(_) => None,
        }
    }

    pub fn is_dir(&self) -> bool {
        match &self.origin {
            Origin::Source { is_dir, .. } => *is_dir,
            Origin::Virtual(node) => matches!(node, Node::Dir { .. }),
        }
    }

    /// Reads the entry into a `Node`.
    ///
    /// Source-backed entries take their content from the source, and their
    /// permission bits too unless a mode was set. Virtual entries are
    /// returned as they are.
    pub fn resolve(&self) -> Result<Node> {
        let (path, is_dir, mode) = match &self.origin {
            Origin::Virtual(node) => return Ok(node.clone()),
            Origin::Source { path, is_dir, mode } => (path, *is_dir, *mode),
        };
        let mode = match mode {
            Some(mode) => Some(mode),
            None => source_mode(path)?,
        };
        if is_dir {
            Ok(Node::Dir { mode })
        } else {
            Ok(Node::File { content: Content::sniff(fs::read(path)?), mode })
        }
    }

    /// Checks that the destination stays inside the output directory.
    ///
    /// # Errors
    /// * `Error::InvalidPathError` for empty or absolute paths and paths with
    ///   `.` or `..` components
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: &str| Error::InvalidPathError {
            path: self.rendered.clone(),
            reason: reason.to_string(),
        };
        if self.rendered.as_os_str().is_empty() {
            return Err(invalid("path is empty"));
        }
        for component in self.rendered.components() {
            match component {
                Component::Normal(_) => {}
                Component::Prefix(_) | Component::RootDir => {
                    return Err(invalid("path must be relative"))
                }
                Component::CurDir | Component::ParentDir => {
                    return Err(invalid("path cannot contain '.' or '..'"))
                }
            }
        }
        Ok(())
    }
}

#[cfg(unix)]
fn source_mode(path: &Path) -> Result<Option<u32>> {
    use std::os::unix::fs::PermissionsExt;
    Ok(Some(fs::metadata(path)?.permissions().mode() & 0o7777))
}

#[cfg(not(unix))]
fn source_mode(_path: &Path) -> Result<Option<u32>> {
    Ok(None)
}
