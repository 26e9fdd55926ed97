//! Render pipeline.
//! Walks the template source tree, renders every path segment and text file
//! against the metadata, and writes the resulting entries below the output
//! directory, parents first.

use std::fs;
use std::path::{Component, Path, PathBuf};

use globset::GlobSet;
use log::{debug, warn};
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::path::{Content, Node, Origin, TempPath};
use crate::renderer::TemplateRenderer;

/// Walks a source tree and materializes planned entries.
pub struct Processor<'a> {
    renderer: &'a dyn TemplateRenderer,
    source_root: &'a Path,
    output_root: &'a Path,
    context: &'a serde_json::Value,
    ignored: &'a GlobSet,
    /// Source-relative directory excluded from the walk
    excluded: Option<PathBuf>,
}

impl<'a> Processor<'a> {
    pub fn new(
        renderer: &'a dyn TemplateRenderer,
        source_root: &'a Path,
        output_root: &'a Path,
        context: &'a serde_json::Value,
        ignored: &'a GlobSet,
    ) -> Self {
        Self { renderer, source_root, output_root, context, ignored, excluded: None }
    }

    /// Leaves `dir` out of the walk when it lies inside the source root.
    pub fn exclude<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.excluded = dir.as_ref().strip_prefix(self.source_root).ok().map(Path::to_path_buf);
        self
    }

    /// Walks the source root in file name order.
    ///
    /// Ignored entries and entries with a segment that renders to an empty
    /// string are skipped together with everything below them.
    ///
    /// # Errors
    /// * `Error::TemplateStringError` if a path segment fails to render
    /// * `Error::InvalidPathError` if a segment renders to a separator, `.` or `..`
    pub fn collect(&self) -> Result<Vec<TempPath>> {
        let mut paths = Vec::new();
        let mut walker = WalkDir::new(self.source_root).min_depth(1).sort_by_file_name().into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| Error::IoError(e.into()))?;
            let is_dir = entry.file_type().is_dir();
            let relative = entry.path().strip_prefix(self.source_root).map_err(|_| {
                Error::InvalidPathError {
                    path: entry.path().to_path_buf(),
                    reason: "entry is outside the source directory".to_string(),
                }
            })?;

            let excluded = self.excluded.as_deref() == Some(relative);
            if excluded || self.ignored.is_match(relative) {
                debug!("Ignoring '{}'", relative.display());
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            match self.render_path(relative)? {
                Some(rendered) => {
                    debug!("Planned '{}' -> '{}'", relative.display(), rendered.display());
                    paths.push(TempPath::from_source(rendered, entry.path(), is_dir));
                }
                None => {
                    debug!("Skipping '{}': a path segment rendered empty", relative.display());
                    if is_dir {
                        walker.skip_current_dir();
                    }
                }
            }
        }
        Ok(paths)
    }

    /// Renders every segment of a source-relative path.
    /// Returns `None` when a segment renders to an empty string.
    pub fn render_path(&self, relative: &Path) -> Result<Option<PathBuf>> {
        let invalid = |reason: &str| Error::InvalidPathError {
            path: relative.to_path_buf(),
            reason: reason.to_string(),
        };

        let mut rendered = PathBuf::new();
        for component in relative.components() {
            let Component::Normal(segment) = component else {
                return Err(invalid("source paths must be relative"));
            };
            let segment = segment.to_str().ok_or_else(|| invalid("path is not valid UTF-8"))?;
            let segment = self.renderer.render(segment, self.context)?;

            if segment.trim().is_empty() {
                return Ok(None);
            }
            if segment == "." || segment == ".." || segment.contains(['/', '\\']) {
                return Err(invalid(&format!("segment rendered to '{}'", segment)));
            }
            rendered.push(segment);
        }
        Ok(Some(rendered))
    }

    /// Writes one entry below the output root.
    ///
    /// Text read from the source tree is rendered first; text supplied by a
    /// plugin is taken literally. Both then go through `on_render`. Binary
    /// content is copied unchanged.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - The written path
    ///
    /// # Errors
    /// * `Error::PathConflictError` if a directory entry already exists
    /// * `Error::ParentMissingError` if the parent has not been created
    /// * `Error::TemplateFileError` if a source file fails to render
    pub fn materialize<F>(&self, temp: &TempPath, mut on_render: F) -> Result<PathBuf>
    where
        F: FnMut(&TempPath, String) -> Result<String>,
    {
        let target = self.output_root.join(temp.rendered());
        let node = temp.resolve()?;

        if let Some(parent) = target.parent() {
            if !parent.is_dir() {
                return Err(Error::ParentMissingError {
                    path: target.clone(),
                    parent: parent.to_path_buf(),
                });
            }
        }

        match node {
            Node::Dir { mode } => {
                if target.exists() {
                    return Err(Error::PathConflictError { path: target });
                }
                debug!("Creating directory '{}'", target.display());
                fs::create_dir(&target)?;
                apply_mode(&target, mode)?;
            }
            Node::File { content, mode } => {
                if target.exists() {
                    warn!("Overwriting '{}'", target.display());
                }
                match content {
                    Content::Text(text) => {
                        let text = match temp.origin() {
                            Origin::Source { path, .. } => self.render_file(path, &text)?,
                            Origin::Virtual(_) => text,
                        };
                        let text = on_render(temp, text)?;
                        debug!("Writing '{}'", target.display());
                        fs::write(&target, text)?;
                    }
                    Content::Binary(bytes) => {
                        debug!("Copying '{}'", target.display());
                        fs::write(&target, bytes)?;
                    }
                }
                apply_mode(&target, mode)?;
            }
        }
        Ok(target)
    }

    fn render_file(&self, path: &Path, text: &str) -> Result<String> {
        self.renderer.render(text, self.context).map_err(|e| match e {
            Error::TemplateStringError { source, .. } => {
                Error::TemplateFileError { path: path.to_path_buf(), source }
            }
            other => other,
        })
    }
}

/// Checks every entry and sorts them so that parents come before children.
///
/// # Errors
/// * `Error::InvalidPathError` for the first entry that escapes the output root
pub fn order_paths(paths: &mut [TempPath]) -> Result<()> {
    for temp in paths.iter() {
        temp.validate()?;
    }
    paths.sort_by(|a, b| a.rendered().cmp(b.rendered()));
    Ok(())
}

#[cfg(unix)]
fn apply_mode(target: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        fs::set_permissions(target, fs::Permissions::from_mode(mode))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_target: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}
