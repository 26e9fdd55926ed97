//! Template acquisition for kiln.
//! A template is either a local directory or a git repository cloned into
//! the system temp directory.
use crate::error::{Error, Result};
use crate::prompt::Prompter;
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

/// Represents the source location of a template.
#[derive(Debug, PartialEq, Eq)]
pub enum TemplateSource {
    /// Local filesystem template path
    FileSystem(PathBuf),
    /// Git repository URL (HTTPS, git or SSH)
    Git(String),
}

impl std::fmt::Display for TemplateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateSource::FileSystem(path) => {
                write!(f, "local path: '{}'", path.display())
            }
            TemplateSource::Git(repo) => write!(f, "git repository: '{repo}'"),
        }
    }
}

impl TemplateSource {
    /// Creates a TemplateSource from a string path or URL.
    pub fn from_string(s: &str) -> Self {
        if is_git_url(s) {
            Self::Git(s.to_string())
        } else {
            Self::FileSystem(PathBuf::from(s))
        }
    }
}

/// Returns `true` for `https://` and `git://` URLs and `git@host:path` addresses.
pub fn is_git_url(s: &str) -> bool {
    if s.starts_with("git@") {
        return true;
    }
    matches!(Url::parse(s), Ok(url) if url.scheme() == "https" || url.scheme() == "git")
}

/// Trait for loading templates from different sources.
pub trait TemplateLoader {
    /// Makes the template available locally.
    ///
    /// # Returns
    /// * `Result<PathBuf>` - Path to the template directory
    fn load(&mut self) -> Result<PathBuf>;
}

/// Loader for templates from the local filesystem.
pub struct LocalLoader<P: AsRef<Path>> {
    path: P,
}

impl<P: AsRef<Path>> LocalLoader<P> {
    pub fn new(path: P) -> Self {
        Self { path }
    }
}

impl<P: AsRef<Path>> TemplateLoader for LocalLoader<P> {
    /// # Errors
    /// * `Error::TemplateDoesNotExistError` if the path is not a directory
    fn load(&mut self) -> Result<PathBuf> {
        let path = self.path.as_ref();
        if !path.is_dir() {
            return Err(Error::TemplateDoesNotExistError {
                template_dir: path.display().to_string(),
            });
        }

        Ok(path.to_path_buf())
    }
}

/// Loader for templates from git repositories.
pub struct GitLoader<'a, S: AsRef<str>> {
    prompter: &'a mut dyn Prompter,
    repo: S,
    skip_overwrite_check: bool,
}

impl<'a, S: AsRef<str>> GitLoader<'a, S> {
    pub fn new(prompter: &'a mut dyn Prompter, repo: S, skip_overwrite_check: bool) -> Self {
        Self { prompter, repo, skip_overwrite_check }
    }

    /// Directory the repository is cloned into.
    pub fn clone_path(&self) -> PathBuf {
        let repo_name = self
            .repo
            .as_ref()
            .trim_end_matches('/')
            .rsplit(['/', ':'])
            .next()
            .unwrap_or("template")
            .trim_end_matches(".git");
        std::env::temp_dir().join("kiln").join(repo_name)
    }
}

impl<S: AsRef<str>> TemplateLoader for GitLoader<'_, S> {
    /// Clones the repository, reusing an earlier clone if the user declines
    /// to replace it.
    ///
    /// # Errors
    /// * `Error::GitError` if the clone fails
    fn load(&mut self) -> Result<PathBuf> {
        let repo_url = self.repo.as_ref().to_string();
        let clone_path = self.clone_path();

        if clone_path.exists() {
            let replace = self.skip_overwrite_check
                || self.prompter.confirm(
                    &format!("Directory '{}' already exists. Replace it?", clone_path.display()),
                    false,
                )?;
            if replace {
                fs::remove_dir_all(&clone_path)?;
            } else {
                debug!("Using existing directory '{}'.", clone_path.display());
                return Ok(clone_path);
            }
        }
        if let Some(parent) = clone_path.parent() {
            fs::create_dir_all(parent)?;
        }

        debug!("Cloning repository '{}' to '{}'.", repo_url, clone_path.display());

        let mut callbacks = git2::RemoteCallbacks::new();
        callbacks.credentials(|_url, username_from_url, allowed_types| {
            if allowed_types.contains(git2::CredentialType::SSH_KEY) {
                git2::Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"))
            } else {
                git2::Cred::default()
            }
        });

        let mut fetch_opts = git2::FetchOptions::new();
        fetch_opts.remote_callbacks(callbacks);

        let mut builder = git2::build::RepoBuilder::new();
        builder.fetch_options(fetch_opts);
        builder.clone(&repo_url, &clone_path)?;

        Ok(clone_path)
    }
}

/// Returns the template directory for a path or repository address.
pub fn load_template<S: AsRef<str>>(
    prompter: &mut dyn Prompter,
    template: S,
    skip_overwrite_check: bool,
) -> Result<PathBuf> {
    let source = TemplateSource::from_string(template.as_ref());
    println!("Using template from the {}", source);

    match source {
        TemplateSource::Git(repo) => GitLoader::new(prompter, repo, skip_overwrite_check).load(),
        TemplateSource::FileSystem(path) => LocalLoader::new(path).load(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_source_display() {
        let fs_source = TemplateSource::FileSystem(PathBuf::from("/path/to/template"));
        assert_eq!(format!("{}", fs_source), "local path: '/path/to/template'");

        let git_source = TemplateSource::Git("git@github.com:user/repo".to_string());
        assert_eq!(format!("{}", git_source), "git repository: 'git@github.com:user/repo'");
    }

    #[test]
    fn test_is_git_url() {
        assert!(is_git_url("https://github.com/user/repo.git"));
        assert!(is_git_url("git://example.com/repo"));
        assert!(is_git_url("git@github.com:user/repo.git"));
        assert!(!is_git_url("./templates/rust"));
        assert!(!is_git_url("file:///tmp/template"));
    }

    #[test]
    fn test_clone_path() {
        let mut prompter = crate::prompt::LinePrompter::new("".as_bytes(), Vec::new());
        let loader = GitLoader::new(&mut prompter, "git@github.com:user/repo.git", true);
        assert_eq!(loader.clone_path(), std::env::temp_dir().join("kiln").join("repo"));
    }
}
