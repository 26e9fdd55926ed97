use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use super::{Plugin, ScriptPlugin};
use crate::error::Result;

/// Builds a fresh plugin instance for one run.
pub type PluginFactory = Box<dyn Fn() -> Box<dyn Plugin>>;

/// Named plugin factories, in registration order.
#[derive(Default)]
pub struct PluginRegistry {
    factories: Vec<(String, PluginFactory)>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a factory. Registering a name again replaces the factory in place.
    pub fn register<S, F>(&mut self, name: S, factory: F)
    where
        S: Into<String>,
        F: Fn() -> Box<dyn Plugin> + 'static,
    {
        let name = name.into();
        let factory: PluginFactory = Box::new(factory);
        match self.factories.iter_mut().find(|(existing, _)| *existing == name) {
            Some(entry) => entry.1 = factory,
            None => self.factories.push((name, factory)),
        }
    }

    /// Registers a script plugin for every plugin script in `dir`.
    ///
    /// # Returns
    /// * `Result<usize>` - Number of scripts registered
    pub fn discover<P: AsRef<Path>>(&mut self, dir: P) -> Result<usize> {
        let scripts = discover_scripts(dir)?;
        for script in &scripts {
            let name = script
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| script.display().to_string());
            debug!("Registering plugin script '{}'", script.display());
            let script = script.clone();
            self.register(name, move || Box::new(ScriptPlugin::new(&script)) as Box<dyn Plugin>);
        }
        Ok(scripts.len())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.factories.iter().map(|(name, _)| name.as_str())
    }

    /// Creates one instance per factory, in registration order.
    pub fn instantiate(&self) -> Vec<Box<dyn Plugin>> {
        self.factories.iter().map(|(_, factory)| factory()).collect()
    }
}

/// Lists the plugin scripts of `dir`, sorted by file name.
///
/// Regular files whose name starts with `.` or `_` are ignored. On unix, a
/// file without any execute bit is skipped with a warning. A missing
/// directory holds no scripts.
pub fn discover_scripts<P: AsRef<Path>>(dir: P) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        debug!("No plugin directory at '{}'", dir.display());
        return Ok(Vec::new());
    }

    let mut scripts = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with('.') || name.starts_with('_') {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !is_executable(&path)? {
            warn!("Skipping plugin '{}': file is not executable", path.display());
            continue;
        }
        scripts.push(path);
    }
    scripts.sort();
    Ok(scripts)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> Result<bool> {
    use std::os::unix::fs::PermissionsExt;
    Ok(fs::metadata(path)?.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> Result<bool> {
    Ok(true)
}
