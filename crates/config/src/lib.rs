//! Configuration directory helpers for Sheetpad
//!
//! All persisted settings live as small JSON files in one directory,
//! `~/.config/sheetpad/` by default. [`ConfigDir`] addresses that directory
//! (or any other root, which is what tests use). [`default_dir`] resolves the
//! default location; call [`ConfigDir::ensure`] at startup to create it.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Name of the application directory under the platform config dir
const APP_DIR: &str = "sheetpad";

/// A directory holding JSON config files
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigDir {
    root: PathBuf,
}

impl ConfigDir {
    /// The platform default (`~/.config/sheetpad/` on Linux)
    pub fn default_location() -> Option<Self> {
        dirs::config_dir().map(|p| Self::at(p.join(APP_DIR)))
    }

    /// A config directory rooted at an arbitrary path
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a file inside this directory
    pub fn path(&self, filename: &str) -> PathBuf {
        self.root.join(filename)
    }

    pub fn exists(&self, filename: &str) -> bool {
        self.path(filename).exists()
    }

    /// Create the directory (and parents) if missing
    pub fn ensure(&self) -> Result<&Path> {
        std::fs::create_dir_all(&self.root).with_context(|| {
            format!("Failed to create config directory: {}", self.root.display())
        })?;
        Ok(&self.root)
    }

    /// Load and parse a JSON file from this directory
    pub fn load_json<T: DeserializeOwned>(&self, filename: &str) -> Result<T> {
        load_json_file(&self.path(filename))
    }

    /// Load a JSON file, returning `None` when it does not exist
    pub fn load_json_opt<T: DeserializeOwned>(&self, filename: &str) -> Result<Option<T>> {
        if !self.exists(filename) {
            return Ok(None);
        }
        self.load_json(filename).map(Some)
    }

    /// Serialize a value as pretty JSON into this directory
    pub fn save_json<T: Serialize>(&self, filename: &str, value: &T) -> Result<()> {
        self.ensure()?;
        let path = self.path(filename);
        let content = serde_json::to_string_pretty(value)?;
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Remove a file if present
    pub fn remove(&self, filename: &str) -> Result<()> {
        let path = self.path(filename);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

/// The default config directory, or an error when the platform has none
pub fn default_dir() -> Result<ConfigDir> {
    ConfigDir::default_location().context("Could not determine config directory")
}

/// Load and parse a JSON file from an arbitrary path
pub fn load_json_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
