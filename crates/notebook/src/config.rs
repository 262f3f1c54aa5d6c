//! Configuration loading for the notebook
//!
//! OAuth credentials are resolved (in order of priority) from:
//! 1. Compile-time embedded credentials (for production builds)
//! 2. JSON file (Google Cloud Console format)
//! 3. Runtime environment variables (fallback)
//!
//! Notebook settings come from `notebook.json` in the config directory,
//! with `SHEETPAD_*` environment variables layered on top.

use anyhow::{Context, Result, bail};
use config::ConfigDir;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

use crate::editor::DEFAULT_HISTORY_LIMIT;
use crate::sheets::Locator;
use crate::store::EntryStore;
use crate::workspace::{Notebook, Notifier, UpdateFallback};

/// Credentials filename in the config directory
pub const CREDENTIALS_FILE: &str = "google-credentials.json";

pub const SETTINGS_FILE: &str = "notebook.json";

/// Last account used to sign in
pub const LOGIN_HINT_FILE: &str = "login-hint.json";

/// OAuth client credentials for the Sheets API
#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Google Cloud Console credential file format
#[derive(Deserialize)]
struct GoogleCredentialFile {
    installed: Option<ClientSection>,
    web: Option<ClientSection>,
}

#[derive(Deserialize)]
struct ClientSection {
    client_id: String,
    client_secret: String,
}

impl OAuthCredentials {
    pub fn load(dir: &ConfigDir) -> Result<Self> {
        if let Some(creds) = Self::from_compile_time() {
            return Ok(creds);
        }

        if dir.exists(CREDENTIALS_FILE) {
            let creds: GoogleCredentialFile = dir.load_json(CREDENTIALS_FILE)?;
            return Self::from_credential_file(creds);
        }

        Self::from_env()
    }

    /// Build with: SHEETPAD_CLIENT_ID=xxx SHEETPAD_CLIENT_SECRET=yyy cargo build --release
    pub fn from_compile_time() -> Option<Self> {
        let client_id = option_env!("SHEETPAD_CLIENT_ID")?;
        let client_secret = option_env!("SHEETPAD_CLIENT_SECRET")?;
        if client_id.is_empty() || client_secret.is_empty() {
            return None;
        }

        Some(Self {
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
        })
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let creds: GoogleCredentialFile = config::load_json_file(path)?;
        Self::from_credential_file(creds)
    }

    fn from_credential_file(creds: GoogleCredentialFile) -> Result<Self> {
        // Desktop ("installed") and web client types share a shape
        let section = creds
            .installed
            .or(creds.web)
            .context("Credentials file missing 'installed' or 'web' section")?;

        Ok(Self {
            client_id: section.client_id,
            client_secret: section.client_secret,
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let creds: GoogleCredentialFile =
            serde_json::from_str(json).context("Failed to parse credentials JSON")?;
        Self::from_credential_file(creds)
    }

    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("SHEETPAD_CLIENT_ID")
            .context("SHEETPAD_CLIENT_ID environment variable not set")?;
        let client_secret = std::env::var("SHEETPAD_CLIENT_SECRET")
            .context("SHEETPAD_CLIENT_SECRET environment variable not set")?;

        Ok(Self {
            client_id,
            client_secret,
        })
    }
}

/// A named journal table that tabs can be submitted to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitTarget {
    pub name: String,
    #[serde(flatten)]
    pub locator: Locator,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookConfig {
    /// Scratch table behind the store section
    pub store: Locator,
    /// Curated table behind the picker and perm section
    pub permanent: Locator,
    /// Journal tables; the first is the default
    pub submit_targets: Vec<SubmitTarget>,
    pub login_hint: Option<String>,
    pub update_fallback: UpdateFallback,
    pub history_limit: usize,
}

impl Default for NotebookConfig {
    fn default() -> Self {
        Self {
            store: Locator::default(),
            permanent: Locator::default(),
            submit_targets: Vec::new(),
            login_hint: None,
            update_fallback: UpdateFallback::default(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl NotebookConfig {
    /// Settings file plus environment overrides plus the remembered login hint
    pub fn load(dir: &ConfigDir) -> Result<Self> {
        let mut config: Self = dir.load_json_opt(SETTINGS_FILE)?.unwrap_or_default();
        config.apply_overrides(|key| std::env::var(key).ok());
        if config.login_hint.is_none() {
            config.login_hint = load_login_hint(dir);
        }
        Ok(config)
    }

    /// Layer `SHEETPAD_*` variables over the file values
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("SHEETPAD_STORE_SHEET_ID") {
            self.store.sheet_id = v;
        }
        if let Some(v) = non_empty("SHEETPAD_STORE_TAB") {
            self.store.tab = v;
        }
        if let Some(v) = non_empty("SHEETPAD_PERM_SHEET_ID") {
            self.permanent.sheet_id = v;
        }
        if let Some(v) = non_empty("SHEETPAD_PERM_TAB") {
            self.permanent.tab = v;
        }
        if let Some(v) = non_empty("SHEETPAD_LOGIN_HINT") {
            self.login_hint = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.store.is_complete() {
            bail!(
                "Store table not configured; set store in {} or SHEETPAD_STORE_SHEET_ID and SHEETPAD_STORE_TAB",
                SETTINGS_FILE
            );
        }
        if !self.permanent.is_complete() {
            bail!(
                "Permanent table not configured; set permanent in {} or SHEETPAD_PERM_SHEET_ID and SHEETPAD_PERM_TAB",
                SETTINGS_FILE
            );
        }
        if let Some(target) = self.submit_targets.iter().find(|t| !t.locator.is_complete()) {
            bail!("Submit target '{}' is missing a sheet id or tab", target.name);
        }
        Ok(())
    }

    /// A submit target by name (case-insensitive), or the default one
    pub fn submit_target(&self, name: Option<&str>) -> Option<&SubmitTarget> {
        match name {
            Some(name) => self
                .submit_targets
                .iter()
                .find(|t| t.name.eq_ignore_ascii_case(name.trim())),
            None => self.submit_targets.first(),
        }
    }

    pub fn open_notebook(&self, store: Arc<dyn EntryStore>, notifier: Arc<dyn Notifier>) -> Notebook {
        Notebook::new(store, self.store.clone(), self.permanent.clone())
            .with_history_limit(self.history_limit)
            .with_update_fallback(self.update_fallback)
            .with_notifier(notifier)
    }
}

#[derive(Serialize, Deserialize)]
struct StoredHint {
    email: String,
}

pub fn load_login_hint(dir: &ConfigDir) -> Option<String> {
    match dir.load_json_opt::<StoredHint>(LOGIN_HINT_FILE) {
        Ok(hint) => hint.map(|h| h.email).filter(|e| !e.trim().is_empty()),
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", LOGIN_HINT_FILE, e);
            None
        }
    }
}

/// Remember the account for the next sign-in; a blank email forgets it
pub fn save_login_hint(dir: &ConfigDir, email: &str) -> Result<()> {
    let email = email.trim();
    if email.is_empty() {
        return dir.remove(LOGIN_HINT_FILE);
    }
    dir.save_json(
        LOGIN_HINT_FILE,
        &StoredHint {
            email: email.to_string(),
        },
    )
}
