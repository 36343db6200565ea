//! Configuration system (layered: code > env > config file > defaults).

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{Result, ThreadlineError};
use crate::types::GenerationSettings;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_MAX_TOKENS: u32 = 200;
pub const DEFAULT_MEMORY_FILE: &str = "chat_memory.json";
pub const DEFAULT_SESSION_CAPACITY: usize = 16;
const CONFIG_FILE_NAME: &str = "threadline.toml";

/// Resolved runtime configuration.
///
/// Resolution order, lowest to highest:
/// 1. Built-in defaults
/// 2. `threadline.toml` (platform config dir, or an explicit path)
/// 3. Environment variables (a `.env` file is loaded first if present)
/// 4. Explicit setters
#[derive(Clone)]
pub struct ThreadlineConfig {
    api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub system_prompt: Option<String>,
    pub memory_file: PathBuf,
    pub session_capacity: usize,
    pub translate_url: Option<String>,
    pub search_url: Option<String>,
}

impl fmt::Debug for ThreadlineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadlineConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| ".."))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("memory_file", &self.memory_file)
            .field("session_capacity", &self.session_capacity)
            .finish()
    }
}

impl Default for ThreadlineConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// On-disk shape of `threadline.toml`. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
    system_prompt: Option<String>,
    memory_file: Option<PathBuf>,
    session_capacity: Option<usize>,
    #[serde(default)]
    urls: FileUrls,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileUrls {
    openai: Option<String>,
    translate: Option<String>,
    search: Option<String>,
}

impl ThreadlineConfig {
    /// Built-in defaults only.
    pub fn new() -> Self {
        Self {
            api_key: None,
            base_url: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: Some(DEFAULT_MAX_TOKENS),
            temperature: None,
            system_prompt: None,
            memory_file: PathBuf::from(DEFAULT_MEMORY_FILE),
            session_capacity: DEFAULT_SESSION_CAPACITY,
            translate_url: None,
            search_url: None,
        }
    }

    /// Defaults, then the default config file if one exists, then the environment.
    ///
    /// Never fails: an unreadable config file is logged and skipped.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv(); // load .env if present, ignore error
        let mut config = Self::new();
        if let Some(path) = default_config_path() {
            if path.exists() {
                if let Err(e) = config.merge_file(&path) {
                    warn!(path = %path.display(), error = %e, "ignoring unreadable config file");
                }
            }
        }
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Like [`from_env`](Self::from_env) but with an explicit config file that must parse.
    pub fn load(path: &Path) -> Result<Self> {
        let _ = dotenvy::dotenv();
        let mut config = Self::new();
        config.merge_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Overlay values from a TOML file.
    pub fn merge_file(&mut self, path: &Path) -> Result<()> {
        let raw = std::fs::read_to_string(path)?;
        self.merge_toml(&raw)
            .map_err(|e| ThreadlineError::Configuration(format!("{}: {e}", path.display())))
    }

    /// Overlay values from TOML text.
    pub fn merge_toml(&mut self, raw: &str) -> Result<()> {
        let file: FileConfig =
            toml::from_str(raw).map_err(|e| ThreadlineError::Configuration(e.to_string()))?;
        debug!(?file, "merging config file");
        if let Some(model) = file.model {
            self.model = model;
        }
        if file.max_tokens.is_some() {
            self.max_tokens = file.max_tokens;
        }
        if file.temperature.is_some() {
            self.temperature = file.temperature;
        }
        if file.system_prompt.is_some() {
            self.system_prompt = file.system_prompt;
        }
        if let Some(path) = file.memory_file {
            self.memory_file = path;
        }
        if let Some(capacity) = file.session_capacity {
            self.session_capacity = capacity;
        }
        if file.urls.openai.is_some() {
            self.base_url = file.urls.openai;
        }
        if file.urls.translate.is_some() {
            self.translate_url = file.urls.translate;
        }
        if file.urls.search.is_some() {
            self.search_url = file.urls.search;
        }
        Ok(())
    }

    /// Overlay values from environment-style lookups.
    ///
    /// Takes a lookup function so callers (and tests) need not touch the
    /// process environment.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(url) = non_empty("OPENAI_BASE_URL") {
            self.base_url = Some(url);
        }
        if let Some(model) = non_empty("THREADLINE_MODEL") {
            self.model = model;
        }
        if let Some(path) = non_empty("THREADLINE_MEMORY_FILE") {
            self.memory_file = PathBuf::from(path);
        }
        if let Some(raw) = non_empty("THREADLINE_SESSION_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) => self.session_capacity = capacity,
                Err(_) => warn!(value = %raw, "THREADLINE_SESSION_CAPACITY is not a number"),
            }
        }
        if let Some(url) = non_empty("THREADLINE_TRANSLATE_URL") {
            self.translate_url = Some(url);
        }
        if let Some(url) = non_empty("THREADLINE_SEARCH_URL") {
            self.search_url = Some(url);
        }
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.api_key = Some(key.into());
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// The API key, or the missing-credentials error every model call reports.
    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key()
            .ok_or_else(|| ThreadlineError::Authentication("Missing OPENAI_API_KEY".into()))
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    /// Sampling parameters derived from this config.
    pub fn generation_settings(&self) -> GenerationSettings {
        GenerationSettings {
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            ..Default::default()
        }
    }
}

/// `threadline.toml` in the platform config directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "threadline")
        .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}
