//! Configuration management for MDR.
//!
//! Parses `mdr.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! Overrides from the embedding application can be applied during load via
//! [`Settings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `renderer.kroki_url`
//! - `renderer.font_family`

mod expand;

use std::path::{Path, PathBuf};
use std::time::Duration;

use mdr_document::Selector;
use mdr_render::SecurityLevel;
use mdr_render::consts::{
    DEFAULT_CODE_SELECTORS, DEFAULT_CONTAINER_SELECTORS, DEFAULT_DEBOUNCE_MS, DEFAULT_FONT_FAMILY,
    DEFAULT_THEME, DEFAULT_TIMEOUT_SECS, DEFAULT_WATCH_SELECTORS,
};
use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "mdr.toml";

/// Upper bound for the debounce quiet period.
const MAX_DEBOUNCE_MS: u64 = 60_000;

/// Settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct Settings {
    /// Override Kroki URL for diagram rendering.
    pub kroki_url: Option<String>,
    /// Override diagram theme.
    pub theme: Option<String>,
    /// Override debounce quiet period.
    pub debounce_ms: Option<u64>,
    /// Override change watcher enabled flag.
    pub watcher_enabled: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Rendering library configuration.
    pub renderer: RendererConfig,
    /// Block scanner configuration.
    pub scanner: ScannerConfig,
    /// Change watcher configuration.
    pub watcher: WatcherConfig,

    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Rendering library configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Kroki server URL. Required only when rendering through Kroki.
    pub kroki_url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Diagram theme identifier.
    pub theme: String,
    /// Security level (`strict`, `loose`, `antiscript`, `sandbox`).
    pub security_level: String,
    /// Font family used inside diagrams.
    pub font_family: String,
    /// Whether the library should render on its own when loaded.
    pub start_on_load: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            kroki_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            theme: DEFAULT_THEME.to_owned(),
            security_level: SecurityLevel::default().as_str().to_owned(),
            font_family: DEFAULT_FONT_FAMILY.to_owned(),
            start_on_load: false,
        }
    }
}

impl RendererConfig {
    /// Request timeout as a duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Block scanner configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Selectors for text-bearing code elements.
    pub code_selectors: Vec<String>,
    /// Container selectors in priority order; the immediate parent is the fallback.
    pub container_selectors: Vec<String>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            code_selectors: owned(DEFAULT_CODE_SELECTORS),
            container_selectors: owned(DEFAULT_CONTAINER_SELECTORS),
        }
    }
}

/// Change watcher configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatcherConfig {
    /// Whether mutation-triggered re-scans are enabled.
    pub enabled: bool,
    /// Quiet period in milliseconds.
    pub debounce_ms: u64,
    /// Selectors whose appearance in added content warrants a re-scan.
    pub watch_selectors: Vec<String>,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            watch_selectors: owned(DEFAULT_WATCH_SELECTORS),
        }
    }
}

impl WatcherConfig {
    /// Quiet period as a duration.
    #[must_use]
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`renderer.kroki_url`").
        field: String,
        /// Error message (e.g., "${`KROKI_URL`} not set").
        message: String,
    },
}

fn owned(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| (*v).to_owned()).collect()
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a URL field to use http:// or https:// scheme.
fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

/// Require every entry to be a valid selector.
fn require_selectors(selectors: &[String], field: &str) -> Result<(), ConfigError> {
    for (index, source) in selectors.iter().enumerate() {
        Selector::parse(source).map_err(|e| {
            ConfigError::Validation(format!("{field}[{index}] is not a valid selector: {e}"))
        })?;
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional overrides.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `mdr.toml` in current directory and parents,
    /// falling back to defaults.
    ///
    /// Settings are applied after loading, so they take precedence over
    /// config file values. The merged result is validated.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(config_path: Option<&Path>, settings: Option<&Settings>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_from(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = settings {
            config.apply_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides to the configuration.
    fn apply_settings(&mut self, settings: &Settings) {
        if let Some(kroki_url) = &settings.kroki_url {
            self.renderer.kroki_url = Some(kroki_url.clone());
        }
        if let Some(theme) = &settings.theme {
            self.renderer.theme.clone_from(theme);
        }
        if let Some(debounce_ms) = settings.debounce_ms {
            self.watcher.debounce_ms = debounce_ms;
        }
        if let Some(enabled) = settings.watcher_enabled {
            self.watcher.enabled = enabled;
        }
    }

    /// Search for config file in `start` and its parents.
    fn discover_from(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.expand_env_vars()?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_renderer()?;
        self.validate_scanner()?;
        self.validate_watcher()?;
        Ok(())
    }

    fn validate_renderer(&self) -> Result<(), ConfigError> {
        let renderer = &self.renderer;

        if let Some(ref kroki_url) = renderer.kroki_url {
            require_non_empty(kroki_url, "renderer.kroki_url")?;
            require_http_url(kroki_url, "renderer.kroki_url")?;
        }
        if renderer.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "renderer.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        require_non_empty(&renderer.theme, "renderer.theme")?;
        if SecurityLevel::parse(&renderer.security_level).is_none() {
            let levels = SecurityLevel::ALL.map(SecurityLevel::as_str);
            return Err(ConfigError::Validation(format!(
                "renderer.security_level must be one of: {}",
                levels.join(", ")
            )));
        }
        Ok(())
    }

    fn validate_scanner(&self) -> Result<(), ConfigError> {
        if self.scanner.code_selectors.is_empty() {
            return Err(ConfigError::Validation(
                "scanner.code_selectors cannot be empty".to_owned(),
            ));
        }
        require_selectors(&self.scanner.code_selectors, "scanner.code_selectors")?;
        require_selectors(
            &self.scanner.container_selectors,
            "scanner.container_selectors",
        )?;
        Ok(())
    }

    fn validate_watcher(&self) -> Result<(), ConfigError> {
        if self.watcher.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "watcher.debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }
        if self.watcher.enabled && self.watcher.watch_selectors.is_empty() {
            return Err(ConfigError::Validation(
                "watcher.watch_selectors cannot be empty when the watcher is enabled".to_owned(),
            ));
        }
        require_selectors(&self.watcher.watch_selectors, "watcher.watch_selectors")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        if let Some(ref url) = self.renderer.kroki_url {
            self.renderer.kroki_url = Some(expand::expand_env(url, "renderer.kroki_url")?);
        }
        self.renderer.font_family =
            expand::expand_env(&self.renderer.font_family, "renderer.font_family")?;
        Ok(())
    }
}
