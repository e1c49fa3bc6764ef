//! Engine options and their construction from configuration.

use mdr_config::Config;
use mdr_document::{Selector, SelectorError};
use mdr_render::{KrokiSource, RenderOptions, ScanOptions, SecurityLevel};

use crate::watcher::WatcherOptions;

/// Error turning configuration into engine options.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("invalid selector: {0}")]
    Selector(#[from] SelectorError),
    #[error("unknown security level: {0}")]
    SecurityLevel(String),
}

/// Everything an [`Engine`](crate::Engine) needs besides the document and the
/// renderer source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub scan: ScanOptions,
    pub render: RenderOptions,
    pub watcher: WatcherOptions,
}

impl EngineOptions {
    /// Build options from a loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a selector does not parse or the security level is
    /// unknown. [`Config::load`] already validates both, so this only fails for
    /// configurations assembled by hand.
    pub fn from_config(config: &Config) -> Result<Self, EngineError> {
        let scan = ScanOptions::from_sources(
            &config.scanner.code_selectors,
            &config.scanner.container_selectors,
        )?;

        let renderer = &config.renderer;
        let security_level = SecurityLevel::parse(&renderer.security_level)
            .ok_or_else(|| EngineError::SecurityLevel(renderer.security_level.clone()))?;
        let render = RenderOptions {
            start_on_load: renderer.start_on_load,
            theme: renderer.theme.clone(),
            security_level,
            font_family: renderer.font_family.clone(),
        };

        let watch_selectors = config
            .watcher
            .watch_selectors
            .iter()
            .map(|s| Selector::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        let watcher = WatcherOptions {
            enabled: config.watcher.enabled,
            debounce: config.watcher.debounce(),
            watch_selector: Selector::any(watch_selectors),
        };

        Ok(Self {
            scan,
            render,
            watcher,
        })
    }
}

/// Kroki renderer source for the configured server, if one is set.
#[must_use]
pub fn kroki_source(config: &Config) -> Option<KrokiSource> {
    config
        .renderer
        .kroki_url
        .as_deref()
        .map(|url| KrokiSource::new(url).timeout(config.renderer.timeout()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config_matches_default_options() {
        let options = EngineOptions::from_config(&Config::default()).unwrap();
        assert_eq!(options, EngineOptions::default());
    }

    #[test]
    fn test_from_config_applies_values() {
        let mut config = Config::default();
        config.renderer.theme = "dark".to_owned();
        config.renderer.security_level = "strict".to_owned();
        config.scanner.code_selectors = vec!["code.mermaid".to_owned()];
        config.watcher.debounce_ms = 50;
        config.watcher.enabled = false;

        let options = EngineOptions::from_config(&config).unwrap();

        assert_eq!(options.render.theme, "dark");
        assert_eq!(options.render.security_level, SecurityLevel::Strict);
        assert_eq!(options.scan.code_selector.as_str(), "code.mermaid");
        assert_eq!(options.watcher.debounce, Duration::from_millis(50));
        assert!(!options.watcher.enabled);
    }

    #[test]
    fn test_from_config_rejects_unknown_security_level() {
        let mut config = Config::default();
        config.renderer.security_level = "paranoid".to_owned();

        let err = EngineOptions::from_config(&config).unwrap_err();
        assert!(matches!(err, EngineError::SecurityLevel(ref level) if level == "paranoid"));
    }

    #[test]
    fn test_from_config_rejects_bad_selector() {
        let mut config = Config::default();
        config.watcher.watch_selectors = vec!["div[".to_owned()];

        let err = EngineOptions::from_config(&config).unwrap_err();
        assert!(matches!(err, EngineError::Selector(_)));
    }

    #[test]
    fn test_kroki_source_from_config() {
        let mut config = Config::default();
        assert!(kroki_source(&config).is_none());

        config.renderer.kroki_url = Some("https://kroki.io/".to_owned());
        let source = kroki_source(&config).unwrap();
        assert_eq!(source.server_url(), "https://kroki.io");
    }
}
