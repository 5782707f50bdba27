//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! The deck itself lives behind a [`ControlHandle`]: handlers fetch the
//! mounted [`DeckController`] per request, so an unmounted surface answers
//! 503 rather than touching a stale deck. Rendering goes through one shared
//! [`DeckRenderer`] whose per-section boundaries persist across requests.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use deck_render::{DeckRenderer, RenderLimits};
use deck_state::DEFAULT_MAX_HISTORY;
use deck_store::{
    seed_if_empty, ControlHandle, DeckController, FileBackend, MemoryBackend, OverrideStore,
    SectionStore,
};
use thiserror::Error;

use crate::error::AppError;

/// Storage medium for the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// JSON documents under the data directory.
    File,
    /// Process memory; the deck is lost on exit.
    Memory,
}

impl FromStr for Backend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(ConfigError::Invalid {
                var: "DECK_BACKEND",
                value: other.to_string(),
            }),
        }
    }
}

/// Environment configuration could not be read.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Server configuration.
///
/// Custom `Debug` redacts the auth token.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Directory holding `sections.json` and `locale-overrides.json`.
    pub data_dir: PathBuf,
    pub backend: Backend,
    /// Undo depth of the deck history.
    pub max_history: usize,
    /// Static bearer token. If `None`, authentication is disabled.
    pub auth_token: Option<String>,
    pub render_limits: RenderLimits,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("data_dir", &self.data_dir)
            .field("backend", &self.backend)
            .field("max_history", &self.max_history)
            .field(
                "auth_token",
                &self.auth_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("render_limits", &self.render_limits)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            data_dir: PathBuf::from("./data"),
            backend: Backend::File,
            max_history: DEFAULT_MAX_HISTORY,
            auth_token: None,
            render_limits: RenderLimits::default(),
        }
    }
}

impl AppConfig {
    /// Read `DECK_PORT`, `DECK_DATA_DIR`, `DECK_BACKEND`, `DECK_MAX_HISTORY`
    /// and `DECK_AUTH_TOKEN`, falling back to defaults for unset variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(port) = get("DECK_PORT") {
            config.port = port.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "DECK_PORT",
                value: port,
            })?;
        }
        if let Some(dir) = get("DECK_DATA_DIR").filter(|d| !d.trim().is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(backend) = get("DECK_BACKEND") {
            config.backend = backend.parse()?;
        }
        if let Some(depth) = get("DECK_MAX_HISTORY") {
            config.max_history = depth.trim().parse().map_err(|_| ConfigError::Invalid {
                var: "DECK_MAX_HISTORY",
                value: depth,
            })?;
        }
        config.auth_token = get("DECK_AUTH_TOKEN").filter(|t| !t.is_empty());
        Ok(config)
    }
}

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub handle: ControlHandle,
    pub renderer: Arc<DeckRenderer>,
    pub config: AppConfig,
}

impl AppState {
    /// State around an in-memory deck holding the default sections.
    pub fn new() -> Self {
        let config = AppConfig {
            backend: Backend::Memory,
            ..AppConfig::default()
        };
        Self::open(config)
    }

    /// Build the deck described by `config`, seed it on first run and mount it.
    pub fn open(config: AppConfig) -> Self {
        let (store, overrides) = match config.backend {
            Backend::File => (
                SectionStore::new(Arc::new(FileBackend::sections_in(&config.data_dir))),
                OverrideStore::new(Arc::new(FileBackend::overrides_in(&config.data_dir))),
            ),
            Backend::Memory => (
                SectionStore::new(Arc::new(MemoryBackend::new("deck-sections"))),
                OverrideStore::new(Arc::new(MemoryBackend::new("deck-locale-overrides"))),
            ),
        };
        if let Err(e) = seed_if_empty(&store) {
            tracing::warn!(error = %e, "stored deck unreadable; leaving it unseeded");
        }
        let controller = DeckController::new(store, overrides, config.max_history);
        Self::with_handle(ControlHandle::mounted(Arc::new(controller)), config)
    }

    /// State over an existing handle, mounted or not.
    pub fn with_handle(handle: ControlHandle, config: AppConfig) -> Self {
        Self {
            handle,
            renderer: Arc::new(DeckRenderer::new(config.render_limits)),
            config,
        }
    }

    /// The mounted controller, or 503.
    pub fn controller(&self) -> Result<Arc<DeckController>, AppError> {
        Ok(self.handle.get()?)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("./data"));
        assert_eq!(config.backend, Backend::File);
        assert_eq!(config.max_history, DEFAULT_MAX_HISTORY);
        assert!(config.auth_token.is_none());
    }

    #[test]
    fn variables_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DECK_PORT", "9000"),
            ("DECK_DATA_DIR", "/tmp/deck"),
            ("DECK_BACKEND", "Memory"),
            ("DECK_MAX_HISTORY", "5"),
            ("DECK_AUTH_TOKEN", "tok"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/deck"));
        assert_eq!(config.backend, Backend::Memory);
        assert_eq!(config.max_history, 5);
        assert_eq!(config.auth_token.as_deref(), Some("tok"));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("DECK_PORT", "eighty")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "DECK_PORT",
                value: "eighty".into()
            }
        );
        assert!(AppConfig::from_lookup(lookup(&[("DECK_BACKEND", "s3")])).is_err());
    }

    #[test]
    fn debug_redacts_token() {
        let config = AppConfig {
            auth_token: Some("super-secret".into()),
            ..AppConfig::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn new_state_is_seeded_and_mounted() {
        let state = AppState::new();
        let controller = state.controller().unwrap();
        assert_eq!(controller.sections().len(), 2);
    }

    #[test]
    fn unmounted_handle_is_unavailable() {
        let state = AppState::with_handle(ControlHandle::new(), AppConfig::default());
        assert!(matches!(
            state.controller(),
            Err(AppError::ServiceUnavailable(_))
        ));
    }
}
