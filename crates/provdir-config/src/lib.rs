//! Exporter configuration for the provider directory pipeline.
//!
//! Settings are a tree of TOML tables addressed by dotted keys
//! (`exporter.fhir_r4.target_server_base_url`). They are assembled from layers:
//!
//! 1. Defaults - packaged `resources/provdir.toml`
//! 2. `conf/provdir.toml` under the search root
//! 3. `../conf/provdir.toml` under the search root
//!
//! Later layers deep-merge over earlier ones. The result is an immutable [`Settings`]
//! snapshot; runtime overrides produce a new snapshot with a bumped version, and
//! [`SettingsStore`] publishes the current snapshot for concurrent readers.

pub mod keys;
pub mod loader;
pub mod merger;
pub mod settings;
pub mod store;

pub use loader::SettingsLoader;
pub use merger::{ConfigSource, Layer};
pub use settings::Settings;
pub use store::SettingsStore;

/// Error types for configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
