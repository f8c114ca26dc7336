//! Configuration resolution for kbchat.
//!
//! Merges ordered layers (compiled-in `default` and `<environment>` layers,
//! then a `<environment>-local.toml` override from `$APP_LOCAL_CONFIGS`)
//! into one read-only [`EffectiveConfig`], and extracts typed [`Settings`]
//! from it.

pub mod layer;
pub mod resolver;
pub mod settings;

pub use layer::{FileLayer, LayerError, LayerRegistry, LayerSource, RegistryLayer};
pub use resolver::{ConfigResolver, EffectiveConfig, LayerReport, LayerStatus, ENVIRONMENT_KEY};
pub use settings::Settings;

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration layer '{layer}' from {origin}: {reason}")]
    Parse {
        layer: String,
        origin: String,
        reason: String,
    },

    #[error("Missing required configuration key: {key}")]
    Missing { key: String },

    #[error("Configuration validation failed: {0}")]
    Invalid(String),
}
