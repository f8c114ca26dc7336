//! Layer sources — where configuration layers come from.
//!
//! A layer is either looked up by name in a compiled-in registry or read
//! from a TOML file in an external directory. Both report "not found" as
//! `Ok(None)`; only a layer that exists but cannot be read or parsed is an
//! error.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Layers compiled into the binary, keyed by name.
const BUILTIN_LAYERS: &[(&str, &str)] = &[
    ("default", include_str!("../layers/default.toml")),
    ("development", include_str!("../layers/development.toml")),
    ("production", include_str!("../layers/production.toml")),
];

/// A layer that exists but could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct LayerError {
    pub reason: String,
}

/// One named source of configuration key/value pairs.
pub trait LayerSource: Send + Sync {
    /// The layer name (e.g., "default", "development-local").
    fn name(&self) -> &str;

    /// Where the layer is looked up, for diagnostics.
    fn origin(&self) -> String;

    /// Load the layer. `Ok(None)` means the layer does not exist.
    fn load(&self) -> Result<Option<toml::Table>, LayerError>;
}

/// Named layer bodies available without touching the filesystem.
#[derive(Debug, Clone, Default)]
pub struct LayerRegistry {
    layers: BTreeMap<String, String>,
}

impl LayerRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The registry shipped with the binary.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for (name, body) in BUILTIN_LAYERS {
            registry.insert(*name, *body);
        }
        registry
    }

    /// Register (or replace) a layer body.
    pub fn insert(&mut self, name: impl Into<String>, body: impl Into<String>) {
        self.layers.insert(name.into(), body.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.layers.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }
}

/// Lookup-by-name against a [`LayerRegistry`].
pub struct RegistryLayer {
    name: String,
    registry: Arc<LayerRegistry>,
}

impl RegistryLayer {
    pub fn new(name: impl Into<String>, registry: Arc<LayerRegistry>) -> Self {
        Self {
            name: name.into(),
            registry,
        }
    }
}

impl LayerSource for RegistryLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> String {
        format!("registry:{}", self.name)
    }

    fn load(&self) -> Result<Option<toml::Table>, LayerError> {
        match self.registry.get(&self.name) {
            Some(body) => parse_layer(body).map(Some),
            None => Ok(None),
        }
    }
}

/// A TOML file at a fixed path.
pub struct FileLayer {
    name: String,
    path: PathBuf,
}

impl FileLayer {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// The local-override layer for `environment` inside `dir`:
    /// `<dir>/<environment>-local.toml`.
    pub fn local_override(dir: &Path, environment: &str) -> Self {
        let name = format!("{environment}-local");
        let path = dir.join(format!("{name}.toml"));
        Self::new(name, path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LayerSource for FileLayer {
    fn name(&self) -> &str {
        &self.name
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Option<toml::Table>, LayerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path).map_err(|e| LayerError {
            reason: format!("cannot read {}: {e}", self.path.display()),
        })?;
        parse_layer(&content).map(Some)
    }
}

fn parse_layer(body: &str) -> Result<toml::Table, LayerError> {
    body.parse::<toml::Table>().map_err(|e| LayerError {
        reason: e.to_string(),
    })
}
