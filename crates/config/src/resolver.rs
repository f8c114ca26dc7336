//! Configuration resolution: ordered layers, later wins.
//!
//! Standard chain: `default` → `<environment>` → `<environment>-local`,
//! then the resolved environment name is written under [`ENVIRONMENT_KEY`]
//! so no layer can shadow it.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::ConfigError;
use crate::layer::{FileLayer, LayerRegistry, LayerSource, RegistryLayer};

/// Reserved key holding the resolved environment name.
pub const ENVIRONMENT_KEY: &str = "environment";
/// Environment variable selecting the active environment.
pub const ENVIRONMENT_VAR: &str = "APP_ENV";
/// Environment variable pointing at the local-override directory.
pub const LOCAL_CONFIGS_VAR: &str = "APP_LOCAL_CONFIGS";
pub const DEFAULT_ENVIRONMENT: &str = "development";
pub const DEFAULT_LOCAL_CONFIGS: &str = "../config";

/// What happened to one layer during resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerStatus {
    /// Merged; `keys` is how many top-level keys it contributed.
    Loaded { keys: usize },
    /// Did not exist; skipped.
    Missing,
    /// Existed but failed to load; skipped.
    Failed { reason: String },
}

/// Diagnostic record for one layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerReport {
    pub name: String,
    pub origin: String,
    pub status: LayerStatus,
}

/// The merged, read-only configuration mapping.
///
/// Always contains [`ENVIRONMENT_KEY`]. Built once at startup and shared
/// by reference afterwards; there are no mutating methods.
#[derive(Debug, Clone)]
pub struct EffectiveConfig {
    values: toml::Table,
    environment: String,
    layers: Vec<LayerReport>,
}

impl EffectiveConfig {
    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn get(&self, key: &str) -> Option<&toml::Value> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(toml::Value::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn values(&self) -> &toml::Table {
        &self.values
    }

    /// Per-layer diagnostics in merge order.
    pub fn layers(&self) -> &[LayerReport] {
        &self.layers
    }

    /// A copy of the mapping with secret-looking values masked.
    pub fn redacted(&self) -> toml::Table {
        self.values
            .iter()
            .map(|(k, v)| {
                let v = if is_secret_key(k) {
                    toml::Value::String("[REDACTED]".into())
                } else {
                    v.clone()
                };
                (k.clone(), v)
            })
            .collect()
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    ["secret", "token", "password"]
        .iter()
        .any(|needle| key.contains(needle))
}

/// Merges an ordered list of layer sources into an [`EffectiveConfig`].
pub struct ConfigResolver {
    environment: String,
    layers: Vec<Box<dyn LayerSource>>,
    strict: bool,
}

impl ConfigResolver {
    /// A resolver over an explicit layer list.
    pub fn new(environment: impl Into<String>, layers: Vec<Box<dyn LayerSource>>) -> Self {
        Self {
            environment: environment.into(),
            layers,
            strict: false,
        }
    }

    /// The standard chain for `environment`, with local overrides in `local_dir`.
    pub fn standard(
        environment: impl Into<String>,
        local_dir: &Path,
        registry: Arc<LayerRegistry>,
    ) -> Self {
        let environment = environment.into();
        let layers: Vec<Box<dyn LayerSource>> = vec![
            Box::new(RegistryLayer::new("default", registry.clone())),
            Box::new(RegistryLayer::new(environment.clone(), registry)),
            Box::new(FileLayer::local_override(local_dir, &environment)),
        ];
        Self::new(environment, layers)
    }

    /// The standard chain driven by `APP_ENV` and `APP_LOCAL_CONFIGS`.
    pub fn from_env() -> Self {
        Self::for_environment(environment_from_env())
    }

    /// The standard chain for an explicit environment, with the local
    /// directory still taken from `APP_LOCAL_CONFIGS`.
    pub fn for_environment(environment: impl Into<String>) -> Self {
        Self::standard(
            environment,
            &local_configs_dir(),
            Arc::new(LayerRegistry::builtin()),
        )
    }

    /// Treat a layer that exists but fails to parse as fatal.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    /// Merge all layers in order.
    ///
    /// Missing layers are skipped with a warning. A failing layer is logged
    /// and skipped, unless the resolver is strict, in which case it aborts
    /// with [`ConfigError::Parse`].
    pub fn resolve(&self) -> Result<EffectiveConfig, ConfigError> {
        let mut values = toml::Table::new();
        let mut reports = Vec::with_capacity(self.layers.len());

        for layer in &self.layers {
            let status = match layer.load() {
                Ok(Some(table)) => {
                    let keys = table.len();
                    debug!(layer = %layer.name(), keys, "Merging configuration layer");
                    values.extend(table);
                    LayerStatus::Loaded { keys }
                }
                Ok(None) => {
                    warn!(layer = %layer.name(), origin = %layer.origin(), "Configuration layer not found");
                    LayerStatus::Missing
                }
                Err(e) => {
                    error!(layer = %layer.name(), origin = %layer.origin(), error = %e, "Error loading configuration layer");
                    if self.strict {
                        return Err(ConfigError::Parse {
                            layer: layer.name().to_string(),
                            origin: layer.origin(),
                            reason: e.reason,
                        });
                    }
                    LayerStatus::Failed { reason: e.reason }
                }
            };
            reports.push(LayerReport {
                name: layer.name().to_string(),
                origin: layer.origin(),
                status,
            });
        }

        values.insert(
            ENVIRONMENT_KEY.into(),
            toml::Value::String(self.environment.clone()),
        );

        let loaded = reports
            .iter()
            .filter(|r| matches!(r.status, LayerStatus::Loaded { .. }))
            .count();
        info!(environment = %self.environment, loaded, total = reports.len(), "Configuration resolved");

        Ok(EffectiveConfig {
            values,
            environment: self.environment.clone(),
            layers: reports,
        })
    }
}

/// `APP_ENV`, or `development` when unset or blank.
pub fn environment_from_env() -> String {
    std::env::var(ENVIRONMENT_VAR)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string())
}

/// `APP_LOCAL_CONFIGS`, or `../config`.
pub fn local_configs_dir() -> PathBuf {
    std::env::var(LOCAL_CONFIGS_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_LOCAL_CONFIGS))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(layers: &[(&str, &str)]) -> Arc<LayerRegistry> {
        let mut registry = LayerRegistry::new();
        for (name, body) in layers {
            registry.insert(*name, *body);
        }
        Arc::new(registry)
    }

    #[test]
    fn later_layers_overwrite_earlier_keys() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("staging-local.toml"), "region = \"eu-west-1\"\n").unwrap();
        let reg = registry(&[
            ("default", "region = \"us-west-2\"\nmodel_id = \"base\"\n"),
            ("staging", "model_id = \"staging-model\"\n"),
        ]);

        let config = ConfigResolver::standard("staging", dir.path(), reg)
            .resolve()
            .unwrap();

        assert_eq!(config.get_str("region"), Some("eu-west-1"));
        assert_eq!(config.get_str("model_id"), Some("staging-model"));
        assert_eq!(config.environment(), "staging");
    }

    #[test]
    fn environment_key_cannot_be_shadowed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("qa-local.toml"),
            "environment = \"production\"\n",
        )
        .unwrap();
        let reg = registry(&[
            ("default", "environment = \"default\"\n"),
            ("qa", "environment = \"other\"\n"),
        ]);

        let config = ConfigResolver::standard("qa", dir.path(), reg).resolve().unwrap();

        assert_eq!(config.get_str(ENVIRONMENT_KEY), Some("qa"));
    }

    #[test]
    fn missing_layers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&[("default", "region = \"us-east-1\"\n")]);

        let config = ConfigResolver::standard("nowhere", dir.path(), reg)
            .resolve()
            .unwrap();

        let keys: Vec<&String> = config.values().keys().collect();
        assert_eq!(keys, vec!["environment", "region"]);
        assert_eq!(config.layers()[0].status, LayerStatus::Loaded { keys: 1 });
        assert_eq!(config.layers()[1].status, LayerStatus::Missing);
        assert_eq!(config.layers()[2].status, LayerStatus::Missing);
    }

    #[test]
    fn all_layers_missing_still_resolves() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigResolver::standard("dev", dir.path(), registry(&[]))
            .resolve()
            .unwrap();
        assert_eq!(config.values().len(), 1);
        assert_eq!(config.get_str(ENVIRONMENT_KEY), Some("dev"));
    }

    #[test]
    fn failed_layer_is_skipped_when_lenient() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dev-local.toml"), "region = = broken").unwrap();
        let reg = registry(&[("default", "region = \"us-west-2\"\n")]);

        let config = ConfigResolver::standard("dev", dir.path(), reg).resolve().unwrap();

        assert_eq!(config.get_str("region"), Some("us-west-2"));
        assert!(matches!(config.layers()[2].status, LayerStatus::Failed { .. }));
    }

    #[test]
    fn failed_layer_is_fatal_when_strict() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("dev-local.toml"), "region = = broken").unwrap();
        let reg = registry(&[("default", "region = \"us-west-2\"\n")]);

        let err = ConfigResolver::standard("dev", dir.path(), reg)
            .strict(true)
            .resolve()
            .unwrap_err();

        assert!(matches!(err, ConfigError::Parse { ref layer, .. } if layer == "dev-local"));
    }

    #[test]
    fn merge_replaces_nested_tables_wholesale() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&[
            ("default", "[endpoints]\nsts = \"a\"\nruntime = \"b\"\n"),
            ("dev", "[endpoints]\nsts = \"c\"\n"),
        ]);

        let config = ConfigResolver::standard("dev", dir.path(), reg).resolve().unwrap();

        let endpoints = config.get("endpoints").and_then(|v| v.as_table()).unwrap();
        assert_eq!(endpoints.len(), 1);
        assert_eq!(endpoints["sts"].as_str(), Some("c"));
    }

    #[test]
    fn redaction_masks_secrets() {
        let dir = tempfile::tempdir().unwrap();
        let reg = registry(&[(
            "default",
            "aws_access_key_id = \"AKIDEXAMPLE\"\naws_secret_access_key = \"shh\"\naws_session_token = \"tok\"\n",
        )]);

        let config = ConfigResolver::standard("dev", dir.path(), reg).resolve().unwrap();
        let redacted = config.redacted();

        assert_eq!(redacted["aws_access_key_id"].as_str(), Some("AKIDEXAMPLE"));
        assert_eq!(redacted["aws_secret_access_key"].as_str(), Some("[REDACTED]"));
        assert_eq!(redacted["aws_session_token"].as_str(), Some("[REDACTED]"));
    }

    #[test]
    fn local_configs_default_to_parent_config_dir() {
        if std::env::var(LOCAL_CONFIGS_VAR).is_err() {
            assert_eq!(local_configs_dir(), PathBuf::from(DEFAULT_LOCAL_CONFIGS));
            assert_eq!(DEFAULT_LOCAL_CONFIGS, "../config");
        }
    }

    #[test]
    fn shipped_local_override_example_is_a_valid_layer() {
        let example = include_str!("../../../config/development-local.toml.example");
        assert!(example.contains("../config"));

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("development-local.toml"), example).unwrap();
        let config = ConfigResolver::standard("development", dir.path(), registry(&[]))
            .strict(true)
            .resolve()
            .unwrap();
        assert_eq!(config.get_str("knowledge_base_id"), Some("KBEXAMPLE01"));
    }
}
