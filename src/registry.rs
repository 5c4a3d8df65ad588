//! Backend and Plugin Registries
//!
//! Static lookup tables resolving CLI identifiers such as
//! `--backend google-batch` or `--plugin oncoanalyser` to implementations.
//! Both registries are initialized once at startup; an unknown key fails
//! with a message enumerating the registered alternatives.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::error::{LaunchError, Result};
use crate::plugins::{OncoanalyserPlugin, Plugin};

/// Supported cloud batch backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    GoogleBatch,
}

static BACKEND_REGISTRY: Lazy<BTreeMap<&'static str, BackendKind>> =
    Lazy::new(|| BTreeMap::from([("google-batch", BackendKind::GoogleBatch)]));

type PluginFactory = fn() -> Box<dyn Plugin>;

static PLUGIN_REGISTRY: Lazy<BTreeMap<&'static str, PluginFactory>> = Lazy::new(|| {
    let mut registry: BTreeMap<&'static str, PluginFactory> = BTreeMap::new();
    registry.insert("oncoanalyser", || Box::new(OncoanalyserPlugin));
    registry
});

fn available(keys: impl Iterator<Item = &'static str>) -> String {
    keys.map(|k| format!("'{}'", k)).collect::<Vec<_>>().join(", ")
}

/// Resolves a backend identifier to its implementation kind.
pub fn resolve_backend(key: &str) -> Result<BackendKind> {
    BACKEND_REGISTRY.get(key).copied().ok_or_else(|| {
        LaunchError::validation(format!(
            "Unknown backend: '{}'. Available backends: [{}]",
            key,
            available(BACKEND_REGISTRY.keys().copied())
        ))
    })
}

/// Resolves a plugin identifier to a fresh plugin instance.
pub fn resolve_plugin(key: &str) -> Result<Box<dyn Plugin>> {
    PLUGIN_REGISTRY.get(key).map(|factory| factory()).ok_or_else(|| {
        LaunchError::validation(format!(
            "Unknown plugin: '{}'. Available plugins: [{}]",
            key,
            available(PLUGIN_REGISTRY.keys().copied())
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_backend_resolves() {
        assert_eq!(resolve_backend("google-batch").unwrap(), BackendKind::GoogleBatch);
    }

    #[test]
    fn test_unknown_backend_enumerates_options() {
        let err = resolve_backend("aws-batch").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unknown backend: 'aws-batch'"));
        assert!(msg.contains("'google-batch'"));
    }

    #[test]
    fn test_known_plugin_resolves() {
        assert!(resolve_plugin("oncoanalyser").is_ok());
    }

    #[test]
    fn test_unknown_plugin_enumerates_options() {
        let err = resolve_plugin("variantcaller").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Unknown plugin: 'variantcaller'"));
        assert!(msg.contains("'oncoanalyser'"));
    }
}
