//! Config file discovery and layered loading.
//!
//! Implements the `load()` algorithm:
//! 1. Parse embedded `defaults.toml` → base
//! 2. Merge the overlay file, when one is given and exists
//! 3. Apply `ARBOR_*` env var fallbacks for unset fields
//! 4. Deserialize merged tree → [`RuntimeConfig`]
//! 5. Validate

use std::path::Path;

use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::RuntimeConfig;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Load the runtime configuration.
///
/// `overlay` is an optional TOML file layered over the embedded defaults;
/// a missing overlay file is not an error, so embedders can point at a
/// well-known path unconditionally.
///
/// # Errors
///
/// Returns a [`ConfigError`] if any config file is malformed, or if the
/// final merged configuration fails validation.
pub fn load(overlay: Option<&Path>) -> ConfigResult<RuntimeConfig> {
    let mut merged: toml::Value =
        toml::from_str(DEFAULTS_TOML).map_err(|e| ConfigError::ParseError {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    if let Some(path) = overlay {
        if let Some(value) = try_load_file(path)? {
            deep_merge(&mut merged, &value);
            info!(path = %path.display(), "loaded config overlay");
        } else {
            debug!(path = %path.display(), "no config overlay present");
        }
    }

    apply_env_fallbacks(&mut merged);

    let config: RuntimeConfig = merged
        .try_into()
        .map_err(|e| ConfigError::Invalid(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Read and parse one TOML file, treating a missing file as `None`.
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        }
    };
    let value = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.display().to_string(),
        source: e,
    })?;
    Ok(Some(value))
}

/// Merge `overlay` into `base`, recursing through tables.
fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_value) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_table.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Environment fallbacks for the fields operators commonly override.
fn apply_env_fallbacks(merged: &mut toml::Value) {
    let Some(table) = merged.as_table_mut() else {
        return;
    };

    if let Ok(level) = std::env::var("ARBOR_LOG_LEVEL") {
        table.insert("log_level".to_owned(), toml::Value::String(level));
    }
    if let Ok(debug) = std::env::var("ARBOR_DEBUG") {
        table.insert(
            "debug".to_owned(),
            toml::Value::Boolean(matches!(debug.as_str(), "1" | "true" | "yes")),
        );
    }
    if let Ok(hardened) = std::env::var("ARBOR_HARDENED") {
        table.insert(
            "hardened".to_owned(),
            toml::Value::Boolean(matches!(hardened.as_str(), "1" | "true" | "yes")),
        );
    }
    if let Ok(root) = std::env::var("ARBOR_CACHE_ROOT") {
        if let Some(cache) = table
            .entry("cache")
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()))
            .as_table_mut()
        {
            cache.insert("root".to_owned(), toml::Value::String(root));
        }
    }
}
