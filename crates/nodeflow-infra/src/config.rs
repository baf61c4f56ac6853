//! Engine configuration loader.
//!
//! Reads `config.toml` from the data directory (`~/.nodeflow/` by default)
//! and deserializes it into [`EngineConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::Path;

use nodeflow_types::config::EngineConfig;

use crate::filesystem::config_path;

/// Load engine configuration from `{data_dir}/config.toml`.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
/// - Missing keys take their default values.
pub async fn load_engine_config(data_dir: &Path) -> EngineConfig {
    let path = config_path(data_dir);

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "no config.toml found, using defaults");
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!(path = %path.display(), "failed to read config: {err}, using defaults");
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(path = %path.display(), "failed to parse config: {err}, using defaults");
            EngineConfig::default()
        }
    }
}
