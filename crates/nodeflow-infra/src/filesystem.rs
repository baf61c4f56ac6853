//! Data directory layout for nodeflow.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "NODEFLOW_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `NODEFLOW_DATA_DIR` environment variable
/// 2. `~/.nodeflow`
/// 3. `.nodeflow` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".nodeflow");
    }

    PathBuf::from(".nodeflow")
}

/// `{data_dir}/config.toml`
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_path_is_in_data_dir() {
        let dir = PathBuf::from("/tmp/nodeflow-test");
        assert_eq!(config_path(&dir), dir.join("config.toml"));
    }

    #[test]
    fn test_resolve_data_dir_is_not_empty() {
        // Environment-dependent; only the shape is checked.
        let dir = resolve_data_dir();
        assert!(!dir.as_os_str().is_empty());
    }
}
