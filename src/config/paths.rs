use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "FRAMESCRUB_CONFIG_DIR";

/// Default scene file name inside the config directory
pub const SCENE_FILE: &str = "scene.json";

/// Default log file name when `--log` is given without a path
pub const LOG_FILE: &str = "framescrub.log";

/// Configuration for overriding default application paths
#[derive(Debug, Clone, Default)]
pub struct PathConfig {
    /// Custom config directory (from CLI or ENV)
    pub config_dir: Option<PathBuf>,
}

impl PathConfig {
    /// Priority: CLI arg -> FRAMESCRUB_CONFIG_DIR -> None (use defaults)
    pub fn from_env_and_cli(cli_dir: Option<PathBuf>) -> Self {
        let config_dir = cli_dir.or_else(|| std::env::var(CONFIG_DIR_ENV).ok().map(PathBuf::from));
        Self { config_dir }
    }
}

/// Get path to a configuration file
///
/// Priority:
/// 1. CLI --config-dir argument
/// 2. FRAMESCRUB_CONFIG_DIR environment variable
/// 3. Current directory IF it holds scene.json or framescrub.log
/// 4. Platform config directory from dirs-next
///
/// Platform paths:
/// - Linux: ~/.config/framescrub/{name}
/// - macOS: ~/Library/Application Support/framescrub/{name}
/// - Windows: %APPDATA%\framescrub\{name}
pub fn config_file(name: &str, config: &PathConfig) -> PathBuf {
    config_dir_in(config, std::env::current_dir().ok().as_deref()).join(name)
}

/// Create the config directory if missing
pub fn ensure_dirs(config: &PathConfig) -> Result<()> {
    let dir = config_dir_in(config, std::env::current_dir().ok().as_deref());
    if !dir.exists() {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;
    }
    Ok(())
}

fn has_local_config_files(dir: &Path) -> bool {
    [SCENE_FILE, LOG_FILE].iter().any(|f| dir.join(f).exists())
}

/// Config directory, given the working directory to probe for local files
fn config_dir_in(config: &PathConfig, cwd: Option<&Path>) -> PathBuf {
    if let Some(dir) = &config.config_dir {
        return dir.clone();
    }

    if let Some(cwd) = cwd {
        if has_local_config_files(cwd) {
            return cwd.to_path_buf();
        }
    }

    if let Some(dir) = dirs_next::config_dir() {
        return dir.join("framescrub");
    }

    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_file_with_custom_dir() {
        let config = PathConfig {
            config_dir: Some(PathBuf::from("/custom")),
        };
        assert_eq!(config_file(SCENE_FILE, &config), PathBuf::from("/custom/scene.json"));
    }

    #[test]
    fn test_cli_beats_env() {
        let config = PathConfig::from_env_and_cli(Some(PathBuf::from("/from-cli")));
        assert_eq!(config.config_dir, Some(PathBuf::from("/from-cli")));
    }

    #[test]
    fn test_local_files_priority() {
        let tmp = tempfile::tempdir().unwrap();
        let config = PathConfig::default();

        let without = config_dir_in(&config, Some(tmp.path()));
        assert_ne!(without, tmp.path());

        std::fs::write(tmp.path().join(SCENE_FILE), "{}").unwrap();
        let with = config_dir_in(&config, Some(tmp.path()));
        assert_eq!(with, tmp.path());
    }

    #[test]
    fn test_platform_default_named_after_app() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = config_dir_in(&PathConfig::default(), Some(tmp.path()));
        if dirs_next::config_dir().is_some() {
            assert!(dir.ends_with("framescrub"));
        }
    }
}
