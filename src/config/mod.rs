//! Locating, reading and writing `toolsmith.toml`.
//!
//! A missing file is not an error: every key has a default, so the CLI can
//! run with nothing but an API key in the environment.

pub mod schema;

pub use schema::AgentConfig;

use anyhow::{Context, Result};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the config file inside the home directory.
pub const CONFIG_FILE_NAME: &str = "toolsmith.toml";

/// Environment variable consulted when the config carries no API key.
pub const API_KEY_ENV: &str = "TOOLSMITH_API_KEY";

/// `~/.toolsmith`, or `.toolsmith` when no home directory is known.
pub fn default_home_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|d| d.home_dir().join(".toolsmith"))
        .unwrap_or_else(|| PathBuf::from(".toolsmith"))
}

pub fn config_path(home_dir: &Path) -> PathBuf {
    home_dir.join(CONFIG_FILE_NAME)
}

/// Read the config at `path`; defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<AgentConfig> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No config at {}, using defaults", path.display());
            return Ok(AgentConfig::default());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to read {}", path.display()));
        }
    };

    toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

/// Fill an empty `api_key` from the value of [`API_KEY_ENV`].
///
/// Returns whether the key was taken from the environment. A key already
/// present in the file always wins.
pub fn apply_api_key_env(config: &mut AgentConfig, env_value: Option<String>) -> bool {
    if !config.api_key.trim().is_empty() {
        return false;
    }
    match env_value.filter(|v| !v.trim().is_empty()) {
        Some(key) => {
            config.api_key = key;
            true
        }
        None => false,
    }
}

/// Write `config` to `path`, replacing any existing file.
pub fn save_config(config: &AgentConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config).context("Failed to serialize config")?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Write beside the target and rename so readers never see a partial file.
    let staging = path.with_extension("toml.tmp");
    std::fs::write(&staging, contents)
        .with_context(|| format!("Failed to write {}", staging.display()))?;
    std::fs::rename(&staging, path)
        .with_context(|| format!("Failed to move config into {}", path.display()))?;
    Ok(())
}

/// Write a default config unless one already exists. Returns whether a
/// file was created.
pub fn init_config(path: &Path) -> Result<bool> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut file = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
    {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to create {}", path.display()));
        }
    };

    let contents = toml::to_string_pretty(&AgentConfig::default())
        .context("Failed to serialize default config")?;
    file.write_all(contents.as_bytes())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.model, AgentConfig::default().model);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(&dir.path().join("nested"));
        let config = AgentConfig {
            model: "gpt-4o".into(),
            verbose: true,
            max_history_rounds: 3,
            ..AgentConfig::default()
        };
        save_config(&config, &path).unwrap();

        let loaded = load_config(&path).unwrap();
        assert_eq!(loaded.model, "gpt-4o");
        assert!(loaded.verbose);
        assert_eq!(loaded.max_history_rounds, 3);
        assert!(!path.with_extension("toml.tmp").exists());
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(dir.path());
        std::fs::write(&path, "model = [unterminated").unwrap();
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains(CONFIG_FILE_NAME));
    }

    #[test]
    fn test_init_config_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let path = config_path(dir.path());

        assert!(init_config(&path).unwrap());
        assert_eq!(load_config(&path).unwrap().max_iterations, 10);

        std::fs::write(&path, "model = \"custom\"\n").unwrap();
        assert!(!init_config(&path).unwrap());
        assert_eq!(load_config(&path).unwrap().model, "custom");
    }

    #[test]
    fn test_api_key_env_only_fills_empty_key() {
        let mut config = AgentConfig::default();
        assert!(!apply_api_key_env(&mut config, None));
        assert!(!apply_api_key_env(&mut config, Some("  ".into())));
        assert!(apply_api_key_env(&mut config, Some("sk-env".into())));
        assert_eq!(config.api_key, "sk-env");

        assert!(!apply_api_key_env(&mut config, Some("sk-other".into())));
        assert_eq!(config.api_key, "sk-env");
    }
}
