use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::DiveError;

pub const CONFIG_FILE_NAME: &str = "dive.json";
pub const API_ROOT_ENV: &str = "DIVE_API_ROOT";
pub const DEFAULT_API_ROOT: &str = "http://localhost:8010/api/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub api_root: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub api_root: String,
    pub timeout: Duration,
    pub user_agent: String,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path` when given, otherwise `dive.json` in the working
    /// directory, then the per-user config directory, then defaults.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, DiveError> {
        let config = match path {
            Some(path) => Self::read(PathBuf::from(path))?,
            None => match Self::discover() {
                Some(found) => Self::read(found)?,
                None => Config::default(),
            },
        };
        let env_root = std::env::var(API_ROOT_ENV)
            .ok()
            .filter(|value| !value.trim().is_empty());
        Self::resolve_config(config, env_root)
    }

    pub fn resolve_config(
        config: Config,
        env_api_root: Option<String>,
    ) -> Result<ResolvedConfig, DiveError> {
        let api_root = env_api_root
            .or(config.api_root)
            .unwrap_or_else(|| DEFAULT_API_ROOT.to_string());
        let api_root = normalize_api_root(&api_root)?;

        Ok(ResolvedConfig {
            api_root,
            timeout: Duration::from_secs(config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            user_agent: config
                .user_agent
                .unwrap_or_else(|| format!("dive-client/{}", env!("CARGO_PKG_VERSION"))),
        })
    }

    fn discover() -> Option<PathBuf> {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return Some(local);
        }
        ProjectDirs::from("org", "kitware", "dive")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.exists())
    }

    fn read(path: PathBuf) -> Result<Config, DiveError> {
        let content = fs::read_to_string(&path).map_err(|_| DiveError::ConfigRead(path.clone()))?;
        serde_json::from_str(&content).map_err(|err| DiveError::ConfigParse(err.to_string()))
    }
}

fn normalize_api_root(value: &str) -> Result<String, DiveError> {
    let trimmed = value.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(DiveError::InvalidApiRoot(value.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_when_empty() {
        let resolved = ConfigLoader::resolve_config(Config::default(), None).unwrap();
        assert_eq!(resolved.api_root, DEFAULT_API_ROOT);
        assert_eq!(resolved.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert!(resolved.user_agent.starts_with("dive-client/"));
    }

    #[test]
    fn env_overrides_file() {
        let config = Config {
            api_root: Some("https://viame.kitware.com/api/v1".to_string()),
            timeout_secs: Some(5),
            user_agent: None,
        };
        let resolved =
            ConfigLoader::resolve_config(config, Some("http://127.0.0.1:8010/api/v1/".to_string()))
                .unwrap();
        assert_eq!(resolved.api_root, "http://127.0.0.1:8010/api/v1");
        assert_eq!(resolved.timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_non_http_root() {
        let config = Config {
            api_root: Some("ftp://example".to_string()),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config, None).unwrap_err();
        assert_matches!(err, DiveError::InvalidApiRoot(_));
    }
}
