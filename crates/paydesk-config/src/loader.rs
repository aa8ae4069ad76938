use paydesk_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::model::AppConfig;

const CONFIG_DIR_NAME: &str = ".paydesk";
const CONFIG_FILE_NAME: &str = "config.yml";
const STATE_FILE_NAME: &str = "state.db";

/// Loads [`AppConfig`] from YAML and layers `PAYDESK_*` environment overrides on top.
pub struct ConfigLoader {
    config_path: PathBuf,
}

impl ConfigLoader {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config_path: default_config_dir()?.join(CONFIG_FILE_NAME),
        })
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load(&self) -> Result<AppConfig> {
        let mut config = if self.config_path.is_file() {
            info!("loading config from {}", self.config_path.display());
            let contents = std::fs::read_to_string(&self.config_path).map_err(|e| {
                Error::Config(format!(
                    "failed to read {}: {e}",
                    self.config_path.display()
                ))
            })?;
            serde_yaml::from_str(&contents).map_err(|e| {
                Error::Config(format!(
                    "invalid config in {}: {e}",
                    self.config_path.display()
                ))
            })?
        } else {
            debug!(
                "no config file at {}, using defaults",
                self.config_path.display()
            );
            AppConfig::default()
        };

        apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;

        if config.storage.path.is_none() {
            let dir = self
                .config_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            config.storage.path = Some(dir.join(STATE_FILE_NAME));
        }

        config.validate()?;
        Ok(config)
    }
}

fn default_config_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(CONFIG_DIR_NAME))
        .ok_or_else(|| Error::Config("could not determine home directory".into()))
}

/// Apply `PAYDESK_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(path) = var("PAYDESK_STORAGE_PATH") {
        config.storage.path = Some(PathBuf::from(path));
    }
    if let Some(origin) = var("PAYDESK_ORIGIN") {
        config.storage.origin = origin;
    }
    if let Some(level) = var("PAYDESK_LOG_LEVEL") {
        config.log_level = Some(level);
    }
    if let Some(raw) = var("PAYDESK_CREDENTIAL_TTL_SECS") {
        config.credentials.ttl_secs = parse_secs("PAYDESK_CREDENTIAL_TTL_SECS", &raw)?;
    }
    if let Some(raw) = var("PAYDESK_SESSION_TIMEOUT_SECS") {
        config.session.timeout_secs = parse_secs("PAYDESK_SESSION_TIMEOUT_SECS", &raw)?;
    }
    Ok(())
}

fn parse_secs(key: &str, raw: &str) -> Result<u64> {
    raw.parse::<u64>()
        .map_err(|e| Error::Config(format!("{key}: expected seconds, got '{raw}': {e}")))
}
