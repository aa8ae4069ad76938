use paydesk_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration, usually read from `~/.paydesk/config.yml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub credentials: CredentialConfig,
    pub session: SessionConfig,
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite file holding persisted client state. Defaults to
    /// `~/.paydesk/state.db` when unset.
    pub path: Option<PathBuf>,
    /// Namespace for keys inside the store, one per dashboard deployment.
    pub origin: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: None,
            origin: "default".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    pub ttl_secs: u64,
    /// Credentials are treated as expired this long before `ttl_secs` runs out.
    pub expiry_buffer_secs: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 24 * 60 * 60,
            expiry_buffer_secs: 5 * 60,
        }
    }
}

impl CredentialConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn expiry_buffer(&self) -> Duration {
        Duration::from_secs(self.expiry_buffer_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub timeout_secs: u64,
    /// Fixed offset before the timeout at which the warning fires.
    pub warning_offset_secs: u64,
    pub activity_throttle_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 2 * 60 * 60,
            warning_offset_secs: 5 * 60,
            activity_throttle_secs: 30,
        }
    }
}

impl SessionConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn warning_offset(&self) -> Duration {
        Duration::from_secs(self.warning_offset_secs)
    }

    pub fn activity_throttle(&self) -> Duration {
        Duration::from_secs(self.activity_throttle_secs)
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.credentials.ttl_secs == 0 {
            return Err(Error::Config("credentials.ttl_secs must be > 0".into()));
        }
        if self.credentials.expiry_buffer_secs >= self.credentials.ttl_secs {
            return Err(Error::Config(format!(
                "credentials.expiry_buffer_secs ({}) must be less than ttl_secs ({})",
                self.credentials.expiry_buffer_secs, self.credentials.ttl_secs
            )));
        }
        if self.session.timeout_secs == 0 {
            return Err(Error::Config("session.timeout_secs must be > 0".into()));
        }
        if self.storage.origin.trim().is_empty() {
            return Err(Error::Config("storage.origin must not be empty".into()));
        }
        Ok(())
    }
}
