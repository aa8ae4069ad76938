use chrono::{DateTime, Duration, Utc};
use paydesk_common::{Clock, Role, SystemClock};
use paydesk_db::KeyValueStore;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::roles::resolve_role;

/// Lifetime applied to every credential at storage time.
pub const DEFAULT_TTL: std::time::Duration = std::time::Duration::from_secs(24 * 60 * 60);

/// Credentials are reported expired this long before their TTL runs out, so
/// the client re-authenticates before the issuer starts rejecting the token.
pub const DEFAULT_EXPIRY_BUFFER: std::time::Duration = std::time::Duration::from_secs(5 * 60);

const CURRENT_ROLE_KEY: &str = "currentRole";
const TOKEN_KEY_PREFIX: &str = "authToken_";

/// Unscoped keys written by older dashboard builds. Cleared, never written.
const LEGACY_KEYS: [&str; 2] = ["authToken", "token"];

/// Anything that can hand out the credential for the active session.
pub trait CredentialSource {
    fn current_token(&self) -> Option<String>;
}

/// Persisted form of a credential. Times are Unix milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CredentialRecord {
    token: String,
    role: Role,
    timestamp: i64,
    expires_in: i64,
}

/// Shape used when reading back, so partial records can be detected
/// instead of failing deserialization wholesale.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    token: Option<String>,
    timestamp: Option<f64>,
    expires_in: Option<f64>,
}

/// Role-scoped credential persistence with buffered expiry.
///
/// At most one role holds a credential at a time: storing a credential for
/// one role evicts the other and moves the current-role marker. Storage
/// failures never escape; every problem reads as "no credential", which
/// callers handle by sending the user back to login.
pub struct CredentialStore<S, C = SystemClock> {
    storage: S,
    clock: C,
    ttl: Duration,
    buffer: Duration,
}

impl<S: KeyValueStore> CredentialStore<S, SystemClock> {
    pub fn new(storage: S) -> Self {
        Self::with_clock(storage, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> CredentialStore<S, C> {
    pub fn with_clock(storage: S, clock: C) -> Self {
        Self {
            storage,
            clock,
            ttl: to_chrono(DEFAULT_TTL),
            buffer: to_chrono(DEFAULT_EXPIRY_BUFFER),
        }
    }

    /// Override the TTL and expiry buffer applied to newly stored credentials.
    pub fn with_policy(mut self, ttl: std::time::Duration, buffer: std::time::Duration) -> Self {
        self.ttl = to_chrono(ttl);
        self.buffer = to_chrono(buffer);
        self
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Store a freshly issued token, replacing any session for the other role.
    pub fn set_token(&self, token: &str, role: Option<Role>) {
        let role = resolve_role(token, role);
        let record = CredentialRecord {
            token: token.to_string(),
            role,
            timestamp: self.clock.now().timestamp_millis(),
            expires_in: self.ttl.num_milliseconds(),
        };

        let serialized = match serde_json::to_string(&record) {
            Ok(serialized) => serialized,
            Err(e) => {
                warn!("failed to serialize credential record: {e}");
                return;
            }
        };

        self.evict(role.other());
        if let Err(e) = self.storage.set(&storage_key(role), &serialized) {
            warn!("failed to persist {role} credential: {e}");
        }
        self.write_current_role(role);
        info!("stored {role} credential");
    }

    /// The token for `role` (default: the current role, else merchant), or
    /// `None` when absent, malformed, or inside the expiry buffer.
    pub fn get_token(&self, role: Option<Role>) -> Option<String> {
        let role = role
            .or_else(|| self.current_role())
            .unwrap_or_default();
        self.load_valid(role).map(|(token, _)| token)
    }

    /// Evict `role`'s credential, or everything when `role` is `None`.
    pub fn remove_token(&self, role: Option<Role>) {
        match role {
            Some(role) => {
                self.evict(role);
                if self.current_role() == Some(role) {
                    self.remove_key(CURRENT_ROLE_KEY);
                }
            }
            None => {
                for role in Role::ALL {
                    self.evict(role);
                }
                self.remove_key(CURRENT_ROLE_KEY);
                for key in LEGACY_KEYS {
                    self.remove_key(key);
                }
                debug!("cleared all stored credentials");
            }
        }
    }

    pub fn is_token_valid(&self, role: Option<Role>) -> bool {
        self.get_token(role).is_some()
    }

    pub fn current_role(&self) -> Option<Role> {
        match self.storage.get(CURRENT_ROLE_KEY) {
            Ok(Some(raw)) => match raw.parse::<Role>() {
                Ok(role) => Some(role),
                Err(e) => {
                    warn!("ignoring stored current role: {e}");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("failed to read current role: {e}");
                None
            }
        }
    }

    /// Make `new_role` current, evicting the previously current role's
    /// credential. Does not store a credential for `new_role`.
    pub fn switch_role(&self, new_role: Role) {
        if let Some(current) = self.current_role() {
            if current != new_role {
                self.evict(current);
                info!("switched role from {current} to {new_role}");
            }
        }
        self.write_current_role(new_role);
    }

    /// When the credential for `role` stops being returned, if it is valid now.
    pub fn token_expires_at(&self, role: Option<Role>) -> Option<DateTime<Utc>> {
        let role = role
            .or_else(|| self.current_role())
            .unwrap_or_default();
        let (_, expires_at_ms) = self.load_valid(role)?;
        Some(DateTime::from_timestamp_millis(expires_at_ms).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// Drop every credential and the role marker. Used on inactivity timeout.
    pub fn clear_all(&self) {
        self.remove_token(None);
    }

    /// The stored token and the Unix millisecond instant it stops being usable.
    fn load_valid(&self, role: Role) -> Option<(String, i64)> {
        let key = storage_key(role);
        let raw = match self.storage.get(&key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("failed to read {role} credential: {e}");
                return None;
            }
        };

        let (token, issued_at, ttl) = match parse_record(&raw) {
            Some(parts) => parts,
            None => {
                warn!("evicting malformed {role} credential record");
                self.remove_key(&key);
                return None;
            }
        };

        let elapsed = self.clock.now().timestamp_millis().saturating_sub(issued_at);
        let usable_for = ttl.saturating_sub(self.buffer.num_milliseconds());
        if elapsed > usable_for {
            debug!("{role} credential expired, evicting");
            self.remove_key(&key);
            return None;
        }

        Some((token, issued_at.saturating_add(usable_for)))
    }

    fn evict(&self, role: Role) {
        self.remove_key(&storage_key(role));
    }

    fn remove_key(&self, key: &str) {
        if let Err(e) = self.storage.remove(key) {
            warn!("failed to remove '{key}': {e}");
        }
    }

    fn write_current_role(&self, role: Role) {
        if let Err(e) = self.storage.set(CURRENT_ROLE_KEY, role.as_str()) {
            warn!("failed to persist current role: {e}");
        }
    }
}

impl<S: KeyValueStore, C: Clock> CredentialSource for CredentialStore<S, C> {
    fn current_token(&self) -> Option<String> {
        self.get_token(None)
    }
}

impl<T: CredentialSource + ?Sized> CredentialSource for std::sync::Arc<T> {
    fn current_token(&self) -> Option<String> {
        (**self).current_token()
    }
}

fn storage_key(role: Role) -> String {
    format!("{TOKEN_KEY_PREFIX}{role}")
}

fn parse_record(raw: &str) -> Option<(String, i64, i64)> {
    let record: StoredRecord = serde_json::from_str(raw).ok()?;
    let token = record.token.filter(|t| !t.is_empty())?;
    let issued_at = record.timestamp.filter(|t| t.is_finite())? as i64;
    let ttl = record.expires_in.filter(|t| t.is_finite())? as i64;
    Some((token, issued_at, ttl))
}

fn to_chrono(duration: std::time::Duration) -> Duration {
    Duration::from_std(duration).unwrap_or(Duration::MAX)
}
