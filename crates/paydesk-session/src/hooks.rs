use paydesk_common::Clock;
use paydesk_db::KeyValueStore;
use paydesk_security::CredentialStore;
use std::sync::Arc;
use std::time::Duration;

pub type SessionCallback = Arc<dyn Fn() + Send + Sync>;

/// Receives the time left before the hard timeout.
pub type WarningCallback = Arc<dyn Fn(Duration) + Send + Sync>;

/// Callbacks the monitor drives. `evict` always runs before `on_expire`.
#[derive(Clone)]
pub struct MonitorHooks {
    pub(crate) evict: SessionCallback,
    pub(crate) on_warning: Option<WarningCallback>,
    pub(crate) on_expire: Option<SessionCallback>,
}

impl MonitorHooks {
    pub fn new(evict: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            evict: Arc::new(evict),
            on_warning: None,
            on_expire: None,
        }
    }

    /// Hooks that clear every credential in `store` on timeout.
    pub fn evicting<S, C>(store: Arc<CredentialStore<S, C>>) -> Self
    where
        S: KeyValueStore + 'static,
        C: Clock + 'static,
    {
        Self::new(move || store.clear_all())
    }

    /// Called once per armed timer pair, `warning_offset` before timeout.
    /// Expected to prompt the user and call [`crate::InactivityMonitor::extend`].
    pub fn on_warning(mut self, callback: impl Fn(Duration) + Send + Sync + 'static) -> Self {
        self.on_warning = Some(Arc::new(callback));
        self
    }

    /// Called after eviction; expected to send the user to the login page.
    pub fn on_expire(mut self, callback: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_expire = Some(Arc::new(callback));
        self
    }
}

impl std::fmt::Debug for MonitorHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHooks")
            .field("on_warning", &self.on_warning.is_some())
            .field("on_expire", &self.on_expire.is_some())
            .finish_non_exhaustive()
    }
}
