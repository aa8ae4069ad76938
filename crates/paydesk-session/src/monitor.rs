use paydesk_common::{Error, Result};
use paydesk_config::SessionConfig;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};

use crate::hooks::MonitorHooks;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    pub timeout: Duration,
    /// Fixed lead time of the warning; it does not scale with `timeout`.
    pub warning_offset: Duration,
    pub activity_throttle: Duration,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for MonitorConfig {
    fn from(config: &SessionConfig) -> Self {
        Self {
            timeout: config.timeout(),
            warning_offset: config.warning_offset(),
            activity_throttle: config.activity_throttle(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Active,
    WarningIssued,
    /// The hard timeout fired. Terminal; start a new monitor after the next login.
    Expired,
    /// Torn down by [`InactivityMonitor::stop`] or drop.
    Stopped,
}

struct Inner {
    config: MonitorConfig,
    hooks: Option<MonitorHooks>,
    state: MonitorState,
    /// Bumped on every rearm and on stop; a timer whose generation no longer
    /// matches has been superseded and must not act.
    generation: u64,
    last_accepted: Option<Instant>,
    warning_task: Option<JoinHandle<()>>,
    expiry_task: Option<JoinHandle<()>>,
    rearms: u64,
}

impl Inner {
    fn cancel_timers(&mut self) {
        if let Some(task) = self.warning_task.take() {
            task.abort();
        }
        if let Some(task) = self.expiry_task.take() {
            task.abort();
        }
    }
}

/// Idle-timeout enforcement, independent of credential expiry.
///
/// Owns a warning timer and a hard-timeout timer, both measured from the
/// last accepted activity. Dropping the monitor is equivalent to calling
/// [`InactivityMonitor::stop`].
pub struct InactivityMonitor {
    shared: Arc<Mutex<Inner>>,
    runtime: Handle,
}

impl InactivityMonitor {
    /// Arm both timers. Must be called from within a tokio runtime.
    pub fn start(config: MonitorConfig, hooks: MonitorHooks) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Session(format!("inactivity monitor needs a tokio runtime: {e}")))?;

        let monitor = Self {
            shared: Arc::new(Mutex::new(Inner {
                config,
                hooks: Some(hooks),
                state: MonitorState::Active,
                generation: 0,
                last_accepted: None,
                warning_task: None,
                expiry_task: None,
                rearms: 0,
            })),
            runtime,
        };

        {
            let mut inner = monitor.lock();
            monitor.arm(&mut inner);
        }
        info!(
            "inactivity monitor started (timeout = {}s, warning {}s before)",
            config.timeout.as_secs(),
            config.warning_offset.as_secs()
        );
        Ok(monitor)
    }

    /// Report user activity. Rearms both timers unless the previous accepted
    /// event was less than `activity_throttle` ago or a warning is pending.
    /// Returns whether the timers were rearmed.
    pub fn record_activity(&self) -> bool {
        let mut inner = self.lock();
        if inner.state != MonitorState::Active {
            return false;
        }

        let now = Instant::now();
        if let Some(last) = inner.last_accepted {
            if now.duration_since(last) < inner.config.activity_throttle {
                return false;
            }
        }

        inner.last_accepted = Some(now);
        self.arm(&mut inner);
        true
    }

    /// Restart the full timeout from now, e.g. after the user accepts the
    /// warning prompt. Returns `false` once expired or stopped.
    pub fn extend(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            MonitorState::Active | MonitorState::WarningIssued => {
                inner.state = MonitorState::Active;
                inner.last_accepted = Some(Instant::now());
                self.arm(&mut inner);
                info!("session extended");
                true
            }
            MonitorState::Expired | MonitorState::Stopped => false,
        }
    }

    /// Cancel both timers and detach the hooks. Safe to call repeatedly.
    pub fn stop(&self) {
        let mut inner = self.lock();
        inner.cancel_timers();
        inner.hooks = None;
        inner.generation += 1;
        if matches!(
            inner.state,
            MonitorState::Active | MonitorState::WarningIssued
        ) {
            inner.state = MonitorState::Stopped;
            debug!("inactivity monitor stopped");
        }
    }

    pub fn state(&self) -> MonitorState {
        self.lock().state
    }

    pub fn is_running(&self) -> bool {
        matches!(
            self.state(),
            MonitorState::Active | MonitorState::WarningIssued
        )
    }

    /// How many times the timer pair has been armed, including the initial arm.
    pub fn rearm_count(&self) -> u64 {
        self.lock().rearms
    }

    fn arm(&self, inner: &mut Inner) {
        inner.cancel_timers();
        inner.generation += 1;
        inner.rearms += 1;

        let generation = inner.generation;
        let now = Instant::now();
        let MonitorConfig {
            timeout,
            warning_offset,
            ..
        } = inner.config;

        if timeout > warning_offset {
            let at = now + (timeout - warning_offset);
            let weak = Arc::downgrade(&self.shared);
            inner.warning_task = Some(self.runtime.spawn(async move {
                sleep_until(at).await;
                fire_warning(weak, generation);
            }));
        }

        let at = now + timeout;
        let weak = Arc::downgrade(&self.shared);
        inner.expiry_task = Some(self.runtime.spawn(async move {
            sleep_until(at).await;
            fire_expiry(weak, generation);
        }));

        debug!("inactivity timers armed (generation {generation})");
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.shared)
    }
}

impl Drop for InactivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for InactivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("InactivityMonitor")
            .field("config", &inner.config)
            .field("state", &inner.state)
            .field("generation", &inner.generation)
            .finish_non_exhaustive()
    }
}

fn lock_inner(shared: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap_or_else(|e| e.into_inner())
}

fn fire_warning(shared: Weak<Mutex<Inner>>, generation: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let (callback, remaining) = {
        let mut inner = lock_inner(&shared);
        if inner.generation != generation || inner.state != MonitorState::Active {
            return;
        }
        inner.state = MonitorState::WarningIssued;
        inner.warning_task = None;
        let callback = inner.hooks.as_ref().and_then(|h| h.on_warning.clone());
        (callback, inner.config.warning_offset)
    };

    info!(
        "session idle, expiring in {}s unless extended",
        remaining.as_secs()
    );
    if let Some(callback) = callback {
        callback(remaining);
    }
}

fn fire_expiry(shared: Weak<Mutex<Inner>>, generation: u64) {
    let Some(shared) = shared.upgrade() else {
        return;
    };

    let hooks = {
        let mut inner = lock_inner(&shared);
        if inner.generation != generation
            || !matches!(
                inner.state,
                MonitorState::Active | MonitorState::WarningIssued
            )
        {
            return;
        }
        inner.state = MonitorState::Expired;
        if let Some(task) = inner.warning_task.take() {
            task.abort();
        }
        // this task is the expiry timer; let it finish on its own
        inner.expiry_task = None;
        inner.hooks.take()
    };

    info!("session expired after inactivity, clearing credentials");
    if let Some(hooks) = hooks {
        (hooks.evict)();
        if let Some(on_expire) = hooks.on_expire {
            on_expire();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn short_config() -> MonitorConfig {
        MonitorConfig {
            timeout: Duration::from_secs(600),
            warning_offset: Duration::from_secs(300),
            activity_throttle: Duration::from_secs(30),
        }
    }

    #[test]
    fn default_config_matches_dashboard_policy() {
        let config = MonitorConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(2 * 60 * 60));
        assert_eq!(config.warning_offset, Duration::from_secs(5 * 60));
        assert_eq!(config.activity_throttle, Duration::from_secs(30));
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let result = InactivityMonitor::start(short_config(), MonitorHooks::new(|| {}));
        assert!(matches!(result, Err(Error::Session(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let monitor = InactivityMonitor::start(short_config(), MonitorHooks::new(|| {})).unwrap();
        assert!(monitor.is_running());

        monitor.stop();
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(!monitor.record_activity());
        assert!(!monitor.extend());
    }

    #[tokio::test(start_paused = true)]
    async fn first_activity_is_accepted() {
        let monitor = InactivityMonitor::start(short_config(), MonitorHooks::new(|| {})).unwrap();
        assert_eq!(monitor.rearm_count(), 1);
        assert!(monitor.record_activity());
        assert_eq!(monitor.rearm_count(), 2);
    }
}
