pub mod hooks;
pub mod monitor;

pub use hooks::{MonitorHooks, SessionCallback, WarningCallback};
pub use monitor::{InactivityMonitor, MonitorConfig, MonitorState};
