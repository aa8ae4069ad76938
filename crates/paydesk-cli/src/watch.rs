use std::sync::Arc;

use anyhow::{Result, bail};
use paydesk_config::SessionConfig;
use paydesk_session::{InactivityMonitor, MonitorConfig, MonitorHooks};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::debug;

use crate::Store;

/// Run the inactivity monitor against stdin until the session ends.
///
/// Every input line counts as user activity. `extend` answers the warning
/// prompt, `logout` ends the session explicitly.
pub async fn run(store: Arc<Store>, session: &SessionConfig) -> Result<()> {
    if !store.is_token_valid(None) {
        bail!("no valid credential; run `paydesk login` first");
    }

    let (expired_tx, mut expired_rx) = watch::channel(false);
    let hooks = MonitorHooks::evicting(Arc::clone(&store))
        .on_warning(|remaining| {
            eprintln!(
                "Your session will expire in {} minute(s) due to inactivity. Type 'extend' to stay signed in.",
                remaining.as_secs().div_ceil(60)
            );
        })
        .on_expire(move || {
            let _ = expired_tx.send(true);
        });

    let monitor = InactivityMonitor::start(MonitorConfig::from(session), hooks)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = expired_rx.changed() => {
                println!("Session expired. Please sign in again.");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => match line.trim() {
                    "extend" => {
                        if monitor.extend() {
                            println!("Session extended.");
                        }
                    }
                    "logout" => {
                        monitor.stop();
                        store.clear_all();
                        println!("Signed out.");
                        break;
                    }
                    _ => {
                        let rearmed = monitor.record_activity();
                        debug!("activity recorded (rearmed = {rearmed})");
                    }
                },
                None => {
                    monitor.stop();
                    break;
                }
            }
        }
    }

    Ok(())
}
