/// Poll loop: fetch → extract → append on a fixed interval.
///
/// One tick runs to completion before the next is considered, so ticks
/// never overlap. Ctrl-C is observed only between ticks — an in-flight
/// request finishes (or hits its own timeout) before the process exits.

use std::path::Path;

use tokio::time::{Duration, interval};

use crate::config::Config;
use crate::csv_log;
use crate::error::Error;
use crate::fetch::Poller;
use crate::session;

pub async fn run(cfg: Config) {
    let poller = Poller::new(&cfg);
    let mut ticker = interval(Duration::from_secs(cfg.poll_seconds));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                // ureq and the file append both block; keep them off the
                // async runtime.
                let poller = poller.clone();
                let log_path = cfg.log_path.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || tick(&poller, Path::new(&log_path))).await;
                match outcome {
                    Ok(Ok(0)) => log::info!("No active sessions."),
                    Ok(Ok(n)) => log::info!("Logged {n} session(s)."),
                    // Transient — this tick yielded nothing, the loop carries on.
                    Ok(Err(e)) => log::error!("{e}"),
                    Err(e) => log::error!("Tick task failed: {e}"),
                }
            }
            _ = &mut shutdown => {
                log::info!("Stopped.");
                break;
            }
        }
    }
}

/// One poll cycle. Any error aborts this tick only.
fn tick(poller: &Poller, log_path: &Path) -> Result<usize, Error> {
    let doc = poller.fetch()?;
    let records = session::extract(&doc)?;
    if records.is_empty() {
        return Ok(0);
    }
    csv_log::ensure_log(log_path)?;
    csv_log::append(log_path, &records, &csv_log::now_stamp())?;
    Ok(records.len())
}
