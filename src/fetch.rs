/// Plex API poller: one bounded GET per tick against `/status/sessions`.

use std::time::Duration;

use serde_json::Value;

use crate::config::Config;
use crate::error::Error;

/// Bound on a single poll, covering connect, send and read.
const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Reusable session fetcher. Cheap to clone — the underlying agent shares
/// its connection pool across ticks.
#[derive(Clone)]
pub struct Poller {
    agent: ureq::Agent,
    url: String,
    token: String,
}

impl Poller {
    pub fn new(cfg: &Config) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(FETCH_TIMEOUT))
            .build()
            .into();
        Self {
            agent,
            url: format!("{}/status/sessions", cfg.base_url),
            token: cfg.token.clone(),
        }
    }

    /// Fetch the raw session document.
    ///
    /// Network failure, timeout, or a non-success status is `Transport`;
    /// a body that is not JSON is `Format`. No retry here — the poll loop
    /// retries on its next tick.
    pub fn fetch(&self) -> Result<Value, Error> {
        let body = self
            .agent
            .get(&self.url)
            .header("X-Plex-Token", self.token.as_str())
            .header("Accept", "application/json")
            .call()?
            .body_mut()
            .read_to_string()?;
        Ok(serde_json::from_str(&body)?)
    }
}
