/// Layered configuration: optional TOML file, overridden by environment
/// variables. No config file is required to run — defaults plus a token
/// work out of the box.

use serde::Deserialize;

use crate::error::Error;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Plex server base URL, normalized to carry no trailing slash.
    pub base_url: String,
    /// X-Plex-Token credential. The only fatal config condition when absent.
    pub token: String,
    /// CSV log destination.
    pub log_path: String,
    /// Seconds between polls.
    pub poll_seconds: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:32400".into(),
            token: String::new(),
            log_path: "./plex_sessions.csv".into(),
            poll_seconds: 30,
        }
    }
}

impl Config {
    /// Load the optional TOML file, apply environment overrides, then
    /// normalize and validate.
    pub fn load() -> Result<Self, Error> {
        let mut cfg = Self::from_file();
        cfg.overlay(|key| std::env::var(key).ok());
        cfg.validate()
    }

    fn from_file() -> Self {
        let path = config_file_path();
        match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(cfg) => {
                    log::info!("Loaded config from {path}");
                    cfg
                }
                Err(e) => {
                    log::warn!("Failed to parse config file {path}: {e}. Using defaults.");
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    /// Apply environment overrides from a lookup function, so tests can
    /// feed a map instead of mutating process-wide state.
    fn overlay(&mut self, get: impl Fn(&str) -> Option<String>) {
        if let Some(url) = get("PLEX_URL") {
            self.base_url = url;
        }
        if let Some(token) = get("PLEX_TOKEN") {
            self.token = token;
        }
        if let Some(path) = get("LOG_PATH") {
            self.log_path = path;
        }
        if let Some(secs) = get("POLL_SECONDS") {
            match secs.parse() {
                Ok(n) => self.poll_seconds = n,
                Err(_) => log::warn!("Ignoring non-numeric POLL_SECONDS: {secs}"),
            }
        }
    }

    fn validate(mut self) -> Result<Self, Error> {
        self.base_url = self.base_url.trim_end_matches('/').to_string();
        if self.poll_seconds == 0 {
            log::warn!("POLL_SECONDS must be at least 1; using 30");
            self.poll_seconds = 30;
        }
        if self.token.is_empty() {
            return Err(Error::Config(
                "missing PLEX_TOKEN (set it in the environment or a .env file)",
            ));
        }
        Ok(self)
    }
}

fn config_file_path() -> String {
    std::env::var("PLEXWATCH_CONFIG").unwrap_or_else(|_| "plexwatch.toml".into())
}
