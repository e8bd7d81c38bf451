/// Error taxonomy for the watchdog.
///
/// Only `Config` is fatal (checked once at startup). Every other class is
/// recovered at the tick boundary: the poll loop logs it, counts the tick
/// as zero records, and carries on.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable configuration. Terminates the process before
    /// the loop starts.
    #[error("configuration: {0}")]
    Config(&'static str),

    /// Network failure, timeout, or non-success HTTP status.
    #[error("request failed: {0}")]
    Transport(#[from] ureq::Error),

    /// Response body is not parseable JSON.
    #[error("unparseable response: {0}")]
    Format(#[from] serde_json::Error),

    /// Parsed fine but the document structure is nonsense (top level is
    /// not a JSON object). Same recovery as `Format`.
    #[error("unexpected response shape: {0}")]
    Shape(&'static str),

    /// Log file inaccessible or a write failed. The log may lag a tick;
    /// the process stays alive.
    #[error("log write failed: {0}")]
    Write(#[from] std::io::Error),
}
