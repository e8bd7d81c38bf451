mod config;
mod csv_log;
mod error;
mod fetch;
mod poll;
mod session;

use std::path::Path;

#[tokio::main]
async fn main() {
    // .env is optional; real environment variables win either way.
    dotenvy::dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cfg = match config::Config::load() {
        Ok(cfg) => cfg,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(1);
        }
    };

    log::info!(
        "Polling {} every {}s. Logging to {}.",
        cfg.base_url,
        cfg.poll_seconds,
        cfg.log_path
    );

    // Create the log up front so the header exists before the first append.
    // Not fatal on failure — the appender re-ensures every tick, so a log
    // directory that appears later still recovers.
    if let Err(e) = csv_log::ensure_log(Path::new(&cfg.log_path)) {
        log::warn!("Could not create log file {}: {e}", cfg.log_path);
    }

    poll::run(cfg).await;
}
