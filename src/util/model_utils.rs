use chrono::Local;
use std::path::{Path, PathBuf};

use crate::config::ForecastConfig;

/// Run identifier: local timestamp plus process id, e.g. `20240305-093012-4711`
pub fn run_id() -> String {
    format!("{}-{}", Local::now().format("%Y%m%d-%H%M%S"), std::process::id())
}

/// `<base>/<TICKER>/<run_id>`
///
/// Concurrent runs must each get their own checkpoint directory, since opening one
/// purges whatever checkpoints it already holds.
pub fn get_run_dir<P: AsRef<Path>>(base: P, ticker: &str, run_id: &str) -> PathBuf {
    base.as_ref().join(ticker.to_uppercase()).join(run_id)
}

/// Point `config` at a fresh per-run directory under its current checkpoint dir
pub fn namespaced_config(config: ForecastConfig, ticker: &str) -> ForecastConfig {
    let dir = get_run_dir(&config.checkpoint_dir, ticker, &run_id());
    config.with_checkpoint_dir(dir)
}
