use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Maps a configured level name to a tracing level; unknown names fall back to `warn`.
pub fn parse_level(level: Option<&str>) -> Level {
    match level.map(|l| l.trim().to_lowercase()).as_deref() {
        Some("trace") => Level::TRACE,
        Some("debug") => Level::DEBUG,
        Some("info") => Level::INFO,
        Some("error") => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Installs the global subscriber. Logs go to stderr so `--json` output stays clean.
pub fn init(level: Option<&str>, verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { parse_level(level) };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}
