use clip_core::settings::Settings;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a level name to a `tracing` filter directive.
///
/// `DEBUG`, `INFO`, `WARNING`, `ERROR` and `CRITICAL` are accepted in any
/// case; anything else is passed through unchanged for `EnvFilter` to judge.
pub fn normalise_level(log_level: &str) -> String {
    let upper = log_level.trim().to_uppercase();
    match upper.as_str() {
        "DEBUG" => "debug".to_string(),
        "INFO" => "info".to_string(),
        "WARNING" | "WARN" => "warn".to_string(),
        "ERROR" | "CRITICAL" => "error".to_string(),
        _ => log_level.trim().to_lowercase(),
    }
}

/// Install the global `tracing` subscriber.
///
/// Unrecognised levels fall back to `info`. If the host application already
/// installed a subscriber, that one is kept and this call is a no-op.
pub fn setup_logging(log_level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(normalise_level(log_level)).unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer().with_target(false).with_thread_ids(false);

    if tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .is_err()
    {
        tracing::debug!("tracing subscriber already installed");
    }
    Ok(())
}

/// [`setup_logging`] at the level configured in `settings`.
pub fn setup_logging_from(settings: &Settings) -> anyhow::Result<()> {
    setup_logging(&settings.log_level)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
