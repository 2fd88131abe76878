//! Logging setup using `tracing` and `tracing-subscriber`.
//!
//! - `info`: files being parsed or generated
//! - `debug`: skipped rows and discarded header rows
//!
//! Logs go to stderr so they never mix with converted output on stdout.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging options derived from the command line.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level_filter: LevelFilter,
    /// Let `RUST_LOG` decide when no explicit level was requested.
    pub use_env_filter: bool,
    pub with_ansi: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level_filter: LevelFilter::INFO,
            use_env_filter: true,
            with_ansi: true,
        }
    }
}

/// Installs the global subscriber. Fails if one is already set.
pub fn init_logging(config: &LogConfig) -> anyhow::Result<()> {
    let filter = build_env_filter(config);
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.with_ansi)
        .with_target(false)
        .without_time();

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;

    Ok(())
}

fn build_env_filter(config: &LogConfig) -> EnvFilter {
    let explicit = || EnvFilter::new(format!("warn,waypoint_convert={}", config.level_filter));

    if config.use_env_filter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| explicit())
    } else {
        explicit()
    }
}
