//! Tracing subscriber setup.

use tracing::Level;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. File and line are only
/// reported at trace level.
pub fn init(level: Level, report_caller: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();
    let report_caller = report_caller && level == Level::TRACE;

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_file(report_caller)
                .with_line_number(report_caller),
        )
        .with(filter)
        .try_init()?;
    Ok(())
}
