use std::{path::Path, sync::LazyLock};

use anyhow::Result;
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

pub const CLI_PREFIX: &str = "cli";
pub const DAEMON_PREFIX: &str = "daemon";

/// Diagnostic files kept per prefix.
const MAX_LOG_FILES: usize = 5;

/// Filter directives. An explicit level wins over `RUST_LOG`, which wins over `info`. Plain levels
/// are limited to this crate, a `RUST_LOG` with full directives is used as is.
fn crate_directive(log_level: Option<LevelFilter>, env_filter: Option<String>) -> String {
    let crate_name = env!("CARGO_PKG_NAME").replace("-", "_");
    if let Some(level) = log_level {
        return format!("{crate_name}={level}");
    }
    match env_filter.filter(|v| !v.trim().is_empty()) {
        Some(filter) if filter.trim().parse::<LevelFilter>().is_ok() => {
            format!("{crate_name}={}", filter.trim())
        }
        Some(filter) => filter,
        None => format!("{crate_name}=info"),
    }
}

/// Installs the global subscriber. Diagnostics always go to daily rolling files under `logs_dir`
/// and are mirrored to stdout when `show_std` is set.
pub fn enable_logging(
    prefix: &str,
    logs_dir: &Path,
    log_level: Option<LevelFilter>,
    show_std: bool,
) -> Result<()> {
    let appender = tracing_appender::rolling::Builder::new()
        .rotation(Rotation::DAILY)
        .max_log_files(MAX_LOG_FILES)
        .filename_prefix(prefix)
        .build(logs_dir)?;

    let filter = EnvFilter::new(crate_directive(log_level, std::env::var("RUST_LOG").ok()));

    let file_layer = fmt::layer()
        .with_writer(appender)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);
    let stdout_layer = show_std.then(|| {
        fmt::layer()
            .pretty()
            .with_writer(std::io::stdout)
            .with_span_events(FmtSpan::CLOSE)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;
    Ok(())
}

pub static TEST_LOGGING: LazyLock<()> = LazyLock::new(|| {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::TRACE)
        .with_test_writer()
        .pretty()
        .init()
});
