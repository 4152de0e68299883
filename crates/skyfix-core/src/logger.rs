//! Process-wide logging setup for the skyfix binaries.
//!
//! Without the `tracing` feature, [`init_with_level`] installs a stderr sink
//! for the `log` facade. Each line carries the seconds since installation,
//! the level and the emitting module:
//!
//! ```text
//! [  1.204s  INFO skyfix_tiles::fetch] fetched 25 tiles
//! ```
//!
//! With `tracing` enabled, [`init_tracing`] bridges `log` records into a
//! `tracing-subscriber` pipeline instead.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

#[cfg(feature = "tracing")]
use tracing_subscriber::fmt::format::FmtSpan;
#[cfg(feature = "tracing")]
use tracing_subscriber::util::SubscriberInitExt;
#[cfg(feature = "tracing")]
use tracing_subscriber::EnvFilter;

struct StderrLogger {
    max_level: LevelFilter,
    origin: Instant,
}

fn format_line(elapsed_s: f64, level: log::Level, target: &str, message: &fmt::Arguments<'_>) -> String {
    format!("[{elapsed_s:7.3}s {level:>5} {target}] {message}")
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = format_line(
            self.origin.elapsed().as_secs_f64(),
            record.level(),
            record.target(),
            record.args(),
        );
        let _ = writeln!(std::io::stderr().lock(), "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Route `log` records at or above `level` to stderr.
///
/// Only the first call installs the sink; later calls keep the original
/// level and return `Ok`. Fails when another `log` backend is already set.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        max_level: level,
        origin: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber and route `log` records into it.
///
/// Honours `RUST_LOG`; falls back to `default_level`.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool, default_level: LevelFilter) {
    let _ = tracing_log::LogTracer::init();
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.to_string().to_lowercase()));
    if json {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .json()
            .flatten_event(true)
            .finish()
            .try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init();
    }
}
