//! Stderr logger for binaries and tests that embed the crate.
//!
//! Library code only uses the `log` macros; nothing is printed unless a
//! logger is installed. Lines look like `[  0.012s DEBUG nailstag::geometry] ...`.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

/// Environment variable read by [`init_from_env`].
pub const LOG_ENV_VAR: &str = "NAILSTAG_LOG";

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let elapsed = self.started.elapsed().as_secs_f64();
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(
            stderr,
            "[{:7.3}s {:>5} {}] {}",
            elapsed,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the logger with the given level.
///
/// Only the first call installs anything; later calls return `Ok(())`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_none() {
        let logger = LOGGER.get_or_init(|| StderrLogger {
            level,
            started: Instant::now(),
        });
        log::set_logger(logger)?;
        log::set_max_level(level);
    }
    Ok(())
}

/// Install the logger at the level named by `NAILSTAG_LOG` (default `warn`).
pub fn init_from_env() -> Result<(), log::SetLoggerError> {
    let level = std::env::var(LOG_ENV_VAR)
        .ok()
        .and_then(|v| parse_level(&v))
        .unwrap_or(LevelFilter::Warn);
    init_with_level(level)
}

/// Parse `off`, `error`, `warn`, `info`, `debug` or `trace` (any case).
pub fn parse_level(value: &str) -> Option<LevelFilter> {
    value.trim().parse().ok()
}
