//! Minimal stderr logger for field deployments.
//!
//! Lines look like `[ 12.345s  WARN gauge_targets_calib] message`: the
//! elapsed time since installation, the level and the emitting crate. Call
//! [`init_with_level`] once at startup; the library crates only talk to the
//! `log` facade.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use log::{Level, LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    level: LevelFilter,
    started: Instant,
}

/// Render one log line without the trailing newline.
fn format_line(elapsed: Duration, level: Level, target: &str, args: &fmt::Arguments<'_>) -> String {
    let crate_name = target.split("::").next().unwrap_or(target);
    format!(
        "[{:7.3}s {:>5} {crate_name}] {args}",
        elapsed.as_secs_f64(),
        level
    )
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(
                self.started.elapsed(),
                record.level(),
                record.target(),
                record.args(),
            );
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static LOGGER: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger with `level`.
///
/// Only the first call installs anything; later calls keep the first level.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if LOGGER.get().is_some() {
        return Ok(());
    }
    let logger = LOGGER.get_or_init(|| StderrLogger {
        level,
        started: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Install a `tracing` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Closed spans are reported with their timings. `json` switches to one JSON
/// object per event for log shippers. `log` records from the library crates
/// are bridged into the subscriber.
#[cfg(feature = "tracing")]
pub fn init_tracing(json: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);
    let installed = if json {
        builder.json().flatten_event(true).finish().try_init()
    } else {
        builder
            .with_timer(tracing_subscriber::fmt::time::Uptime::default())
            .finish()
            .try_init()
    };
    if installed.is_err() {
        log::debug!("a tracing subscriber is already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_carries_time_level_and_crate() {
        let line = format_line(
            Duration::from_millis(12_500),
            Level::Warn,
            "gauge_targets_calib::io",
            &format_args!("stored {} lines", 3),
        );
        assert_eq!(line, "[ 12.500s  WARN gauge_targets_calib] stored 3 lines");
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_with_level(LevelFilter::Info).unwrap();
        init_with_level(LevelFilter::Debug).unwrap();
        assert_eq!(log::max_level(), LevelFilter::Info);
    }
}
