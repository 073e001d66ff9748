//! `log` backend writing to the PL011 console
//!
//! Every record is one console line, prefixed with its level. The print
//! level of the suite configuration becomes the max level filter.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::config::PrintLevel;
use crate::uart;

struct ConsoleLogger;

static LOGGER: ConsoleLogger = ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let tag = match record.level() {
            Level::Error => "ERR  ",
            Level::Warn => "WARN ",
            Level::Info => "",
            Level::Debug => "DBG  ",
            Level::Trace => "INFO ",
        };
        if record.level() == Level::Error {
            // Errors are logged from the fault path too.
            uart::write_fmt_nowait(format_args!("{}{}\n", tag, record.args()));
        } else {
            uart::write_fmt(format_args!("{}{}\n", tag, record.args()));
        }
    }

    fn flush(&self) {}
}

/// Installs the console logger. A second call only updates the filter.
pub fn init(level: PrintLevel) {
    let _ = log::set_logger(&LOGGER);
    set_level(level);
}

pub fn set_level(level: PrintLevel) {
    log::set_max_level(level.filter());
}

pub fn max_level() -> LevelFilter {
    log::max_level()
}
