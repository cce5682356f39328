//! `log` backend writing to the serial port.

use log::{Metadata, Record, SetLoggerError};

use crate::constants::logging::MAX_LEVEL;
use crate::serial_println;

struct SerialLogger;

impl log::Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= MAX_LEVEL
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            serial_println!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Install the serial logger. Fails if a logger is already set.
pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER).map(|()| log::set_max_level(MAX_LEVEL))
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::{Level, Log};

    fn enabled(level: Level) -> bool {
        SerialLogger.enabled(&Metadata::builder().level(level).target("minios").build())
    }

    #[test]
    fn test_info_passes_debug_filtered() {
        assert!(enabled(Level::Error));
        assert!(enabled(Level::Info));
        assert!(!enabled(Level::Debug));
        assert!(!enabled(Level::Trace));
    }
}
