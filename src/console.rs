use crate::format::{Formatter, PlainFormatter};
use crate::handler::LogHandler;
use crate::record::{Level, LogRecord};
use std::io::Write;

/// Console handler writing plain-formatted lines to stderr.
///
/// Records below the configured threshold are ignored. Write failures
/// on stderr are swallowed; there is nowhere further to report them.
pub struct ConsoleHandler {
    level: Level,
    formatter: PlainFormatter,
}

impl ConsoleHandler {
    pub fn new(level: Level) -> Self {
        ConsoleHandler {
            level,
            formatter: PlainFormatter,
        }
    }
}

impl LogHandler for ConsoleHandler {
    fn emit(&self, record: &LogRecord) {
        if record.level < self.level {
            return;
        }
        let line = self.formatter.format(record);
        let stderr = std::io::stderr();
        let mut lock = stderr.lock();
        let _ = writeln!(lock, "{line}");
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}
