use crate::handler::LogHandler;
use crate::record::LogRecord;

/// A handler that simply drops all records.
///
/// Useful for measuring the overhead of record construction without
/// any I/O, and for unit tests that don't care about persistence.
#[derive(Clone, Default)]
pub struct NoopHandler;

impl LogHandler for NoopHandler {
    fn emit(&self, _record: &LogRecord) {}
}
