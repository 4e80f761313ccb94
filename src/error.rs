use thiserror::Error;

/// Errors surfaced by fallible construction and initialization paths.
///
/// Nothing on the hot logging path returns these: once a handler is
/// built, write and rollover failures are reported on stderr and the
/// offending record is dropped.
#[derive(Debug, Error)]
pub enum Error {
    /// An I/O error while creating or rotating a log file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization of a record failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Installing the global `tracing` subscriber failed because one
    /// was already set.
    #[error("failed to install global subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),

    /// The log file path has no parent directory or is otherwise unusable.
    #[error("invalid log file path: {0}")]
    InvalidPath(String),
}

/// Result type alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = Error::InvalidPath("/".to_string());
        assert_eq!(err.to_string(), "invalid log file path: /");

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
