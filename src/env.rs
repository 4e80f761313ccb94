/// Environment variable names used by this crate for convenient
/// configuration of loggers from services.
///
/// These are purely helpers; the core handler types remain decoupled
/// from environment access.

/// Logical service name carried in the structured resource envelope.
pub const LOG_ROTATE_SERVICE_NAME_ENV: &str = "LOG_ROTATE_SERVICE_NAME";

/// Deployment environment, e.g. `development` or `production`.
pub const LOG_ROTATE_ENVIRONMENT_ENV: &str = "LOG_ROTATE_ENVIRONMENT";

/// Service version string.
pub const LOG_ROTATE_SERVICE_VERSION_ENV: &str = "LOG_ROTATE_SERVICE_VERSION";

/// Path of the active log file. Empty or unset disables file output.
pub const LOG_ROTATE_FILE_ENV: &str = "LOG_ROTATE_FILE";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_or_falls_back_to_default() {
        assert_eq!(env_or("LOG_ROTATE_TEST_UNSET_VAR", "fallback"), "fallback");
    }

    #[test]
    fn env_or_reads_set_variables() {
        std::env::set_var("LOG_ROTATE_TEST_SET_VAR", "value");
        assert_eq!(env_or("LOG_ROTATE_TEST_SET_VAR", "fallback"), "value");
        std::env::remove_var("LOG_ROTATE_TEST_SET_VAR");
    }
}
