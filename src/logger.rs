use crate::console::ConsoleHandler;
use crate::error::Result;
use crate::format::{Formatter, OtlpFormatter, PlainFormatter};
use crate::handler::LogHandler;
use crate::record::{Level, LogRecord};
use crate::rotating::{RotatingFileHandler, RotationPolicy};
use crate::sanitize::sanitize_extra;
use chrono::Utc;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::panic::Location;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

/// Configuration accepted by [`setup_logger`].
///
/// **Fields**
/// - `log_file_path`: target of the rotating file handler; `None`
///   disables file output entirely.
/// - `log_level_console` / `log_level_files`: per-handler thresholds.
/// - `use_structured_format`: render file output as OTLP-style JSON
///   lines instead of plain text.
/// - `service_name`, `environment`, `service_version`: service
///   identity carried in the structured envelope.
/// - `rotation_size_bytes` / `rotation_interval`: rollover thresholds,
///   zero disables the respective trigger.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    pub log_file_path: Option<PathBuf>,
    pub log_level_console: Level,
    pub log_level_files: Level,
    pub use_structured_format: bool,
    pub service_name: String,
    pub environment: String,
    pub service_version: String,
    pub rotation_size_bytes: u64,
    pub rotation_interval: Duration,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            log_file_path: None,
            log_level_console: Level::Info,
            log_level_files: Level::Debug,
            use_structured_format: false,
            service_name: "unknown-service".to_string(),
            environment: "development".to_string(),
            service_version: "0.0.0".to_string(),
            rotation_size_bytes: 20 * 1024 * 1024,
            rotation_interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl LoggerConfig {
    /// Defaults with service identity and file path overridden from
    /// the environment, where set. See [`crate::env`] for the
    /// recognized variable names.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.service_name =
            crate::env::env_or(crate::env::LOG_ROTATE_SERVICE_NAME_ENV, &config.service_name);
        config.environment =
            crate::env::env_or(crate::env::LOG_ROTATE_ENVIRONMENT_ENV, &config.environment);
        config.service_version = crate::env::env_or(
            crate::env::LOG_ROTATE_SERVICE_VERSION_ENV,
            &config.service_version,
        );
        if let Ok(path) = std::env::var(crate::env::LOG_ROTATE_FILE_ENV) {
            if !path.is_empty() {
                config.log_file_path = Some(PathBuf::from(path));
            }
        }
        config
    }
}

/// Named logger fanning records out to a set of handlers.
///
/// Obtained from [`setup_logger`]; the same name always resolves to
/// the same instance. Every entry point accepts an optional mapping of
/// extra fields which is routed through the reserved-key sanitizer
/// before it is attached to the record.
pub struct Logger {
    name: String,
    service_name: Option<String>,
    handlers: Vec<Arc<dyn LogHandler>>,
    /// Marks that extra metadata passed to this logger's entry points
    /// is sanitized. Set at most once per instance no matter how often
    /// the logger is requested by name.
    sanitizes_extra: AtomicBool,
}

impl Logger {
    /// Assemble a logger directly from handlers. [`setup_logger`] is
    /// the usual entry point; this is the seam for custom handler
    /// stacks and tests.
    pub fn new(
        name: impl Into<String>,
        handlers: Vec<Arc<dyn LogHandler>>,
        service_name: Option<String>,
    ) -> Self {
        Logger {
            name: name.into(),
            service_name,
            handlers,
            sanitizes_extra: AtomicBool::new(false),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Turn on extra-field sanitization for this logger's entry
    /// points. Returns `true` only the first time; the flag guards
    /// against applying the wrapping twice.
    pub fn enable_sanitization(&self) -> bool {
        !self.sanitizes_extra.swap(true, Ordering::SeqCst)
    }

    pub fn sanitizes_extra(&self) -> bool {
        self.sanitizes_extra.load(Ordering::SeqCst)
    }

    #[track_caller]
    pub fn debug(&self, message: &str, extra: Option<&Value>) {
        self.log(Level::Debug, message, extra);
    }

    #[track_caller]
    pub fn info(&self, message: &str, extra: Option<&Value>) {
        self.log(Level::Info, message, extra);
    }

    #[track_caller]
    pub fn warning(&self, message: &str, extra: Option<&Value>) {
        self.log(Level::Warning, message, extra);
    }

    #[track_caller]
    pub fn error(&self, message: &str, extra: Option<&Value>) {
        self.log(Level::Error, message, extra);
    }

    #[track_caller]
    pub fn critical(&self, message: &str, extra: Option<&Value>) {
        self.log(Level::Critical, message, extra);
    }

    /// Generic leveled entry point.
    ///
    /// `extra` must be a JSON object (or `None`/`Null` for "no extra
    /// fields"). Anything else cannot be merged into a record; the
    /// failure is reported on stderr and the call becomes a no-op
    /// rather than disturbing the caller's control flow.
    #[track_caller]
    pub fn log(&self, level: Level, message: &str, extra: Option<&Value>) {
        let caller = Location::caller();

        let fields = match extra {
            None | Some(Value::Null) => BTreeMap::new(),
            Some(value) => {
                let sanitized = if self.sanitizes_extra.load(Ordering::Relaxed) {
                    sanitize_extra(value)
                } else {
                    value.clone()
                };
                match sanitized {
                    Value::Object(map) => map.into_iter().collect(),
                    other => {
                        eprintln!(
                            "logger {}: extra must be a mapping, got {other}; record dropped",
                            self.name
                        );
                        return;
                    }
                }
            }
        };

        let record = LogRecord {
            timestamp: Utc::now(),
            level,
            target: self.name.clone(),
            module_path: None,
            file: Some(caller.file().to_string()),
            line: Some(caller.line()),
            message: message.to_string(),
            fields,
            service_name: self.service_name.clone(),
        };

        for handler in &self.handlers {
            handler.emit(&record);
        }
    }
}

static REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Logger>>>> = OnceLock::new();

/// Build (or fetch) the named logger.
///
/// **Parameters**
/// - `name`: logger name, also used as the record target.
/// - `config`: [`LoggerConfig`] describing handlers, thresholds,
///   service identity and rotation policy.
///
/// **Behavior**
///
/// Idempotent per name: the first call assembles the handler chain
/// (console always; a rotating file handler when `log_file_path` is
/// set, using the OTLP formatter when `use_structured_format` is on)
/// and enables extra-field sanitization; every later call with the
/// same name returns the same instance untouched, so sanitization is
/// applied exactly once no matter how often the logger is requested.
pub fn setup_logger(name: &str, config: &LoggerConfig) -> Result<Arc<Logger>> {
    let registry = REGISTRY.get_or_init(|| Mutex::new(HashMap::new()));
    let mut loggers = registry.lock();

    if let Some(existing) = loggers.get(name) {
        existing.enable_sanitization();
        return Ok(Arc::clone(existing));
    }

    let mut handlers: Vec<Arc<dyn LogHandler>> =
        vec![Arc::new(ConsoleHandler::new(config.log_level_console))];

    if let Some(path) = &config.log_file_path {
        let formatter: Box<dyn Formatter> = if config.use_structured_format {
            Box::new(OtlpFormatter::new(
                &config.service_name,
                &config.environment,
                &config.service_version,
            ))
        } else {
            Box::new(PlainFormatter)
        };
        let policy = RotationPolicy {
            max_bytes: config.rotation_size_bytes,
            interval: config.rotation_interval,
        };
        handlers.push(Arc::new(RotatingFileHandler::new(
            path,
            policy,
            formatter,
            config.log_level_files,
        )?));
    }

    let service_name = if config.service_name.is_empty() {
        None
    } else {
        Some(config.service_name.clone())
    };

    let logger = Arc::new(Logger::new(name, handlers, service_name));
    logger.enable_sanitization();
    loggers.insert(name.to_string(), Arc::clone(&logger));
    Ok(logger)
}
