use crate::error::Result;
use crate::format::{Formatter, OtlpFormatter, PlainFormatter};
use crate::handler::LogHandler;
use crate::layer::RotatingFileLayer;
use crate::logger::LoggerConfig;
use crate::noop_handler::NoopHandler;
use crate::record::Level;
use crate::rotating::{RotatingFileHandler, RotationPolicy};
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;

fn console_filter(level: Level) -> LevelFilter {
    match level {
        Level::Debug => LevelFilter::DEBUG,
        Level::Info => LevelFilter::INFO,
        Level::Warning => LevelFilter::WARN,
        Level::Error | Level::Critical => LevelFilter::ERROR,
    }
}

/// Build the file handler described by the config, or a [`NoopHandler`]
/// when no file path is configured.
fn build_file_handler(config: &LoggerConfig) -> Result<Arc<dyn LogHandler>> {
    let Some(path) = &config.log_file_path else {
        return Ok(Arc::new(NoopHandler));
    };

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
    Ok(Arc::new(RotatingFileHandler::new(
        path,
        policy,
        formatter,
        config.log_level_files,
    )?))
}

/// Initialize the global `tracing` subscriber from a [`LoggerConfig`].
///
/// **Parameters**
/// - `config`: [`LoggerConfig`] controlling the file handler, rotation
///   policy, structured format and console threshold.
///
/// **Effects**
///
/// Installs a [`Registry`] combined with [`RotatingFileLayer`] as the
/// global default subscriber, so all `tracing` events in the process
/// flow into the rotating file (and, via a `fmt` layer at the console
/// threshold, to the console).
///
/// **Returns**
/// - `Err(..)` if a global subscriber was already installed or the log
///   file could not be opened.
pub fn init_tracing_with_config(config: &LoggerConfig) -> Result<()> {
    let handler = build_file_handler(config)?;
    let service_name = if config.service_name.is_empty() {
        None
    } else {
        Some(config.service_name.clone())
    };
    let layer = RotatingFileLayer::new(handler, config.log_level_files, service_name);

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(console_filter(config.log_level_console));
    let subscriber = Registry::default().with(layer).with(fmt_layer);
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

/// Initialize tracing with sensible defaults.
///
/// Equivalent to calling [`init_tracing_with_config`] with
/// [`LoggerConfig::default`]: console output only, no file handler.
pub fn init_tracing() -> Result<()> {
    init_tracing_with_config(&LoggerConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_filter_maps_levels() {
        assert_eq!(console_filter(Level::Debug), LevelFilter::DEBUG);
        assert_eq!(console_filter(Level::Warning), LevelFilter::WARN);
        assert_eq!(console_filter(Level::Critical), LevelFilter::ERROR);
    }

    #[test]
    fn build_file_handler_without_path_is_noop() {
        let handler = build_file_handler(&LoggerConfig::default());
        assert!(handler.is_ok());
    }

    #[test]
    fn build_file_handler_opens_configured_file() {
        let dir = tempfile::TempDir::new().expect("temp dir");
        let config = LoggerConfig {
            log_file_path: Some(dir.path().join("init.log")),
            ..LoggerConfig::default()
        };
        let handler = build_file_handler(&config);
        assert!(handler.is_ok());
        assert!(dir.path().join("init.log").exists());
    }
}
