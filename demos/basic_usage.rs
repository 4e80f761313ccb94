use serde_json::json;
use tracing_log_rotate::logger::{setup_logger, LoggerConfig};
use tracing_log_rotate::record::Level;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Console-only logger with default settings.
    let logger = setup_logger("basic_example", &LoggerConfig::default())?;

    logger.info("This is an info message", None);
    logger.warning("This is a warning message", None);
    logger.error("This is an error message", None);

    // Logger with a custom log file and different thresholds for
    // console and file output.
    let config = LoggerConfig {
        log_file_path: Some("demo_logs/custom_example.log".into()),
        log_level_console: Level::Warning,
        log_level_files: Level::Debug,
        ..LoggerConfig::default()
    };
    let file_logger = setup_logger("custom_file_example", &config)?;

    file_logger.debug("Debug message (file only)", None);
    file_logger.info("Info message (file only)", None);
    file_logger.warning("Warning message (both console and file)", None);

    // Extra fields ride along with the record; reserved names are
    // renamed instead of colliding with the record's own attributes.
    file_logger.info(
        "File uploaded",
        Some(&json!({
            "bucket_name": "incoming",
            "blob_name": "report.csv",
            "message": "this key is renamed to log_message"
        })),
    );

    println!("Check the demo_logs/ directory for generated log files.");
    Ok(())
}
