use tracing::{error, info, warn};
use tracing_log_rotate::init::init_tracing_with_config;
use tracing_log_rotate::logger::LoggerConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = LoggerConfig {
        log_file_path: Some("demo_logs/bridge_example.log".into()),
        use_structured_format: true,
        service_name: "bridge-service".to_string(),
        ..LoggerConfig::default()
    };
    init_tracing_with_config(&config)?;

    info!("starting service");

    warn!(retry_count = 3, "upstream slow to respond");

    error!(
        user_id = 42,
        reason = "invalid password",
        "authentication failed"
    );

    // Reserved field names coming through tracing call sites are
    // renamed before they reach the file.
    info!(filename = "data.csv", "upload accepted");

    println!("Check demo_logs/bridge_example.log for the structured records.");
    Ok(())
}
