use serde_json::json;
use std::time::Duration;
use tracing_log_rotate::logger::{setup_logger, LoggerConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured output with an aggressively small rotation threshold
    // so the rollover and gzip archiving are easy to observe.
    let config = LoggerConfig {
        log_file_path: Some("demo_logs/otlp_example.log".into()),
        use_structured_format: true,
        service_name: "example-service".to_string(),
        environment: "development".to_string(),
        service_version: "1.0.0".to_string(),
        rotation_size_bytes: 4 * 1024,
        rotation_interval: Duration::from_secs(24 * 60 * 60),
        ..LoggerConfig::default()
    };
    let logger = setup_logger("otlp_example", &config)?;

    logger.info("This is a regular info message in OTLP format", None);
    logger.warning("This is a warning message in OTLP format", None);

    for i in 0..200 {
        logger.info(
            "User action performed",
            Some(&json!({
                "user_id": format!("user_{i}"),
                "action": "login",
                "ip_address": "192.168.1.1"
            })),
        );
    }

    logger.info(
        "Order processed successfully",
        Some(&json!({
            "order_id": "ORD-12345",
            "amount": 99.99,
            "currency": "USD",
            "shipping_address": {
                "street": "123 Main St",
                "city": "Anytown"
            }
        })),
    );

    println!("Check demo_logs/ for otlp_example.log and its .gz archives.");
    Ok(())
}
