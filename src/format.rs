use crate::record::LogRecord;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Renders a [`LogRecord`] into one output line (without the trailing
/// newline). Handlers own a formatter and call it on every emit.
pub trait Formatter: Send + Sync {
    fn format(&self, record: &LogRecord) -> String;
}

/// Names that never appear inside the `attributes` object of the
/// structured output.
///
/// Resolved once against the record's own serialized field names plus
/// the compat names, instead of introspecting records at runtime.
/// `message` and `asctime` are listed even though the sanitizer already
/// renames caller-supplied fields of those names: the deny list is what
/// keeps a computed attribute from leaking through under its literal
/// name when a record arrives from a path that bypassed sanitization.
const STANDARD_ATTRIBUTES: &[&str] = &[
    "message",
    "asctime",
    "timestamp",
    "level",
    "levelname",
    "name",
    "target",
    "module",
    "module_path",
    "file",
    "filename",
    "line",
    "lineno",
    "fields",
    "service_name",
];

/// OTLP-style single-line JSON formatter.
///
/// Every record becomes one JSON object with a fixed envelope
/// (timestamp, severity, body, trace/span placeholders, resource
/// identity) plus an `attributes` object holding the non-reserved
/// extra fields.
#[derive(Clone, Debug)]
pub struct OtlpFormatter {
    pub service_name: String,
    pub environment: String,
    pub service_version: String,
}

impl OtlpFormatter {
    pub fn new(
        service_name: impl Into<String>,
        environment: impl Into<String>,
        service_version: impl Into<String>,
    ) -> Self {
        OtlpFormatter {
            service_name: service_name.into(),
            environment: environment.into(),
            service_version: service_version.into(),
        }
    }

    fn map_record<'a>(&'a self, record: &'a LogRecord) -> OtlpLine<'a> {
        let attributes: BTreeMap<&'a str, &'a Value> = record
            .fields
            .iter()
            .filter(|(key, _)| !STANDARD_ATTRIBUTES.contains(&key.as_str()))
            .map(|(key, value)| (key.as_str(), value))
            .collect();

        OtlpLine {
            timestamp: record.timestamp.to_rfc3339(),
            severity_text: record.level.as_str(),
            severity_number: record.level.severity_number(),
            body: &record.message,
            trace_id: "",
            span_id: "",
            resource: OtlpResource {
                service_name: record
                    .service_name
                    .as_deref()
                    .unwrap_or(&self.service_name),
                deployment_environment: &self.environment,
                service_version: &self.service_version,
            },
            attributes,
        }
    }
}

impl Formatter for OtlpFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let line = self.map_record(record);
        serde_json::to_string(&line).unwrap_or_else(|_| {
            // Fallback line so the output stream stays one valid JSON
            // object per line even if a value refuses to serialize.
            format!(
                "{{\"timestamp\":{},\"severityText\":\"{}\",\"body\":{}}}",
                serde_json::to_string(&record.timestamp.to_rfc3339())
                    .unwrap_or_else(|_| "\"\"".to_string()),
                record.level.as_str(),
                serde_json::to_string(&record.message).unwrap_or_else(|_| "\"\"".to_string()),
            )
        })
    }
}

#[derive(Serialize)]
struct OtlpLine<'a> {
    timestamp: String,
    #[serde(rename = "severityText")]
    severity_text: &'static str,
    #[serde(rename = "severityNumber")]
    severity_number: u8,
    body: &'a str,
    #[serde(rename = "traceId")]
    trace_id: &'a str,
    #[serde(rename = "spanId")]
    span_id: &'a str,
    resource: OtlpResource<'a>,
    attributes: BTreeMap<&'a str, &'a Value>,
}

#[derive(Serialize)]
struct OtlpResource<'a> {
    #[serde(rename = "service.name")]
    service_name: &'a str,
    #[serde(rename = "deployment.environment")]
    deployment_environment: &'a str,
    #[serde(rename = "service.version")]
    service_version: &'a str,
}

/// Human-oriented line formatter used for console output and for file
/// output when structured format is disabled.
///
/// Layout: `2024-01-01 12:00:00.000 - target - LEVEL - message` with
/// trailing `key=value` pairs for any extra fields.
#[derive(Clone, Debug, Default)]
pub struct PlainFormatter;

impl Formatter for PlainFormatter {
    fn format(&self, record: &LogRecord) -> String {
        let mut line = format!(
            "{} - {} - {} - {}",
            record.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            record.target,
            record.level,
            record.message
        );
        for (key, value) in &record.fields {
            line.push(' ');
            line.push_str(key);
            line.push('=');
            match value {
                Value::String(s) => line.push_str(s),
                other => line.push_str(&other.to_string()),
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn make_record(fields: BTreeMap<String, Value>) -> LogRecord {
        LogRecord {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap(),
            level: Level::Info,
            target: "svc".to_string(),
            module_path: None,
            file: Some("main.rs".to_string()),
            line: Some(42),
            message: "hello".to_string(),
            fields,
            service_name: None,
        }
    }

    fn otlp() -> OtlpFormatter {
        OtlpFormatter::new("example-service", "development", "1.0.0")
    }

    #[test]
    fn otlp_output_is_valid_json_with_envelope() {
        let record = make_record(BTreeMap::new());
        let line = otlp().format(&record);
        let parsed: Value = serde_json::from_str(&line).expect("valid JSON");

        assert_eq!(parsed["severityText"], json!("INFO"));
        assert_eq!(parsed["severityNumber"], json!(9));
        assert_eq!(parsed["body"], json!("hello"));
        assert_eq!(parsed["resource"]["service.name"], json!("example-service"));
        assert_eq!(parsed["resource"]["deployment.environment"], json!("development"));
        assert_eq!(parsed["resource"]["service.version"], json!("1.0.0"));
        assert_eq!(parsed["traceId"], json!(""));
        assert_eq!(parsed["spanId"], json!(""));
        assert!(parsed["attributes"].is_object());
        assert!(parsed["timestamp"].as_str().unwrap().starts_with("2024-01-01T12:00:00"));
    }

    #[test]
    fn otlp_attributes_carry_extra_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("user_id".to_string(), json!(123));
        fields.insert("action".to_string(), json!("login"));

        let line = otlp().format(&make_record(fields));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["attributes"]["user_id"], json!(123));
        assert_eq!(parsed["attributes"]["action"], json!("login"));
    }

    #[test]
    fn otlp_attributes_never_contain_reserved_names() {
        let mut fields = BTreeMap::new();
        // Simulate a record arriving from a path that skipped sanitization.
        fields.insert("message".to_string(), json!("leaked"));
        fields.insert("asctime".to_string(), json!("leaked"));
        fields.insert("ok".to_string(), json!("kept"));

        let line = otlp().format(&make_record(fields));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        let attrs = parsed["attributes"].as_object().unwrap();
        assert!(!attrs.contains_key("message"));
        assert!(!attrs.contains_key("asctime"));
        assert_eq!(attrs["ok"], json!("kept"));
    }

    #[test]
    fn otlp_survives_unicode_and_special_characters() {
        let mut fields = BTreeMap::new();
        fields.insert("key".to_string(), json!("测试 \"quoted\" \n\t@#$%^&*()"));

        let mut record = make_record(fields);
        record.message = "unicode 测试 with controls \u{0007}".to_string();

        let line = otlp().format(&record);
        let parsed: Value = serde_json::from_str(&line).expect("valid JSON");
        assert_eq!(parsed["attributes"]["key"], json!("测试 \"quoted\" \n\t@#$%^&*()"));
        // One object per line: no raw newlines in the rendered output.
        assert!(!line.contains('\n'));
    }

    #[test]
    fn otlp_handles_hundred_key_maps() {
        let mut fields = BTreeMap::new();
        for i in 0..100 {
            fields.insert(format!("key{i}"), json!(format!("value{i}")));
        }
        let line = otlp().format(&make_record(fields));
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["attributes"].as_object().unwrap().len(), 100);
    }

    #[test]
    fn otlp_prefers_record_service_name() {
        let mut record = make_record(BTreeMap::new());
        record.service_name = Some("per-record".to_string());
        let line = otlp().format(&record);
        let parsed: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["resource"]["service.name"], json!("per-record"));
    }

    #[test]
    fn plain_format_includes_fields() {
        let mut fields = BTreeMap::new();
        fields.insert("bucket".to_string(), json!("b"));
        fields.insert("count".to_string(), json!(2));

        let line = PlainFormatter.format(&make_record(fields));
        assert!(line.starts_with("2024-01-01 12:00:00.000 - svc - INFO - hello"));
        assert!(line.contains("bucket=b"));
        assert!(line.contains("count=2"));
    }
}
