use std::env;

/// Logging and tracing export settings.
///
/// - `LOG_DIR`: directory for rolling log files (default `storage/logs`)
/// - `OTEL_EXPORTER_OTLP_ENDPOINT`: collector endpoint (default `http://localhost:4317`)
/// - `OTEL_ENABLED`: set to `false` or `0` to skip OpenTelemetry entirely
/// - `ENVIRONMENT`: reported as a resource attribute (default `development`)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub log_dir: String,
    pub otlp_endpoint: String,
    pub otel_enabled: bool,
    pub environment: String,
}

impl LoggingConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            log_dir: lookup("LOG_DIR").unwrap_or_else(|| "storage/logs".to_string()),
            otlp_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .unwrap_or_else(|| "http://localhost:4317".to_string()),
            otel_enabled: lookup("OTEL_ENABLED")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
        }
    }
}
