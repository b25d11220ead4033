//! Integration tests for logging system

use async_trait::async_trait;
use bridge_traits::error::Result as SinkResult;
use bridge_traits::time::{LogEntry, LogLevel, LoggerSink};
use core_runtime::logging::{
    init_logging, redact_if_sensitive, strip_path, LogFormat, LoggingConfig,
};
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSink {
    entries: Mutex<Vec<LogEntry>>,
}

#[async_trait]
impl LoggerSink for RecordingSink {
    async fn log(&self, entry: LogEntry) -> SinkResult<()> {
        self.entries.lock().unwrap().push(entry);
        Ok(())
    }

    fn min_level(&self) -> LogLevel {
        LogLevel::Debug
    }
}

// Only one global subscriber can be installed per process, so every
// init_logging assertion lives in this single test.
#[test]
fn test_init_logging_installs_once_and_mirrors_to_sink() {
    let sink = Arc::new(RecordingSink::default());
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug)
        .with_logger_sink(sink.clone());

    init_logging(config.clone()).unwrap();

    tracing::info!(target: "core_timing::manager", reciter_id = 3u32, "resolved source");
    tracing::debug!(target: "some_dependency", "filtered out by default filter");

    {
        let entries = sink.entries.lock().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "resolved source");
        assert_eq!(entries[0].fields.get("reciter_id"), Some(&"3".to_string()));
    }

    assert!(init_logging(config).is_err());
}

#[test]
fn test_redaction_of_credentials() {
    assert_eq!(redact_if_sensitive("api_key", "live-key"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("bearer", "abc"), "[REDACTED]");
    assert_eq!(redact_if_sensitive("client_secret", "abc"), "[REDACTED]");
}

#[test]
fn test_redaction_leaves_timing_fields_alone() {
    assert_eq!(redact_if_sensitive("reciter_id", "12"), "12");
    assert_eq!(redact_if_sensitive("chapter_id", "114"), "114");
    assert_eq!(
        redact_if_sensitive("url", "https://api.itqan.dev/api/v1/assets/11/tracks/"),
        "https://api.itqan.dev/api/v1/assets/11/tracks/"
    );
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/usr/share/recitation/timings/reciter_5.json"), "reciter_5.json");
    assert_eq!(strip_path("D:\\data\\reciter_5.json"), "reciter_5.json");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_format_selection() {
    #[cfg(debug_assertions)]
    assert_eq!(LoggingConfig::default().format, LogFormat::Pretty);

    #[cfg(not(debug_assertions))]
    assert_eq!(LoggingConfig::default().format, LogFormat::Json);
}
