//! Integration tests for logging system

use bridge_traits::log_sink::LogLevel;
use core_runtime::logging::{init_logging, strip_path, LogFormat, LoggingConfig};
use core_runtime::Error;

#[test]
fn test_init_logging_only_once() {
    // Global subscriber: this is the only test in this binary that installs one
    let config = LoggingConfig::default()
        .with_format(LogFormat::Compact)
        .with_level(LogLevel::Debug);
    assert!(init_logging(config.clone()).is_ok());

    tracing::info!(target: "core_compress", "logging initialized");

    let second = init_logging(config);
    assert!(matches!(second, Err(Error::Logging(_))));
}

#[test]
fn test_path_stripping() {
    assert_eq!(strip_path("/home/user/recordings/answer.webm"), "answer.webm");
    assert_eq!(strip_path("D:\\exam\\speaking\\part1.m4a"), "part1.m4a");
    assert_eq!(strip_path("answer.ogg"), "answer.ogg");
    assert_eq!(strip_path(""), "");
}

#[test]
fn test_config_chaining() {
    let config = LoggingConfig::default()
        .with_format(LogFormat::Json)
        .with_level(LogLevel::Warn)
        .with_spans(false)
        .with_target(false)
        .with_thread_info(true);

    assert_eq!(config.format, LogFormat::Json);
    assert_eq!(config.level, LogLevel::Warn);
    assert!(!config.enable_spans);
    assert!(!config.display_target);
    assert!(config.display_thread_info);
    assert!(config.logger_sink.is_none());
}
