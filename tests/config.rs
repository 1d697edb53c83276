use std::io::Write;
use std::time::Duration;

use tempfile::NamedTempFile;

use floodchat::config::{DEFAULT_LOG_FILTER, DEFAULT_PRESENCE_INTERVAL_SECS};
use floodchat::services::codec::DEFAULT_MAX_ENVELOPE_BYTES;
use floodchat::{Config, FloodChatError};

#[test]
fn config_from_file_reads_node_settings() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{
            "node": {{
                "name": "relay-7",
                "presence_interval_secs": 30,
                "emit_all_received_chat_messages": true,
                "max_envelope_bytes": 4096
            }},
            "log_filter": "debug"
        }}"#
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    let node = config.node();

    assert_eq!(node.name.as_deref(), Some("relay-7"));
    assert_eq!(node.presence_interval(), Duration::from_secs(30));
    assert!(node.emit_all_received_chat_messages());
    assert_eq!(node.max_envelope_bytes(), 4096);
    assert_eq!(config.log_filter(), "debug");
}

#[test]
fn missing_fields_fall_back_to_defaults() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{{}}").unwrap();

    let config = Config::from_file(file.path()).unwrap();
    let node = config.node();

    assert!(node.name.is_none());
    assert_eq!(
        node.presence_interval(),
        Duration::from_secs(DEFAULT_PRESENCE_INTERVAL_SECS)
    );
    assert!(!node.emit_all_received_chat_messages());
    assert_eq!(node.max_envelope_bytes(), DEFAULT_MAX_ENVELOPE_BYTES);
    assert_eq!(config.log_filter(), DEFAULT_LOG_FILTER);
}

#[test]
fn zero_interval_is_clamped() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, r#"{{"node": {{"presence_interval_secs": 0}}}}"#).unwrap();

    let config = Config::from_file(file.path()).unwrap();

    assert_eq!(config.node().presence_interval(), Duration::from_secs(1));
}

#[test]
fn unreadable_config_is_a_config_error() {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "not json").unwrap();

    assert!(matches!(
        Config::from_file(file.path()),
        Err(FloodChatError::Config(_))
    ));
    assert!(matches!(
        Config::from_file("/nonexistent/floodchat.json"),
        Err(FloodChatError::Config(_))
    ));
}
