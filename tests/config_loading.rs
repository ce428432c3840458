//! Config file loading from disk.

use ivr_read::config::{load_config_from, ConfigError, IvrConfig};
use ivr_read::logging::LogFormat;
use std::io::Write;

#[test]
fn test_missing_file_yields_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config_from(&dir.path().join("absent.json5")).unwrap();
    assert_eq!(config, IvrConfig::default());
}

#[test]
fn test_load_json5_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"{{
            reader: {{ defaultAttempts: 2, invalidPrompt: "try-again" }},
            logging: {{ level: "debug", format: "json" }},
        }}"#
    )
    .unwrap();

    let config = load_config_from(file.path()).unwrap();
    assert_eq!(config.reader.default_attempts, 2);
    assert_eq!(config.reader.invalid_prompt, "try-again");
    assert_eq!(config.reader.goodbye_prompt, "goodbye");
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(config.simulator.playback_ms, 1000);
}

#[test]
fn test_malformed_file_is_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "{{ reader: ").unwrap();

    let err = load_config_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_invalid_values_are_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, r#"{{ reader: {{ goodbyePrompt: "" }} }}"#).unwrap();

    let err = load_config_from(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
    assert!(err.to_string().contains("Goodbye"));
}

#[test]
fn test_directory_path_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_config_from(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}
