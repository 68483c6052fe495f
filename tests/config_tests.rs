use std::io::Write;

use fastmath::config::{ConfigError, EngineConfig};

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{ "timing": {{ "inactivity_limit_ms": 45000 }}, "grid": {{ "max_factor": 10, "shuffle": false }} }}"#
    )
    .unwrap();

    let config = EngineConfig::load(file.path()).unwrap();
    assert_eq!(config.timing.inactivity_limit_ms, 45_000);
    assert_eq!(config.timing.hint_cooldown_ms, 10_000);
    assert_eq!(config.grid.max_factor, 10);
    assert!(!config.grid.shuffle);
}

#[test]
fn test_load_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = EngineConfig::load(dir.path().join("absent.json"));
    assert!(matches!(missing, Err(ConfigError::Io(_))));

    let bad = dir.path().join("bad.json");
    std::fs::write(&bad, "{ timing: ").unwrap();
    assert!(matches!(EngineConfig::load(&bad), Err(ConfigError::Parse(_))));
}

#[test]
fn test_from_env_reads_file_and_key() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fastmath.json");
    std::fs::write(&path, r#"{ "report": { "structured": true } }"#).unwrap();

    std::env::set_var("FASTMATH_CONFIG", &path);
    std::env::set_var("FASTMATH_REPORT_API_KEY", " secret ");
    let config = EngineConfig::from_env().unwrap();
    std::env::remove_var("FASTMATH_CONFIG");
    std::env::remove_var("FASTMATH_REPORT_API_KEY");

    assert!(config.report.structured);
    assert_eq!(config.report.api_key.as_deref(), Some("secret"));
}
