use processkit_settings::{Config, ConfigError, LogFormat, SettingsError};
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_toml_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut config = Config::new();
    config.emitter.safe_z = 10.0;
    config.llm.enabled = true;
    config.llm.model = "gpt-4o".to_string();
    config.logging.format = LogFormat::Json;
    config.knowledge_base.path = Some(PathBuf::from("/srv/kb.json"));

    config.save_to_file(&path).unwrap();
    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_json_round_trip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.json");

    let mut config = Config::new();
    config.emitter.face_width = 80.0;
    config.save_to_file(&path).unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.emitter.face_width, 80.0);
    assert_eq!(loaded.knowledge_base.path, None);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[llm]\nmodel = \"local-model\"\n").unwrap();

    let loaded = Config::load_from_file(&path).unwrap();
    assert_eq!(loaded.llm.model, "local-model");
    assert_eq!(loaded.llm.max_tokens, 2000);
    assert_eq!(loaded.emitter.safe_z, 5.0);
    assert_eq!(loaded.logging.level, "info");
}

#[test]
fn test_invalid_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[emitter]\nsafe_z = -2.0\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(err, SettingsError::InvalidSetting { .. }));
}

#[test]
fn test_unsupported_extension() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.yaml");
    std::fs::write(&path, "llm: {}\n").unwrap();

    let err = Config::load_from_file(&path).unwrap_err();
    assert!(matches!(
        err,
        SettingsError::Config(ConfigError::UnsupportedFormat(_))
    ));
    assert!(Config::new().save_to_file(&path).is_err());
}

#[test]
fn test_missing_explicit_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("absent.toml");
    let err = Config::load_or_default(Some(&path)).unwrap_err();
    assert!(matches!(err, SettingsError::IoError(_)));
}
