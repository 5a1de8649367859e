use std::fs;

use tempfile::TempDir;
use vigil::core::config::{ConfigStore, FusionConfig, ModalityWeights};

#[test]
fn test_config_default_matches_documented_values() {
    let config = FusionConfig::default();
    assert_eq!(config.weights, ModalityWeights::default());
    assert_eq!(config.smoothing_alpha, 0.3);
    assert_eq!(config.levels.normal, 70.0);
    assert_eq!(config.levels.mild, 40.0);
    assert_eq!(config.levels.moderate, 20.0);
    assert_eq!(config.intervention.visual_cooldown_secs, 6.0);
    assert_eq!(config.intervention.voice_cooldown_secs, 12.0);
    assert_eq!(config.staleness.factor, 2.0);
}

#[test]
fn test_config_load_missing_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("missing.json");
    let config = ConfigStore::load_from(&path).unwrap();
    assert_eq!(config, FusionConfig::default());
}

#[test]
fn test_config_roundtrip() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.json");

    let mut config = FusionConfig::default();
    config.weights = ModalityWeights::normalized(2.0, 1.0, 1.0).unwrap();
    config.intervention.enable_voice = false;
    config.tick_interval_ms = 50;

    ConfigStore::save_to(&config, &path).unwrap();
    assert!(path.exists());

    let loaded = ConfigStore::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_config_corrupt_file_is_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();

    let err = ConfigStore::load_from(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid config file"));
}

#[test]
fn test_config_invalid_values_are_rejected_on_load() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(
        &path,
        r#"{ "weights": { "drowsiness": 0.9, "distraction": 0.3, "voice_fatigue": 0.2 } }"#,
    )
    .unwrap();

    assert!(ConfigStore::load_from(&path).is_err());
}

#[test]
fn test_config_empty_file_returns_default() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    fs::write(&path, "  \n").unwrap();
    assert_eq!(ConfigStore::load_from(&path).unwrap(), FusionConfig::default());
}

#[test]
fn test_config_refuses_to_save_invalid() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.json");
    let config = FusionConfig {
        smoothing_alpha: 0.0,
        ..Default::default()
    };
    assert!(ConfigStore::save_to(&config, &path).is_err());
    assert!(!path.exists());
}

#[test]
fn test_config_path_is_under_vigil_dir() {
    if let Ok(path) = ConfigStore::get_config_path() {
        assert!(path.ends_with("vigil/config.json"));
    }
}
