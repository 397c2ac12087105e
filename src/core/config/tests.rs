use super::data::Config;
use super::defaults::DEFAULT_WEB_PORT;
use super::io::ConfigError;
use crate::core::model_id::ModelIdentifier;
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_load_nonexistent_config() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nonexistent_config.toml");

    let config = Config::load_from_path(&config_path).expect("Failed to load config");

    assert_eq!(config, Config::default());
    assert_eq!(config.current_model(), None);
}

#[test]
fn test_config_persistence_lifecycle() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("nested").join("config.toml");

    let mut config = Config::default();
    config.set_model(&ModelIdentifier::normalize("llama3"));
    config.web_port = Some(9090);
    config.save_to_path(&config_path).expect("save failed");

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded.model.as_deref(), Some("llama3:latest"));
    assert_eq!(loaded.web_port(), 9090);

    Config::update_at(&config_path, |config| {
        config.model = None;
        Ok(())
    })
    .expect("update failed");
    let cleared = Config::load_from_path(&config_path).expect("reload failed");
    assert_eq!(cleared.model, None);
    assert_eq!(cleared.web_port, Some(9090));
}

#[test]
fn failed_update_leaves_file_untouched() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    Config {
        model: Some("phi3:latest".to_string()),
        ..Default::default()
    }
    .save_to_path(&config_path)
    .expect("save failed");

    let result: Result<(), _> = Config::update_at(&config_path, |config| {
        config.model = Some("other:latest".to_string());
        Err("model not present".into())
    });
    assert!(result.is_err());

    let loaded = Config::load_from_path(&config_path).expect("load failed");
    assert_eq!(loaded.model.as_deref(), Some("phi3:latest"));
}

#[test]
fn malformed_file_is_a_parse_error() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("config.toml");
    std::fs::write(&config_path, "model = [unterminated").expect("write failed");

    match Config::load_from_path(&config_path) {
        Err(ConfigError::Parse { path, .. }) => assert_eq!(path, config_path),
        other => panic!("expected parse error, got {other:?}"),
    }
}

#[test]
fn accessors_fall_back_to_defaults() {
    let config = Config::default();
    assert_eq!(
        config.resolve_daemon_url(None),
        "http://localhost:11434".to_string()
    );
    assert_eq!(config.catalog_url(), "https://ollama.com/library?sort=popular");
    assert_eq!(config.web_port(), DEFAULT_WEB_PORT);
    assert_eq!(config.request_timeout(), Duration::from_secs(600));

    let zero_timeout = Config {
        request_timeout_secs: Some(0),
        ..Default::default()
    };
    assert_eq!(zero_timeout.request_timeout(), Duration::from_secs(600));
}

#[test]
fn environment_overrides_daemon_url() {
    let config = Config {
        daemon_url: Some("http://gpu-box:11434".to_string()),
        ..Default::default()
    };
    assert_eq!(config.resolve_daemon_url(None), "http://gpu-box:11434");
    assert_eq!(
        config.resolve_daemon_url(Some("http://override:1")),
        "http://override:1"
    );
    assert_eq!(config.resolve_daemon_url(Some("  ")), "http://gpu-box:11434");
}

#[test]
fn stored_model_is_normalized_on_read() {
    let config = Config {
        model: Some("mistral".to_string()),
        ..Default::default()
    };
    assert_eq!(
        config.current_model().map(|model| model.canonical()),
        Some("mistral:latest".to_string())
    );

    let blank = Config {
        model: Some("   ".to_string()),
        ..Default::default()
    };
    assert_eq!(blank.current_model(), None);
}
