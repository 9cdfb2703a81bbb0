use std::fs;
use tabq::config::{AppConfig, ConfigManager};
use tempfile::TempDir;

// Helper to create a temporary config directory for testing
fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

#[test]
fn test_write_default_config_creates_file() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let path = config_manager.write_default_config(false).unwrap();
    assert!(path.exists());

    let content = fs::read_to_string(&path).unwrap();
    assert!(content.contains("[server]"));
    assert!(content.contains("[defaults]"));
}

#[test]
fn test_write_default_config_refuses_overwrite_without_force() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    config_manager.write_default_config(false).unwrap();
    assert!(config_manager.write_default_config(false).is_err());
    assert!(config_manager.write_default_config(true).is_ok());
}

#[test]
fn test_written_default_config_loads_and_validates() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let path = config_manager.write_default_config(false).unwrap();
    let config = AppConfig::load_from_path(&path).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.server.url, AppConfig::default().server.url);
}

#[test]
fn test_partial_user_config_merges_over_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();

    let path = config_manager.config_path("config.toml");
    fs::write(
        &path,
        r#"
[server]
url = "https://warehouse.example.com"

[telemetry]
enabled = false
"#,
    )
    .unwrap();

    let user = AppConfig::load_from_path(&path).unwrap();
    let mut config = AppConfig::default();
    config.merge(user);

    assert_eq!(config.server.url, "https://warehouse.example.com");
    assert!(!config.telemetry.enabled);
    // Sections not mentioned keep their defaults
    assert_eq!(config.defaults.output_format, "parquet");
    assert_eq!(config.ui.history_limit, 1000);
}

#[test]
fn test_missing_config_file_yields_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let path = config_manager.config_path("config.toml");

    let config = AppConfig::load_from_path(&path).unwrap();
    assert_eq!(config.server.url, AppConfig::default().server.url);
}

#[test]
fn test_malformed_config_is_an_error() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    config_manager.ensure_config_dir().unwrap();

    let path = config_manager.config_path("config.toml");
    fs::write(&path, "server = { url =").unwrap();

    assert!(AppConfig::load_from_path(&path).is_err());
}
