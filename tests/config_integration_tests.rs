//! Integration tests for ConfigManager and settings file handling
//!
//! These tests verify:
//! - Settings loading and saving
//! - Partial files falling back to defaults
//! - Relative paths resolved against the configuration directory
//! - Settings flowing into the task store and resource catalog

use camino::Utf8PathBuf;
use std::fs;
use tempfile::TempDir;
use wpacrack::models::{ResourceCatalog, TaskRecord};
use wpacrack::store::TaskStore;
use wpacrack::{ConfigManager, Settings, YamlTaskStore};

fn create_test_config_dir() -> (TempDir, Utf8PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let config_path = Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap();
    (temp_dir, config_path)
}

#[test]
fn test_create_config_manager() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    assert_eq!(manager.config_dir(), &config_path);
    assert_eq!(manager.settings_path(), config_path.join("wpacrack.yaml"));
}

#[test]
fn test_config_dir_is_created() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let nested = config_path.join("etc/wpacrack");

    ConfigManager::new(&nested).unwrap();
    assert!(nested.exists());
}

#[test]
fn test_partial_settings_file() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    fs::write(
        manager.settings_path(),
        "Hash Mode: 22000\nBenchmark Mode: 2500\nTimeout Minutes: 90\n",
    )
    .unwrap();

    let settings = manager.load_settings().unwrap();
    assert_eq!(settings.hash_mode, 22000);
    assert_eq!(settings.benchmark_mode(), 2500);
    assert_eq!(settings.default_timeout_minutes, Some(90));
    assert_eq!(settings.hashcat_bin, "hashcat");
    assert_eq!(settings.device_index, 1);
    assert_eq!(settings.status_timer_secs, 20);
    assert_eq!(settings.benchmark_file, config_path.join("benchmark.csv"));
}

#[test]
fn test_saved_settings_round_trip() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();

    let settings = Settings {
        hashcat_bin: "/opt/hashcat/hashcat.bin".to_string(),
        device_index: 2,
        debug_mode: true,
        ..Settings::default()
    };
    manager.save_settings(&settings).unwrap();

    let yaml = fs::read_to_string(manager.settings_path()).unwrap();
    assert!(yaml.contains("Hashcat Bin: /opt/hashcat/hashcat.bin"));

    let loaded = manager.load_settings().unwrap();
    assert_eq!(loaded.hashcat_bin, "/opt/hashcat/hashcat.bin");
    assert_eq!(loaded.device_index, 2);
    assert!(loaded.debug_mode);
}

#[test]
fn test_settings_drive_store_and_catalog() {
    let (_temp_dir, config_path) = create_test_config_dir();
    let manager = ConfigManager::new(&config_path).unwrap();
    let settings = manager.load_settings().unwrap();

    let store = YamlTaskStore::open(&settings.tasks_file).unwrap();
    store.insert(TaskRecord::new(store.next_id(), "/uploads/a.cap")).unwrap();
    store.commit().unwrap();
    assert!(config_path.join("tasks.yaml").exists());

    let catalog = ResourceCatalog::new(&settings.resources_dir);
    assert_eq!(
        catalog.best64().path,
        config_path.join("resources/rules/best64.rule")
    );
}
