use crate::models::Settings;
use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Name of the settings file inside the configuration directory
pub const SETTINGS_FILE: &str = "wpacrack.yaml";

/// Loads and saves [`Settings`] as YAML.
///
/// Relative paths inside the settings (resources, benchmark log, task file, logs) are
/// resolved against the configuration directory on load.
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_dir: Utf8PathBuf,
    settings_path: Utf8PathBuf,
}

impl ConfigManager {
    /// Create a manager for `config_dir`, creating the directory if needed.
    pub fn new<P: AsRef<Utf8Path>>(config_dir: P) -> Result<Self> {
        let config_dir = config_dir.as_ref().to_path_buf();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .with_context(|| format!("Failed to create config directory: {}", config_dir))?;
        }

        Ok(Self {
            settings_path: config_dir.join(SETTINGS_FILE),
            config_dir,
        })
    }

    /// Load the settings, or defaults when the file doesn't exist.
    pub fn load_settings(&self) -> Result<Settings> {
        let settings = if self.settings_path.exists() {
            let file_contents = fs::read_to_string(&self.settings_path)
                .with_context(|| format!("Failed to read settings: {}", self.settings_path))?;

            let settings: Settings = serde_yaml_ng::from_str(&file_contents)
                .with_context(|| format!("Failed to parse settings: {}", self.settings_path))?;

            tracing::info!("Loaded settings from {}", self.settings_path);
            settings
        } else {
            tracing::warn!(
                "Settings file not found at {}, using defaults",
                self.settings_path
            );
            Settings::default()
        };

        Ok(self.resolve_paths(settings))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        let yaml_string =
            serde_yaml_ng::to_string(settings).context("Failed to serialize settings to YAML")?;

        fs::write(&self.settings_path, yaml_string)
            .with_context(|| format!("Failed to write settings: {}", self.settings_path))?;

        tracing::info!("Saved settings to {}", self.settings_path);
        Ok(())
    }

    fn resolve_paths(&self, mut settings: Settings) -> Settings {
        for path in [
            &mut settings.resources_dir,
            &mut settings.benchmark_file,
            &mut settings.tasks_file,
            &mut settings.log_dir,
        ] {
            if path.is_relative() {
                *path = self.config_dir.join(&*path);
            }
        }
        settings
    }

    pub fn config_dir(&self) -> &Utf8Path {
        &self.config_dir
    }

    pub fn settings_path(&self) -> &Utf8Path {
        &self.settings_path
    }
}
