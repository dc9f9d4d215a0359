//! Configuration for the editing layer.

use std::path::PathBuf;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Editing behavior settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Offset applied to pasted states so they don't cover the originals.
    #[serde(default = "default_paste_offset")]
    pub paste_offset: f64,

    /// Run the repair pass when a transaction ends.
    #[serde(default = "default_true")]
    pub repair_on_commit: bool,

    /// Cancel, instead of commit, transactions that leave the chart invalid.
    #[serde(default = "default_true")]
    pub validate_on_commit: bool,

    /// Pretty-print written documents.
    #[serde(default = "default_true")]
    pub pretty_json: bool,
}

fn default_paste_offset() -> f64 {
    16.0
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paste_offset: default_paste_offset(),
            repair_on_commit: true,
            validate_on_commit: true,
            pretty_json: true,
        }
    }
}

impl Config {
    /// Keys accepted by [`Config::get`] and [`Config::set`].
    pub const KEYS: [&'static str; 4] = [
        "paste_offset",
        "repair_on_commit",
        "validate_on_commit",
        "pretty_json",
    ];

    /// Load configuration from disk with environment overrides.
    pub fn load() -> ModelResult<Self> {
        let config = match Self::config_file_path() {
            Some(path) if path.exists() => {
                let contents = std::fs::read_to_string(&path)?;
                serde_json::from_str(&contents)?
            }
            _ => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Apply `SC_*` environment variables on top of this configuration.
    pub fn with_env_overrides(mut self) -> ModelResult<Self> {
        for key in Self::KEYS {
            let var = format!("SC_{}", key.to_uppercase());
            if let Ok(value) = std::env::var(&var) {
                self.set(key, &value)?;
            }
        }
        Ok(self)
    }

    /// Save configuration to disk.
    pub fn save(&self) -> ModelResult<()> {
        if let Some(path) = Self::config_file_path() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let contents = serde_json::to_string_pretty(self)?;
            std::fs::write(&path, contents)?;
        }
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_file_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "pinsky-three", "statechart-studio")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "paste_offset" => Some(self.paste_offset.to_string()),
            "repair_on_commit" => Some(self.repair_on_commit.to_string()),
            "validate_on_commit" => Some(self.validate_on_commit.to_string()),
            "pretty_json" => Some(self.pretty_json.to_string()),
            _ => None,
        }
    }

    /// Set a configuration value by key.
    pub fn set(&mut self, key: &str, value: &str) -> ModelResult<()> {
        match key {
            "paste_offset" => {
                self.paste_offset = value
                    .parse()
                    .map_err(|_| ModelError::Config(format!("Invalid number: {}", value)))?;
            }
            "repair_on_commit" => self.repair_on_commit = parse_bool(value)?,
            "validate_on_commit" => self.validate_on_commit = parse_bool(value)?,
            "pretty_json" => self.pretty_json = parse_bool(value)?,
            _ => {
                return Err(ModelError::Config(format!("Unknown config key: {}", key)));
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> ModelResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ModelError::Config(format!("Invalid boolean: {}", value))),
    }
}
