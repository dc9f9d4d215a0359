//! Config command implementation.
//!
//! Manages the editing settings shared with the library.

use anyhow::Result;
use statechart_ops::Config;

/// Show current configuration.
pub fn show(config: &Config) -> Result<()> {
    println!("Statechart CLI Configuration");
    println!("{:-<40}", "");

    for key in Config::KEYS {
        let value = config.get(key).unwrap_or_default();
        println!("{:<20} {}", format!("{}:", key), value);
    }

    if let Some(config_path) = Config::config_file_path() {
        println!("\nConfig file: {}", config_path.display());
    }

    Ok(())
}

/// Set a configuration value.
pub fn set(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let key = normalize(key);
    if !Config::KEYS.contains(&key.as_str()) {
        anyhow::bail!(
            "Unknown config key: {}. Valid keys: {}",
            key,
            Config::KEYS.join(", ")
        );
    }

    config.set(&key, value)?;
    config.save()?;
    println!("Set {} to: {}", key, value);
    Ok(())
}

/// Get a configuration value.
pub fn get(config: &Config, key: &str) -> Result<()> {
    let key = normalize(key);
    let Some(value) = config.get(&key) else {
        anyhow::bail!("Unknown config key: {}", key);
    };

    println!("{}", value);
    Ok(())
}

/// Reset configuration to defaults.
pub fn reset() -> Result<()> {
    let config = Config::default();
    config.save()?;
    println!("Configuration reset to defaults");
    Ok(())
}

/// Accept `paste-offset` as well as `paste_offset`.
fn normalize(key: &str) -> String {
    key.replace('-', "_")
}
