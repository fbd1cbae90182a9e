use std::fs;

use directories::ProjectDirs;
use figment::{
    providers::{Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoggingConfig {
    pub regscan: String,
}

impl LoggingConfig {
    const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];
    const REGSCAN_LEVEL: &str = "info";

    fn default() -> Self {
        LoggingConfig {
            regscan: Self::REGSCAN_LEVEL.to_string(),
        }
    }

    fn ensure_valid(&mut self) {
        // Trim and lowercase the configured level; if it isn't a valid log
        // level, inform the user and use the default
        let str_original = self.regscan.clone();
        self.regscan = self.regscan.trim().to_ascii_lowercase();
        if !Self::LOG_LEVELS.contains(&self.regscan.as_str()) {
            eprintln!(
                "Config error: regscan log level of '{}' is invalid - using default of '{}'",
                str_original,
                Self::REGSCAN_LEVEL
            );
            self.regscan = Self::REGSCAN_LEVEL.to_owned();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScanConfig {
    extensions: String,
}

impl ScanConfig {
    const DEFAULT_EXTENSIONS: &str = "csv,xlsx,xls";

    /// Comma-separated default allow-list, used when `--ext` is not given.
    pub fn extensions(&self) -> &str {
        &self.extensions
    }

    fn default() -> Self {
        ScanConfig {
            extensions: Self::DEFAULT_EXTENSIONS.to_owned(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Config {
    pub logging: LoggingConfig,
    pub scan: ScanConfig,
}

impl Config {
    pub fn load() -> Self {
        match ProjectDirs::from("", "", "regscan") {
            Some(project_dirs) => Self::load_config(&project_dirs),
            None => {
                eprintln!("Could not determine a config directory - using default configuration.");
                Self::default_config()
            }
        }
    }

    fn default_config() -> Self {
        Config {
            logging: LoggingConfig::default(),
            scan: ScanConfig::default(),
        }
    }

    /// Loads the configuration from a TOML file located in the app's data
    /// directory. If the file is missing or fails to parse, defaults are
    /// used. Additionally, writes the default config to disk if no file
    /// exists.
    pub fn load_config(project_dirs: &ProjectDirs) -> Self {
        let config_path = project_dirs.data_local_dir().join("config.toml");

        let default_config = Self::default_config();

        // If the config file doesn't exist, write the default configuration to disk.
        if !config_path.exists() {
            if let Some(parent) = config_path.parent() {
                if let Err(e) = fs::create_dir_all(parent) {
                    eprintln!(
                        "Failed to create configuration directory {}: {}",
                        parent.display(),
                        e
                    );
                }
            }
            if let Ok(toml_string) = toml::to_string_pretty(&default_config) {
                if let Err(e) = fs::write(&config_path, toml_string) {
                    eprintln!(
                        "Failed to write default config to {}: {}",
                        config_path.display(),
                        e
                    );
                }
            } else {
                eprintln!("Failed to serialize default config.");
            }
        }

        // Build a Figment instance that uses the defaults merged with the TOML file (if it exists)
        let figment = Figment::from(Serialized::defaults(default_config.clone()))
            .merge(Toml::file(&config_path));

        // Attempt to extract the configuration; on error, log a message and fall back to defaults.
        let mut config = figment.extract().unwrap_or_else(|err| {
            eprintln!(
                "Could not load config file {}: {}. Using default configuration.",
                config_path.display(),
                err
            );
            default_config
        });

        config.ensure_valid();

        config
    }

    fn ensure_valid(&mut self) {
        self.logging.ensure_valid();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_config();
        assert_eq!(config.logging.regscan, "info");
        assert_eq!(config.scan.extensions(), "csv,xlsx,xls");
    }

    #[test]
    fn test_invalid_log_level_falls_back() {
        let mut logging = LoggingConfig {
            regscan: "loud".to_string(),
        };
        logging.ensure_valid();
        assert_eq!(logging.regscan, "info");
    }

    #[test]
    fn test_log_level_is_normalized() {
        let mut logging = LoggingConfig {
            regscan: " DEBUG ".to_string(),
        };
        logging.ensure_valid();
        assert_eq!(logging.regscan, "debug");
    }
}
