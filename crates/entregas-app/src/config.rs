//! Configuration management for entregas
//!
//! Config stored at: ~/.config/entregas/config.toml

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use entregas_domain::service::AccessPolicy;
use entregas_types::{ConfigError, Error, OutputFormat, Result};

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Store directory override
    #[serde(default)]
    pub store_dir: Option<PathBuf>,

    /// Default output format (table, json)
    #[serde(default = "default_output_format")]
    pub output_format: OutputFormat,

    /// Let customers create their own deliveries
    #[serde(default)]
    pub customers_create_deliveries: bool,

    /// Default directory for `import`
    #[serde(default)]
    pub import_dir: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset (e.g. "info,entregas_domain=debug")
    #[serde(default)]
    pub log_filter: Option<String>,
}

fn default_output_format() -> OutputFormat {
    OutputFormat::Table
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            output_format: default_output_format(),
            customers_create_deliveries: false,
            import_dir: None,
            log_filter: None,
        }
    }
}

/// Keys accepted by [`Config::set`]
pub const KEYS: [&str; 5] = [
    "store_dir",
    "output_format",
    "customers_create_deliveries",
    "import_dir",
    "log_filter",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or(ConfigError::NotFound)?
            .join("entregas");
        Ok(config_dir)
    }

    /// Get the config file path
    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the store directory path
    pub fn store_dir(&self) -> Result<PathBuf> {
        if let Some(ref dir) = self.store_dir {
            return Ok(dir.clone());
        }

        let store_dir = dirs::data_dir()
            .ok_or(ConfigError::NotFound)?
            .join("entregas");
        Ok(store_dir)
    }

    pub fn policy(&self) -> AccessPolicy {
        AccessPolicy {
            customers_create_deliveries: self.customers_create_deliveries,
        }
    }

    /// Load config from file, or create default
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let config: Config =
                toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Save config to file
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Set one value from its text form; an empty value clears optional keys
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let value = value.trim();
        let optional_path = || (!value.is_empty()).then(|| PathBuf::from(value));

        match key {
            "store_dir" => self.store_dir = optional_path(),
            "import_dir" => self.import_dir = optional_path(),
            "log_filter" => self.log_filter = (!value.is_empty()).then(|| value.to_string()),
            "output_format" => {
                self.output_format = match value.to_ascii_lowercase().as_str() {
                    "table" => OutputFormat::Table,
                    "json" => OutputFormat::Json,
                    _ => {
                        return Err(Error::Validation(format!(
                            "output_format must be table or json, got '{}'",
                            value
                        )))
                    }
                }
            }
            "customers_create_deliveries" => {
                self.customers_create_deliveries = value.parse().map_err(|_| {
                    Error::Validation(format!(
                        "customers_create_deliveries must be true or false, got '{}'",
                        value
                    ))
                })?
            }
            _ => {
                return Err(Error::Validation(format!(
                    "unknown config key '{}', expected one of: {}",
                    key,
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Entregas Configuration")?;
        writeln!(f, "======================")?;
        writeln!(f)?;
        writeln!(
            f,
            "Store dir:       {}",
            self.store_dir()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "(error)".to_string())
        )?;
        writeln!(f, "Output format:   {}", self.output_format)?;
        writeln!(f, "Customer create: {}", self.customers_create_deliveries)?;
        writeln!(
            f,
            "Import dir:      {}",
            self.import_dir
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "(none)".to_string())
        )?;
        writeln!(
            f,
            "Log filter:      {}",
            self.log_filter.as_deref().unwrap_or("(default)")
        )?;

        if let Ok(path) = Self::config_path() {
            writeln!(f)?;
            writeln!(f, "Config file:     {}", path.display())?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let config = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.policy().customers_create_deliveries);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.set("store_dir", "/tmp/entregas-store").unwrap();
        config.set("output_format", "json").unwrap();
        config.set("customers_create_deliveries", "true").unwrap();
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.store_dir().unwrap(), PathBuf::from("/tmp/entregas-store"));
        assert!(loaded.policy().customers_create_deliveries);
    }

    #[test]
    fn test_partial_file_uses_field_defaults() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "log_filter = \"debug\"\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.log_filter.as_deref(), Some("debug"));
        assert_eq!(config.output_format, OutputFormat::Table);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let mut config = Config::default();
        assert!(config.set("output_format", "xml").is_err());
        assert!(config.set("customers_create_deliveries", "maybe").is_err());
        assert!(config.set("backend", "x").is_err());

        config.set("import_dir", "/data").unwrap();
        config.set("import_dir", "").unwrap();
        assert_eq!(config.import_dir, None);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let temp_dir = tempdir().expect("Failed to create temp dir");
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "output_format = [").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::ParseError(_))));
    }
}
