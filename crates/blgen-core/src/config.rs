//! # Configuration System
//!
//! Provides YAML-based configuration for blgen, covering:
//!
//! - Driver backend and the location of its sysfs attributes and device node
//! - Generation settings (waveform file, buffer unit size, checks, prompts)
//! - Logging
//! - Named generation profiles
//!
//! ## Configuration Search Path
//!
//! Configuration is loaded from the first file found:
//! 1. Path specified via `BLGEN_CONFIG` environment variable
//! 2. `./blgen.yaml` (current directory)
//! 3. `~/.config/blgen/config.yaml` (user config)
//! 4. `/etc/blgen/config.yaml` (system config)
//!
//! Without any file the defaults reproduce the stock setup: `PRUdata.bin`
//! from the working directory, a 640000 byte buffer unit and the standard
//! BeagleLogic paths.
//!
//! ## Example Configuration
//!
//! ```yaml
//! driver:
//!   backend: beaglelogic
//!   sysfs_dir: /sys/devices/virtual/misc/beaglelogic
//!   device_path: /dev/beaglelogic
//!
//! generation:
//!   waveform: PRUdata.bin
//!   bufunit_size: 640000
//!   verify_allocation: true
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use blgen_driver::{DEFAULT_BUFUNIT_SIZE, MIN_BUFUNIT_SIZE};

pub use blgen_driver::{DEFAULT_DEVICE_PATH, DEFAULT_SYSFS_DIR};

use crate::observe::LogConfig;

/// Default waveform file, relative to the working directory
pub const DEFAULT_WAVEFORM: &str = "PRUdata.bin";

/// Error type for configuration operations.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// Configuration file not found
    NotFound(String),
    /// Failed to read configuration file
    ReadError(String),
    /// Failed to parse configuration
    ParseError(String),
    /// Invalid configuration value
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NotFound(msg) => write!(f, "config not found: {}", msg),
            ConfigError::ReadError(msg) => write!(f, "failed to read config: {}", msg),
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::ValidationError(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Driver backend selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// BeagleLogic kernel module
    BeagleLogic,
    /// Software model, no hardware needed
    Simulator,
}

impl Default for Backend {
    fn default() -> Self {
        Backend::BeagleLogic
    }
}

/// Driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Backend to use
    pub backend: Backend,
    /// Directory with the driver's sysfs attributes
    pub sysfs_dir: PathBuf,
    /// Device node receiving waveform data
    pub device_path: PathBuf,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            backend: Backend::BeagleLogic,
            sysfs_dir: PathBuf::from(DEFAULT_SYSFS_DIR),
            device_path: PathBuf::from(DEFAULT_DEVICE_PATH),
        }
    }
}

/// Generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    /// Pre-multiplexed waveform file
    pub waveform: PathBuf,
    /// Size of one driver allocation unit in bytes
    pub bufunit_size: u32,
    /// Read the allocation back and compare it with the waveform length
    pub verify_allocation: bool,
    /// Refuse empty waveform files instead of warning
    pub reject_empty: bool,
    /// Wait for Enter at each operator prompt
    pub confirm_prompts: bool,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            waveform: PathBuf::from(DEFAULT_WAVEFORM),
            bufunit_size: DEFAULT_BUFUNIT_SIZE,
            verify_allocation: false,
            reject_empty: false,
            confirm_prompts: false,
        }
    }
}

/// Complete blgen configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlgenConfig {
    /// Configuration version
    pub version: String,
    /// Driver configuration
    pub driver: DriverConfig,
    /// Generation settings
    pub generation: GenerationConfig,
    /// Logging configuration
    pub logging: LogConfig,
    /// Generation profiles (name -> settings)
    pub profiles: HashMap<String, GenerationConfig>,
}

impl Default for BlgenConfig {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            driver: DriverConfig::default(),
            generation: GenerationConfig::default(),
            logging: LogConfig::default(),
            profiles: HashMap::new(),
        }
    }
}

impl BlgenConfig {
    /// Load configuration from the default search path.
    ///
    /// Search order:
    /// 1. `BLGEN_CONFIG` environment variable
    /// 2. `./blgen.yaml`
    /// 3. `~/.config/blgen/config.yaml`
    /// 4. `/etc/blgen/config.yaml`
    ///
    /// Returns default config if no file is found.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = std::env::var("BLGEN_CONFIG") {
            if Path::new(&path).exists() {
                return Self::load_from(Path::new(&path));
            }
            tracing::warn!(path = %path, "BLGEN_CONFIG points to a missing file");
        }

        for path in &Self::config_search_paths() {
            if path.exists() {
                return Self::load_from(path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;

        let config = Self::parse(&content)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content =
            serde_yaml::to_string(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))
    }

    /// Apply a generation profile by name.
    pub fn with_profile(&self, name: &str) -> Result<Self, ConfigError> {
        let profile = self
            .profiles
            .get(name)
            .ok_or_else(|| ConfigError::NotFound(format!("profile '{}' not found", name)))?;

        let mut config = self.clone();
        config.generation = profile.clone();
        Ok(config)
    }

    /// Get configuration search paths.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./blgen.yaml")];

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "blgen") {
            paths.push(config_dir.config_dir().join("config.yaml"));
        }

        paths.push(PathBuf::from("/etc/blgen/config.yaml"));

        paths
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let check = |name: &str, generation: &GenerationConfig| {
            if generation.bufunit_size < MIN_BUFUNIT_SIZE {
                return Err(ConfigError::ValidationError(format!(
                    "{}: bufunit_size must be at least {} bytes",
                    name, MIN_BUFUNIT_SIZE
                )));
            }
            if generation.waveform.as_os_str().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "{}: waveform path is empty",
                    name
                )));
            }
            Ok(())
        };

        check("generation", &self.generation)?;
        for (name, profile) in &self.profiles {
            check(&format!("profiles.{}", name), profile)?;
        }

        Ok(())
    }

    /// Generate example configuration YAML.
    pub fn example_yaml() -> String {
        let config = Self {
            profiles: {
                let mut profiles = HashMap::new();
                profiles.insert(
                    "spi_burst".to_string(),
                    GenerationConfig {
                        waveform: PathBuf::from("spi_burst.bin"),
                        bufunit_size: 65_536,
                        verify_allocation: true,
                        ..Default::default()
                    },
                );
                profiles
            },
            ..Default::default()
        };

        serde_yaml::to_string(&config).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = BlgenConfig::default();
        assert_eq!(config.driver.backend, Backend::BeagleLogic);
        assert_eq!(config.driver.device_path, PathBuf::from("/dev/beaglelogic"));
        assert_eq!(config.generation.waveform, PathBuf::from("PRUdata.bin"));
        assert_eq!(config.generation.bufunit_size, 640_000);
        assert!(!config.generation.verify_allocation);
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
driver:
  backend: simulator
  device_path: /tmp/beaglelogic

generation:
  waveform: /data/pattern.bin
  bufunit_size: 4096
  verify_allocation: true
  confirm_prompts: true
"#;

        let config = BlgenConfig::parse(yaml).unwrap();
        assert_eq!(config.driver.backend, Backend::Simulator);
        assert_eq!(config.driver.device_path, PathBuf::from("/tmp/beaglelogic"));
        assert_eq!(config.driver.sysfs_dir, PathBuf::from(DEFAULT_SYSFS_DIR));
        assert_eq!(config.generation.waveform, PathBuf::from("/data/pattern.bin"));
        assert_eq!(config.generation.bufunit_size, 4096);
        assert!(config.generation.verify_allocation);
        assert!(config.generation.confirm_prompts);
        assert!(!config.generation.reject_empty);
    }

    #[test]
    fn test_profiles() {
        let yaml = r#"
profiles:
  i2c:
    waveform: i2c.bin
    bufunit_size: 128
"#;

        let config = BlgenConfig::parse(yaml).unwrap();
        let i2c = config.with_profile("i2c").unwrap();
        assert_eq!(i2c.generation.waveform, PathBuf::from("i2c.bin"));
        assert_eq!(i2c.generation.bufunit_size, 128);
        assert!(config.with_profile("missing").is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = BlgenConfig::default();
        assert!(config.validate().is_ok());

        config.generation.bufunit_size = 32;
        assert!(config.validate().is_err());

        config.generation.bufunit_size = 64;
        config.profiles.insert(
            "bad".to_string(),
            GenerationConfig {
                waveform: PathBuf::new(),
                ..Default::default()
            },
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("profiles.bad"));
    }

    #[test]
    fn test_example_yaml() {
        let yaml = BlgenConfig::example_yaml();
        assert!(yaml.contains("driver:"));
        assert!(yaml.contains("spi_burst"));
        let parsed = BlgenConfig::parse(&yaml).unwrap();
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("blgen.yaml");

        let mut config = BlgenConfig::default();
        config.generation.bufunit_size = 8192;
        config.save(&path).unwrap();

        let loaded = BlgenConfig::load_from(&path).unwrap();
        assert_eq!(loaded.generation.bufunit_size, 8192);
        assert!(matches!(
            BlgenConfig::load_from(&dir.path().join("none.yaml")),
            Err(ConfigError::NotFound(_))
        ));
    }

    #[test]
    fn test_config_search_paths() {
        let paths = BlgenConfig::config_search_paths();
        assert!(paths[0].ends_with("blgen.yaml"));
        assert_eq!(paths.last().unwrap(), &PathBuf::from("/etc/blgen/config.yaml"));
    }
}
