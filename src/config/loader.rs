// src/config/loader.rs
//! Layered configuration loading: defaults, TOML files, then environment

use crate::config::{constants::paths, SystemConfig};
use crate::error::{PureItError, PureItErrorBuilder, PureItResult};
use config::{Config, Environment, File, FileFormat};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Loads [`SystemConfig`] from optional TOML files and prefixed environment
/// variables, then validates the result.
///
/// Later sources override earlier ones. An environment variable such as
/// `PUREIT__EMG__SAMPLING_RATE_HZ=2000` overrides `emg.sampling_rate_hz`.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_paths: Vec<PathBuf>,
    env_prefix: String,
}

impl ConfigLoader {
    /// Loader over the default file locations
    pub fn new() -> Self {
        Self {
            config_paths: Self::discover_config_paths(),
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    /// Loader over explicit files, in increasing precedence
    pub fn with_paths(paths: Vec<PathBuf>) -> Self {
        Self {
            config_paths: paths,
            env_prefix: paths::ENV_PREFIX.to_string(),
        }
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    pub fn config_paths(&self) -> &[PathBuf] {
        &self.config_paths
    }

    /// Load, merge and validate the system configuration
    pub fn load_system_config(&self) -> PureItResult<SystemConfig> {
        let mut builder = Config::builder();
        for path in &self.config_paths {
            if path.exists() {
                debug!("Reading configuration from {}", path.display());
            }
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }
        builder = builder.add_source(
            Environment::with_prefix(&self.env_prefix)
                .prefix_separator(paths::ENV_SEPARATOR)
                .separator(paths::ENV_SEPARATOR)
                .try_parsing(true),
        );

        let config: SystemConfig = builder
            .build()
            .and_then(|merged| merged.try_deserialize())
            .map_err(|e| config_error("load", e))?;

        config.validate()?;
        info!("Configuration loaded: {}", config.summary());
        Ok(config)
    }

    /// Parse and validate a TOML document without touching the environment
    pub fn load_from_str(content: &str) -> PureItResult<SystemConfig> {
        let config: SystemConfig = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .and_then(|merged| merged.try_deserialize())
            .map_err(|e| config_error("parse", e))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate a configuration file without loading it into a running system
    pub fn validate_config_file<P: AsRef<Path>>(path: P) -> PureItResult<()> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| PureItError::Io {
            operation: format!("read {}", path.as_ref().display()),
            source: std::sync::Arc::new(e),
        })?;
        Self::load_from_str(&content).map(|_| ())
    }

    /// Write a configuration out as TOML
    pub fn export_config<P: AsRef<Path>>(config: &SystemConfig, path: P) -> PureItResult<()> {
        let toml_content = toml::to_string_pretty(config).map_err(|e| {
            PureItErrorBuilder::new("config_loader", "export").configuration(&e.to_string())
        })?;
        std::fs::write(path, toml_content)?;
        Ok(())
    }

    fn discover_config_paths() -> Vec<PathBuf> {
        vec![
            PathBuf::from(paths::DEFAULT_CONFIG_FILE),
            PathBuf::from(paths::LOCAL_CONFIG_FILE),
        ]
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn config_error(operation: &str, err: config::ConfigError) -> PureItError {
    PureItErrorBuilder::new("config_loader", operation).configuration(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn toml_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_missing_files_fall_back_to_defaults() {
        let loader = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/pureit.toml")])
            .with_env_prefix("PUREIT_LOADER_TEST_DEFAULTS");
        let config = loader.load_system_config().unwrap();
        assert_eq!(config, SystemConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = toml_file(
            r#"
[emg]
sampling_rate_hz = 2000
batch_size = 100

[classifier]
tie_break = "prefer_negative"
"#,
        );
        let loader = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
            .with_env_prefix("PUREIT_LOADER_TEST_FILE");
        let config = loader.load_system_config().unwrap();

        assert_eq!(config.emg.sampling_rate_hz, 2000);
        assert_eq!(config.emg.batch_size, 100);
        assert_eq!(config.emg.signal_column, 5);
        assert_eq!(config.classifier.tie_break, crate::classification::TieBreak::PreferNegative);
    }

    #[test]
    fn test_environment_override() {
        unsafe {
            std::env::set_var("PUREIT_LOADER_TEST_ENV__EMG__BATCH_SIZE", "25");
        }

        let loader = ConfigLoader::with_paths(Vec::new()).with_env_prefix("PUREIT_LOADER_TEST_ENV");
        let config = loader.load_system_config().unwrap();
        assert_eq!(config.emg.batch_size, 25);

        unsafe {
            std::env::remove_var("PUREIT_LOADER_TEST_ENV__EMG__BATCH_SIZE");
        }
    }

    #[test]
    fn test_inverted_calibration_rejected_at_load() {
        let result = ConfigLoader::load_from_str(
            r#"
[flex.calibration]
ring = { adc_min = 514, adc_max = 189 }
"#,
        );
        assert!(matches!(result, Err(PureItError::Calibration { .. })));
    }

    #[test]
    fn test_validate_config_file() {
        let good = toml_file("[rehab]\nduration_s = 20\n");
        assert!(ConfigLoader::validate_config_file(good.path()).is_ok());

        let bad = toml_file("[emg]\nsampling_rate_hz = 50\n");
        assert!(ConfigLoader::validate_config_file(bad.path()).is_err());
    }

    #[test]
    fn test_config_export_round_trip() {
        let file = NamedTempFile::with_suffix(".toml").unwrap();
        ConfigLoader::export_config(&SystemConfig::default(), file.path()).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert!(content.contains("[emg]"));
        assert_eq!(ConfigLoader::load_from_str(&content).unwrap(), SystemConfig::default());
    }
}
