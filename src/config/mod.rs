// src/config/mod.rs
//! Configuration management for the PURE-IT core

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::ConfigLoader;

use crate::calibration::{CalibrationTable, HandCalibration};
use crate::classification::{ScalingMode, TieBreak};
use crate::error::{PureItErrorBuilder, PureItResult};
use crate::processing::filters::FilterSpec;
use crate::processing::windowing::ProtocolSchedule;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete system configuration
#[derive(Debug, Default, Deserialize, Serialize, Clone, PartialEq)]
pub struct SystemConfig {
    #[serde(default)]
    pub emg: EmgConfig,
    #[serde(default)]
    pub flex: FlexConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub rehab: RehabConfig,
}

/// EMG acquisition and conditioning settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmgConfig {
    #[serde(default = "defaults::sampling_rate_hz")]
    pub sampling_rate_hz: u32,

    /// Column of each device row holding the raw signal
    #[serde(default = "defaults::signal_column")]
    pub signal_column: usize,

    /// Device rows requested on each tick
    #[serde(default = "defaults::batch_size")]
    pub batch_size: usize,

    #[serde(default = "defaults::tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "defaults::display_capacity")]
    pub display_capacity: usize,

    #[serde(default = "defaults::session_duration_s")]
    pub session_duration_s: f64,

    #[serde(default = "defaults::artifact_path")]
    pub artifact_path: PathBuf,

    #[serde(default)]
    pub filters: EmgFilterConfig,
}

/// Band-pass and envelope filter parameters
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EmgFilterConfig {
    #[serde(default = "defaults::bandpass_low_hz")]
    pub bandpass_low_hz: f64,

    #[serde(default = "defaults::bandpass_high_hz")]
    pub bandpass_high_hz: f64,

    #[serde(default = "defaults::bandpass_order")]
    pub bandpass_order: usize,

    /// Moving-average length of the RMS estimator, in samples
    #[serde(default = "defaults::envelope_window")]
    pub envelope_window: usize,

    #[serde(default = "defaults::envelope_cutoff_hz")]
    pub envelope_cutoff_hz: f64,

    #[serde(default = "defaults::envelope_order")]
    pub envelope_order: usize,
}

/// Flex glove recording settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FlexConfig {
    #[serde(default = "defaults::port")]
    pub port: String,

    #[serde(default = "defaults::baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "defaults::flex_duration_s")]
    pub duration_s: f64,

    #[serde(default = "defaults::read_timeout_ms")]
    pub read_timeout_ms: u64,

    #[serde(default = "defaults::settle_ms")]
    pub settle_ms: u64,

    #[serde(default)]
    pub calibration: CalibrationTable,

    #[serde(default)]
    pub protocol: ProtocolSchedule,
}

/// Classifier artifact and decision settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ClassifierConfig {
    #[serde(default = "defaults::model_path")]
    pub model_path: PathBuf,

    #[serde(default)]
    pub scaling: ScalingMode,

    #[serde(default)]
    pub tie_break: TieBreak,
}

/// Rehabilitation actuator settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RehabConfig {
    #[serde(default = "defaults::rehab_duration_s")]
    pub duration_s: u64,

    /// The relay module energises on a low output
    #[serde(default = "defaults::relay_active_low")]
    pub relay_active_low: bool,

    #[serde(default = "defaults::relay_pin")]
    pub relay_pin: u8,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;
    use std::path::PathBuf;

    pub fn sampling_rate_hz() -> u32 { emg::DEFAULT_SAMPLING_RATE_HZ }
    pub fn signal_column() -> usize { emg::DEFAULT_SIGNAL_COLUMN }
    pub fn batch_size() -> usize { emg::DEFAULT_BATCH_SIZE }
    pub fn tick_interval_ms() -> u64 { emg::DEFAULT_TICK_INTERVAL_MS }
    pub fn display_capacity() -> usize { emg::DEFAULT_DISPLAY_CAPACITY }
    pub fn session_duration_s() -> f64 { emg::DEFAULT_SESSION_DURATION_S }
    pub fn artifact_path() -> PathBuf { PathBuf::from(emg::DEFAULT_ARTIFACT_PATH) }

    pub fn bandpass_low_hz() -> f64 { filters::DEFAULT_BANDPASS_LOW_HZ }
    pub fn bandpass_high_hz() -> f64 { filters::DEFAULT_BANDPASS_HIGH_HZ }
    pub fn bandpass_order() -> usize { filters::DEFAULT_BANDPASS_ORDER }
    pub fn envelope_window() -> usize { filters::DEFAULT_ENVELOPE_WINDOW }
    pub fn envelope_cutoff_hz() -> f64 { filters::DEFAULT_ENVELOPE_CUTOFF_HZ }
    pub fn envelope_order() -> usize { filters::DEFAULT_ENVELOPE_ORDER }

    pub fn port() -> String { flex::DEFAULT_PORT.to_string() }
    pub fn baud_rate() -> u32 { flex::DEFAULT_BAUD_RATE }
    pub fn flex_duration_s() -> f64 { flex::DEFAULT_DURATION_S }
    pub fn read_timeout_ms() -> u64 { flex::DEFAULT_READ_TIMEOUT_MS }
    pub fn settle_ms() -> u64 { flex::DEFAULT_SETTLE_MS }

    pub fn model_path() -> PathBuf { PathBuf::from(classifier::DEFAULT_MODEL_PATH) }

    pub fn rehab_duration_s() -> u64 { rehab::DEFAULT_DURATION_S }
    pub fn relay_active_low() -> bool { true }
    pub fn relay_pin() -> u8 { rehab::DEFAULT_RELAY_PIN }
}

impl Default for EmgConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: defaults::sampling_rate_hz(),
            signal_column: defaults::signal_column(),
            batch_size: defaults::batch_size(),
            tick_interval_ms: defaults::tick_interval_ms(),
            display_capacity: defaults::display_capacity(),
            session_duration_s: defaults::session_duration_s(),
            artifact_path: defaults::artifact_path(),
            filters: EmgFilterConfig::default(),
        }
    }
}

impl Default for EmgFilterConfig {
    fn default() -> Self {
        Self {
            bandpass_low_hz: defaults::bandpass_low_hz(),
            bandpass_high_hz: defaults::bandpass_high_hz(),
            bandpass_order: defaults::bandpass_order(),
            envelope_window: defaults::envelope_window(),
            envelope_cutoff_hz: defaults::envelope_cutoff_hz(),
            envelope_order: defaults::envelope_order(),
        }
    }
}

impl Default for FlexConfig {
    fn default() -> Self {
        Self {
            port: defaults::port(),
            baud_rate: defaults::baud_rate(),
            duration_s: defaults::flex_duration_s(),
            read_timeout_ms: defaults::read_timeout_ms(),
            settle_ms: defaults::settle_ms(),
            calibration: CalibrationTable::default(),
            protocol: ProtocolSchedule::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model_path: defaults::model_path(),
            scaling: ScalingMode::default(),
            tie_break: TieBreak::default(),
        }
    }
}

impl Default for RehabConfig {
    fn default() -> Self {
        Self {
            duration_s: defaults::rehab_duration_s(),
            relay_active_low: defaults::relay_active_low(),
            relay_pin: defaults::relay_pin(),
        }
    }
}

impl EmgFilterConfig {
    pub fn bandpass_spec(&self, sampling_rate_hz: u32) -> FilterSpec {
        FilterSpec::bandpass(
            self.bandpass_low_hz,
            self.bandpass_high_hz,
            self.bandpass_order,
            sampling_rate_hz as f64,
        )
    }

    pub fn envelope_spec(&self, sampling_rate_hz: u32) -> FilterSpec {
        FilterSpec::lowpass(
            self.envelope_cutoff_hz,
            self.envelope_order,
            sampling_rate_hz as f64,
        )
    }
}

impl EmgConfig {
    pub fn validate(&self) -> PureItResult<()> {
        let err = |reason: String| PureItErrorBuilder::new("emg", "validate").configuration(&reason);

        if !(emg::MIN_SAMPLING_RATE_HZ..=emg::MAX_SAMPLING_RATE_HZ).contains(&self.sampling_rate_hz) {
            return Err(err(format!(
                "Sampling rate {} Hz outside {}-{} Hz",
                self.sampling_rate_hz,
                emg::MIN_SAMPLING_RATE_HZ,
                emg::MAX_SAMPLING_RATE_HZ
            )));
        }
        if self.batch_size == 0 {
            return Err(err("Batch size must be at least one sample".to_string()));
        }
        if self.tick_interval_ms == 0 {
            return Err(err("Tick interval must be positive".to_string()));
        }
        if self.display_capacity == 0 {
            return Err(err("Display capacity must be at least one sample".to_string()));
        }
        if !(self.session_duration_s.is_finite() && self.session_duration_s > 0.0) {
            return Err(err(format!(
                "Invalid session duration: {} s",
                self.session_duration_s
            )));
        }
        if self.filters.envelope_window == 0 {
            return Err(err("Envelope window must be at least one sample".to_string()));
        }

        self.filters.bandpass_spec(self.sampling_rate_hz).validate()?;
        self.filters.envelope_spec(self.sampling_rate_hz).validate()?;
        Ok(())
    }
}

impl FlexConfig {
    pub fn validate(&self) -> PureItResult<()> {
        let err = |reason: String| PureItErrorBuilder::new("flex", "validate").configuration(&reason);

        if self.port.trim().is_empty() {
            return Err(err("Serial port must not be empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(err("Baud rate must be positive".to_string()));
        }
        if !(self.duration_s.is_finite() && self.duration_s > 0.0) {
            return Err(err(format!("Invalid recording duration: {} s", self.duration_s)));
        }
        if self.read_timeout_ms == 0 {
            return Err(err("Read timeout must be positive".to_string()));
        }

        HandCalibration::from_table(&self.calibration)?;
        self.protocol.validate()?;

        if self.protocol.analysis_end_s > self.duration_s {
            return Err(err(format!(
                "Analysis window ends at {} s, after the {} s recording",
                self.protocol.analysis_end_s, self.duration_s
            )));
        }
        Ok(())
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> PureItResult<()> {
        if self.model_path.as_os_str().is_empty() {
            return Err(PureItErrorBuilder::new("classifier", "validate")
                .configuration("Model path must not be empty"));
        }
        self.scaling.validate()
    }
}

impl RehabConfig {
    pub fn validate(&self) -> PureItResult<()> {
        if self.duration_s == 0 {
            return Err(PureItErrorBuilder::new("rehab", "validate")
                .configuration("Rehabilitation duration must be positive"));
        }
        Ok(())
    }
}

impl SystemConfig {
    /// Validate every section, stopping at the first problem
    pub fn validate(&self) -> PureItResult<()> {
        self.emg.validate()?;
        self.flex.validate()?;
        self.classifier.validate()?;
        self.rehab.validate()
    }

    /// One-line description for the startup log
    pub fn summary(&self) -> String {
        format!(
            "emg {} Hz col {} batch {} | flex {} @ {} baud for {} s | model {}",
            self.emg.sampling_rate_hz,
            self.emg.signal_column,
            self.emg.batch_size,
            self.flex.port,
            self.flex.baud_rate,
            self.flex.duration_s,
            self.classifier.model_path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationPair;
    use crate::error::PureItError;

    #[test]
    fn test_default_config_is_valid() {
        let config = SystemConfig::default();
        assert_eq!(config.emg.sampling_rate_hz, emg::DEFAULT_SAMPLING_RATE_HZ);
        assert_eq!(config.emg.filters.envelope_window, 200);
        assert_eq!(config.flex.baud_rate, 115200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = SystemConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: SystemConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: SystemConfig = toml::from_str(
            r#"
            [emg]
            sampling_rate_hz = 2000

            [flex.calibration]
            thumb = { adc_min = 100, adc_max = 900 }
            "#,
        )
        .unwrap();

        assert_eq!(config.emg.sampling_rate_hz, 2000);
        assert_eq!(config.emg.batch_size, emg::DEFAULT_BATCH_SIZE);
        assert_eq!(config.flex.calibration.thumb, CalibrationPair::new(100, 900));
        assert_eq!(config.flex.calibration.index, CalibrationPair::new(251, 649));
    }

    #[test]
    fn test_cutoff_above_nyquist_rejected() {
        let mut config = SystemConfig::default();
        config.emg.sampling_rate_hz = 800;
        assert!(matches!(config.validate(), Err(PureItError::Filter(_))));
    }

    #[test]
    fn test_inverted_calibration_rejected() {
        let mut config = SystemConfig::default();
        config.flex.calibration.middle = CalibrationPair::new(554, 202);
        assert!(matches!(
            config.validate(),
            Err(PureItError::Calibration { adc_min: 554, adc_max: 202, .. })
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = SystemConfig::default();
        config.emg.filters.envelope_window = 0;
        assert!(matches!(config.validate(), Err(PureItError::Configuration { .. })));
    }
}
