// src/config/constants.rs
//! System-wide configuration constants

/// EMG acquisition and conditioning constants
pub mod emg {
    pub const DEFAULT_SAMPLING_RATE_HZ: u32 = 1000;
    /// Column of a device row carrying the raw A1 signal
    pub const DEFAULT_SIGNAL_COLUMN: usize = 5;
    pub const DEFAULT_BATCH_SIZE: usize = 50;
    pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;
    pub const DEFAULT_DISPLAY_CAPACITY: usize = 2000;
    pub const DEFAULT_SESSION_DURATION_S: f64 = 35.0;
    pub const DEFAULT_ARTIFACT_PATH: &str = "emg_data_A1.csv";

    pub const MIN_SAMPLING_RATE_HZ: u32 = 100;
    pub const MAX_SAMPLING_RATE_HZ: u32 = 10000;
}

/// Filter design constants
pub mod filters {
    pub const DEFAULT_BANDPASS_LOW_HZ: f64 = 20.0;
    pub const DEFAULT_BANDPASS_HIGH_HZ: f64 = 450.0;
    pub const DEFAULT_BANDPASS_ORDER: usize = 4;

    pub const DEFAULT_ENVELOPE_WINDOW: usize = 200;
    pub const DEFAULT_ENVELOPE_CUTOFF_HZ: f64 = 5.0;
    pub const DEFAULT_ENVELOPE_ORDER: usize = 4;

    pub const MIN_FILTER_ORDER: usize = 1;
    pub const MAX_FILTER_ORDER: usize = 8;
}

/// Flex glove link constants
pub mod flex {
    pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
    pub const DEFAULT_BAUD_RATE: u32 = 115200;
    pub const DEFAULT_DURATION_S: f64 = 30.0;
    pub const DEFAULT_READ_TIMEOUT_MS: u64 = 1000;
    /// Time the glove needs after the port opens before lines are trustworthy
    pub const DEFAULT_SETTLE_MS: u64 = 2000;
    pub const FIELDS_PER_LINE: usize = 5;
}

/// Per-finger calibration extremes `(adc_min, adc_max)`
pub mod calibration {
    pub const THUMB: (i32, i32) = (226, 424);
    pub const INDEX: (i32, i32) = (251, 649);
    pub const MIDDLE: (i32, i32) = (202, 554);
    pub const RING: (i32, i32) = (189, 514);
    pub const LITTLE: (i32, i32) = (189, 506);
}

/// Detection protocol timing, seconds from the start signal
pub mod protocol {
    pub const ANALYSIS_START_S: f64 = 5.0;
    pub const ANALYSIS_END_S: f64 = 25.0;
    pub const SUB_WINDOW_S: f64 = 5.0;
}

/// Classifier constants
pub mod classifier {
    pub const DEFAULT_MODEL_PATH: &str = "models/svm_flex.json";
    /// Guards division when a feature column is constant over a session
    pub const MIN_STD: f64 = 1e-12;
}

/// Configuration file discovery
pub mod paths {
    pub const DEFAULT_CONFIG_FILE: &str = "pureit.toml";
    pub const LOCAL_CONFIG_FILE: &str = "config/pureit.toml";
    pub const ENV_PREFIX: &str = "PUREIT";
    pub const ENV_SEPARATOR: &str = "__";
}

/// Rehabilitation actuator constants
pub mod rehab {
    pub const DEFAULT_DURATION_S: u64 = 10;
    pub const DEFAULT_RELAY_PIN: u8 = 4;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bandpass_below_nyquist() {
        let nyquist = emg::DEFAULT_SAMPLING_RATE_HZ as f64 / 2.0;
        assert!(filters::DEFAULT_BANDPASS_HIGH_HZ < nyquist);
        assert!(filters::DEFAULT_BANDPASS_LOW_HZ < filters::DEFAULT_BANDPASS_HIGH_HZ);
        assert!(filters::DEFAULT_ENVELOPE_CUTOFF_HZ < nyquist);
    }

    #[test]
    fn test_calibration_defaults_are_ordered() {
        for (lo, hi) in [
            calibration::THUMB,
            calibration::INDEX,
            calibration::MIDDLE,
            calibration::RING,
            calibration::LITTLE,
        ] {
            assert!(hi > lo);
        }
    }

    #[test]
    fn test_protocol_fits_recording() {
        assert!(protocol::ANALYSIS_END_S <= flex::DEFAULT_DURATION_S);
        let span = protocol::ANALYSIS_END_S - protocol::ANALYSIS_START_S;
        assert_eq!(span, 4.0 * protocol::SUB_WINDOW_S);
    }
}
