// tests/config_tests.rs
//! Configuration loading and validation tests

use pureit_core::classification::{ScalingMode, TieBreak};
use pureit_core::config::loader::ConfigLoader;
use pureit_core::config::SystemConfig;
use pureit_core::error::PureItError;
use pureit_core::Finger;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{tempdir, NamedTempFile};

fn toml_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::with_suffix(".toml").unwrap();
    write!(file, "{}", content).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn test_defaults_describe_the_device() {
    let config = SystemConfig::default();
    assert!(config.validate().is_ok());

    assert_eq!(config.emg.sampling_rate_hz, 1000);
    assert_eq!(config.emg.signal_column, 5);
    assert_eq!(config.emg.filters.envelope_window, 200);
    assert_eq!(config.flex.duration_s, 30.0);
    assert_eq!(config.flex.calibration.pair(Finger::Thumb).adc_min, 226);
    assert_eq!(config.flex.calibration.pair(Finger::Little).adc_max, 506);
    assert_eq!(config.classifier.scaling, ScalingMode::PerSession);
    assert_eq!(config.classifier.tie_break, TieBreak::Inconclusive);
    assert_eq!(config.rehab.duration_s, 10);
}

#[test]
fn test_file_overrides_selected_fields() {
    let file = toml_file(
        r#"
        [emg]
        sampling_rate_hz = 2000
        artifact_path = "session.csv"

        [flex]
        port = "/dev/ttyACM0"

        [flex.calibration.thumb]
        adc_min = 200
        adc_max = 430

        [classifier]
        tie_break = "prefer_negative"

        [classifier.scaling]
        mode = "persisted"
        mean = [90.0, 90.0, 90.0, 90.0, 90.0]
        std = [30.0, 30.0, 30.0, 30.0, 30.0]
        "#,
    );

    let config = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .with_env_prefix("PUREIT_TEST_FILE_OVERRIDES")
        .load_system_config()
        .unwrap();

    assert_eq!(config.emg.sampling_rate_hz, 2000);
    assert_eq!(config.emg.artifact_path, PathBuf::from("session.csv"));
    assert_eq!(config.emg.batch_size, SystemConfig::default().emg.batch_size);
    assert_eq!(config.flex.port, "/dev/ttyACM0");
    assert_eq!(config.flex.calibration.thumb.adc_max, 430);
    assert_eq!(config.flex.calibration.index, SystemConfig::default().flex.calibration.index);
    assert_eq!(config.classifier.tie_break, TieBreak::PreferNegative);
    assert!(matches!(config.classifier.scaling, ScalingMode::Persisted { .. }));
}

#[test]
fn test_environment_overrides_file() {
    let file = toml_file("[rehab]\nduration_s = 20\n");
    std::env::set_var("PUREIT_TEST_ENV__REHAB__DURATION_S", "45");

    let config = ConfigLoader::with_paths(vec![file.path().to_path_buf()])
        .with_env_prefix("PUREIT_TEST_ENV")
        .load_system_config()
        .unwrap();
    std::env::remove_var("PUREIT_TEST_ENV__REHAB__DURATION_S");

    assert_eq!(config.rehab.duration_s, 45);
}

#[test]
fn test_missing_files_fall_back_to_defaults() {
    let config = ConfigLoader::with_paths(vec![PathBuf::from("/nonexistent/pureit.toml")])
        .with_env_prefix("PUREIT_TEST_MISSING")
        .load_system_config()
        .unwrap();
    assert_eq!(config, SystemConfig::default());
}

#[test]
fn test_export_then_validate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("exported.toml");
    let mut config = SystemConfig::default();
    config.flex.duration_s = 32.0;
    config.classifier.tie_break = TieBreak::PreferPositive;

    ConfigLoader::export_config(&config, &path).unwrap();
    ConfigLoader::validate_config_file(&path).unwrap();

    let reloaded = ConfigLoader::with_paths(vec![path])
        .with_env_prefix("PUREIT_TEST_EXPORT")
        .load_system_config()
        .unwrap();
    assert_eq!(reloaded, config);
}

#[test]
fn test_overlapping_protocol_rejected() {
    let result = ConfigLoader::load_from_str(
        r#"
        [flex.protocol]
        analysis_start_s = 5.0
        analysis_end_s = 25.0

        [[flex.protocol.intervals]]
        start_s = 5.0
        end_s = 12.0
        condition = "contraction"

        [[flex.protocol.intervals]]
        start_s = 10.0
        end_s = 25.0
        condition = "relaxation"
        "#,
    );
    assert!(matches!(result, Err(PureItError::Configuration { .. })));
}

#[test]
fn test_analysis_window_longer_than_recording_rejected() {
    let result = ConfigLoader::load_from_str("[flex]\nduration_s = 20.0\n");
    assert!(matches!(result, Err(PureItError::Configuration { .. })));
}

#[test]
fn test_envelope_cutoff_above_nyquist_rejected() {
    let result = ConfigLoader::load_from_str("[emg.filters]\nenvelope_cutoff_hz = 600.0\n");
    assert!(matches!(result, Err(PureItError::Filter(_))));
}

#[test]
fn test_malformed_toml_is_configuration_error() {
    let result = ConfigLoader::load_from_str("[emg\nsampling_rate_hz = ");
    assert!(matches!(result, Err(PureItError::Configuration { .. })));
}
