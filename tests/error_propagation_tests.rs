// tests/error_propagation_tests.rs
//! Error propagation and handling tests
//!
//! Checks that failures keep their category and context from the component
//! that raised them up to the operator-facing message.

use pureit_core::calibration::{CalibrationPair, CalibrationTable, HandCalibration};
use pureit_core::classification::load_model;
use pureit_core::config::loader::ConfigLoader;
use pureit_core::config::FlexConfig;
use pureit_core::error::{
    BatchOutcome, CommunicationProtocol, ErrorContext, ProcessingStage, PureItError, PureItErrorBuilder,
};
use pureit_core::hal::open_serial_port;
use pureit_core::processing::EmgConditioner;
use pureit_core::{Finger, SystemConfig};
use std::error::Error;
use std::time::SystemTime;

/// Calibration with inverted extremes is rejected, naming the finger
#[test]
fn test_calibration_error_names_finger() {
    let table = CalibrationTable {
        index: CalibrationPair::new(649, 251),
        ..CalibrationTable::default()
    };

    let err = HandCalibration::from_table(&table).unwrap_err();
    match &err {
        PureItError::Calibration { finger, adc_min, adc_max } => {
            assert_eq!(*finger, Finger::Index);
            assert_eq!((*adc_min, *adc_max), (649, 251));
        }
        other => panic!("Expected Calibration error, got: {:?}", other),
    }
    assert!(err.is_operator_reportable());
    assert_eq!(err.operator_message(), "bad calibration: index");
    assert!(err.to_string().contains("[CALIBRATION]"));
}

/// A configuration that passes parsing but fails validation is rejected at load
#[test]
fn test_invalid_calibration_rejected_at_load() {
    let err = ConfigLoader::load_from_str(
        r#"
        [flex.calibration.ring]
        adc_min = 514
        adc_max = 514
        "#,
    )
    .unwrap_err();
    assert!(matches!(err, PureItError::Calibration { finger: Finger::Ring, .. }));
}

/// Filter design problems surface as filter errors
#[test]
fn test_cutoff_above_nyquist_is_filter_error() {
    let mut config = SystemConfig::default();
    config.emg.filters.bandpass_high_hz = 600.0;

    let err = EmgConditioner::new(&config.emg).unwrap_err();
    assert!(matches!(err, PureItError::Filter(_)));
    assert!(err.to_string().starts_with("[FILTER]"));
    assert!(config.validate().is_err());
}

/// An unopenable serial port is a communication error the operator sees
#[test]
fn test_serial_open_failure() {
    let config = FlexConfig {
        port: "/nonexistent/ttyUSB9".to_string(),
        ..FlexConfig::default()
    };
    let err = open_serial_port(&config).map(|_| ()).unwrap_err();

    match &err {
        PureItError::Communication { protocol, operation, context, .. } => {
            assert_eq!(*protocol, CommunicationProtocol::Serial);
            assert_eq!(operation, "open /nonexistent/ttyUSB9");
            assert_eq!(context.operation, "open /nonexistent/ttyUSB9");
        }
        other => panic!("Expected Communication error, got: {:?}", other),
    }
    assert!(err.is_operator_reportable());
    assert_eq!(err.operator_message(), "cannot open /nonexistent/ttyUSB9");
}

/// Missing model is reported, not a crash
#[test]
fn test_missing_model_operator_message() {
    let err = load_model("/nonexistent/models/svm_flex.json").unwrap_err();
    assert!(matches!(err, PureItError::ModelNotFound { .. }));
    assert!(err.is_operator_reportable());
    assert_eq!(err.operator_message(), "model not found");
}

/// Numeric failures are per batch and never shown to the operator
#[test]
fn test_processing_error_stage() {
    let conditioner = EmgConditioner::new(&SystemConfig::default().emg).unwrap();
    let err = conditioner.condition(&[1.0, f64::INFINITY, 3.0]).unwrap_err();

    match &err {
        PureItError::Processing { stage, context, .. } => {
            assert_eq!(*stage, ProcessingStage::Acquisition);
            assert_eq!(context.component, "conditioner");
        }
        other => panic!("Expected Processing error, got: {:?}", other),
    }
    assert!(!err.is_operator_reportable());
}

#[test]
fn test_error_context_preservation() {
    let before = SystemTime::now();
    let err = PureItErrorBuilder::new("pipeline", "process_batch")
        .invalid_data("batch", "empty batch");

    match err {
        PureItError::InvalidData { data_type, reason, context } => {
            assert_eq!(data_type, "batch");
            assert_eq!(reason, "empty batch");
            assert_eq!(context.component, "pipeline");
            assert_eq!(context.operation, "process_batch");
            assert!(context.timestamp >= before);
        }
        other => panic!("Expected InvalidData error, got: {:?}", other),
    }
}

#[test]
fn test_error_context_macro() {
    let context: ErrorContext = pureit_core::error_context!("sink", "append");
    assert_eq!(context.component, "sink");
    assert!(context.file.unwrap().ends_with("error_propagation_tests.rs"));
}

/// I/O errors keep their source for chaining
#[test]
fn test_io_error_source_chain() {
    let err = ConfigLoader::validate_config_file("/nonexistent/pureit.toml").unwrap_err();
    assert!(matches!(err, PureItError::Io { .. }));
    assert!(err.source().is_some());
}

#[test]
fn test_batch_outcome_helpers() {
    let processed: BatchOutcome<usize> = BatchOutcome::Processed(50);
    assert!(processed.is_processed());
    assert_eq!(processed.map(|n| n * 2).processed(), Some(100));

    let skipped: BatchOutcome<usize> = BatchOutcome::SkippedTransient("no data this tick".to_string());
    assert!(!skipped.is_fatal());
    assert_eq!(skipped.processed(), None);

    let fatal: BatchOutcome<usize> =
        BatchOutcome::Fatal(PureItErrorBuilder::new("sink", "append").configuration("disk full"));
    assert!(fatal.is_fatal());
    assert!(matches!(fatal.map(|n| n + 1), BatchOutcome::Fatal(_)));
}

/// Errors cross thread boundaries, as they do out of a blocking recording task
#[test]
fn test_error_is_send_and_sync() {
    fn assert_send_sync<T: Send + Sync + 'static>() {}
    assert_send_sync::<PureItError>();

    let handle = std::thread::spawn(|| {
        PureItErrorBuilder::new("flex", "read").communication(CommunicationProtocol::Serial, "unplugged")
    });
    let err = handle.join().unwrap();
    assert_eq!(err.operator_message(), "cannot read");
}
