// src/classification/detection.rs
//! One CTS screening run: record, window, classify, reduce

use super::model::{load_model, DecisionFunction};
use super::scaler::StandardScaler;
use super::verdict::{reduce_predictions, VerdictSummary};
use crate::acquisition::flex::{FlexRecorder, FlexRecording};
use crate::calibration::{HandCalibration, FINGER_COUNT};
use crate::config::{ClassifierConfig, SystemConfig};
use crate::error::{PureItError, PureItResult};
use crate::hal::traits::{LineSource, OperatorSurface};
use crate::processing::windowing::{condition_counts, ProtocolSchedule, WindowRecord};
use crate::utils::time::TimeProvider;
use crossbeam::channel::Receiver;
use ndarray::Array2;
use std::path::Path;
use tracing::{debug, error, info};

/// Outcome of a completed detection run
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionResult {
    pub summary: VerdictSummary,
    /// Samples captured by the recorder, before windowing
    pub samples_recorded: usize,
    pub rows_classified: usize,
    /// `[contraction, relaxation, unknown]` rows among those classified
    pub condition_counts: [usize; 3],
}

/// Angles of each record as one feature row
pub fn features_matrix(records: &[WindowRecord]) -> Array2<f64> {
    Array2::from_shape_fn((records.len(), FINGER_COUNT), |(row, col)| records[row].angles[col])
}

/// Standardise the records' angles and vote on the model's predictions
pub fn classify_records(
    records: &[WindowRecord],
    model: &dyn DecisionFunction,
    config: &ClassifierConfig,
) -> PureItResult<VerdictSummary> {
    if records.is_empty() {
        return Err(PureItError::InsufficientData {
            operation: "classification".to_string(),
            reason: "no rows inside the analysis window".to_string(),
        });
    }

    let features = features_matrix(records);
    let scaler = StandardScaler::for_session(&config.scaling, features.view())?;
    let scaled = scaler.transform(features.view())?;
    let predictions = model.predict(scaled.view())?;
    if predictions.len() != records.len() {
        return Err(PureItError::Model {
            reason: format!("{} predictions for {} rows", predictions.len(), records.len()),
        });
    }

    reduce_predictions(&predictions, config.tie_break)
}

enum ModelChoice<'a> {
    Load(&'a Path),
    Provided(&'a dyn DecisionFunction),
}

/// Detection session built from configuration
#[derive(Debug, Clone)]
pub struct Detector {
    calibration: HandCalibration,
    schedule: ProtocolSchedule,
    recorder: FlexRecorder,
    classifier: ClassifierConfig,
}

impl Detector {
    pub fn from_config(config: &SystemConfig) -> PureItResult<Self> {
        config.flex.validate()?;
        config.classifier.validate()?;
        Ok(Self {
            calibration: HandCalibration::from_table(&config.flex.calibration)?,
            schedule: config.flex.protocol.clone(),
            recorder: FlexRecorder::from_config(&config.flex),
            classifier: config.classifier.clone(),
        })
    }

    pub fn recorder(&self) -> &FlexRecorder {
        &self.recorder
    }

    pub fn schedule(&self) -> &ProtocolSchedule {
        &self.schedule
    }

    pub fn calibration(&self) -> &HandCalibration {
        &self.calibration
    }

    /// Calibrate every sample and keep the labelled rows of the analysis window
    pub fn preprocess(&self, recording: &FlexRecording) -> Vec<WindowRecord> {
        let records = self
            .schedule
            .label_session(recording.angle_rows(&self.calibration));
        debug!(
            "{} of {} samples inside the analysis window",
            records.len(),
            recording.len()
        );
        records
    }

    pub fn evaluate(&self, records: &[WindowRecord], model: &dyn DecisionFunction) -> PureItResult<VerdictSummary> {
        classify_records(records, model, &self.classifier)
    }

    /// Full run with the configured model file.
    ///
    /// Failures worth telling the operator about are shown on `surface` before
    /// the error is returned, so the caller only has to go back to idle.
    pub fn run<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        clock: &dyn TimeProvider,
        stop: Option<&Receiver<()>>,
        surface: &mut dyn OperatorSurface,
    ) -> PureItResult<DetectionResult> {
        let model_path = self.classifier.model_path.clone();
        self.run_reporting(source, clock, stop, surface, ModelChoice::Load(&model_path))
    }

    /// Full run with an already loaded decision function
    pub fn run_with_model<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        clock: &dyn TimeProvider,
        stop: Option<&Receiver<()>>,
        surface: &mut dyn OperatorSurface,
        model: &dyn DecisionFunction,
    ) -> PureItResult<DetectionResult> {
        self.run_reporting(source, clock, stop, surface, ModelChoice::Provided(model))
    }

    fn run_reporting<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        clock: &dyn TimeProvider,
        stop: Option<&Receiver<()>>,
        surface: &mut dyn OperatorSurface,
        model: ModelChoice<'_>,
    ) -> PureItResult<DetectionResult> {
        match self.run_steps(source, clock, stop, surface, model) {
            Ok(result) => {
                info!(
                    "Detection finished: {} over {} rows",
                    result.summary, result.rows_classified
                );
                surface.show_verdict(&result.summary);
                Ok(result)
            }
            Err(e) => {
                error!("Detection aborted: {}", e);
                if e.is_operator_reportable() {
                    surface.report_error(&e);
                }
                Err(e)
            }
        }
    }

    fn run_steps<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        clock: &dyn TimeProvider,
        stop: Option<&Receiver<()>>,
        surface: &mut dyn OperatorSurface,
        model: ModelChoice<'_>,
    ) -> PureItResult<DetectionResult> {
        let recording = self.recorder.record(source, clock, stop, Some(&mut *surface))?;
        surface.show_status("Processing...");
        let records = self.preprocess(&recording);

        let summary = match model {
            ModelChoice::Load(path) => {
                let loaded = load_model(path)?;
                self.evaluate(&records, &loaded)?
            }
            ModelChoice::Provided(model) => self.evaluate(&records, model)?,
        };

        Ok(DetectionResult {
            summary,
            samples_recorded: recording.len(),
            rows_classified: records.len(),
            condition_counts: condition_counts(&records),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::model::ClassLabel;
    use crate::classification::verdict::{TieBreak, Verdict};
    use crate::hal::devices::RecordingSurface;
    use crate::hal::simulation::{FlexSimulationConfig, SyntheticFlexSource};
    use crate::processing::windowing::Condition;
    use crate::utils::time::MockTimeProvider;
    use ndarray::ArrayView2;
    use std::sync::Arc;

    /// Predicts label 1 for rows whose first scaled feature is positive
    struct SignOfThumb;

    impl DecisionFunction for SignOfThumb {
        fn n_features(&self) -> usize {
            FINGER_COUNT
        }

        fn predict(&self, features: ArrayView2<f64>) -> PureItResult<Vec<ClassLabel>> {
            Ok(features.rows().into_iter().map(|row| (row[0] > 0.0) as ClassLabel).collect())
        }
    }

    struct Always(ClassLabel);

    impl DecisionFunction for Always {
        fn n_features(&self) -> usize {
            FINGER_COUNT
        }

        fn predict(&self, features: ArrayView2<f64>) -> PureItResult<Vec<ClassLabel>> {
            Ok(vec![self.0; features.nrows()])
        }
    }

    fn record(time_s: f64, thumb: f64) -> WindowRecord {
        WindowRecord {
            time_s,
            angles: [thumb, 10.0, 20.0, 30.0, 40.0],
            condition: Condition::Contraction,
        }
    }

    #[test]
    fn test_features_matrix_layout() {
        let features = features_matrix(&[record(5.0, 1.0), record(6.0, 2.0)]);
        assert_eq!(features.dim(), (2, FINGER_COUNT));
        assert_eq!(features.row(1).to_vec(), vec![2.0, 10.0, 20.0, 30.0, 40.0]);
    }

    #[test]
    fn test_classification_uses_session_scaling() {
        // Thumb angles 100, 100, 100, 40: three above the session mean
        let records = [record(5.0, 100.0), record(6.0, 100.0), record(7.0, 100.0), record(8.0, 40.0)];
        let summary = classify_records(&records, &SignOfThumb, &ClassifierConfig::default()).unwrap();
        assert_eq!(summary.verdict, Verdict::Cts);
        assert_eq!((summary.positive, summary.negative), (3, 1));
    }

    #[test]
    fn test_tie_break_from_config() {
        let records = [record(5.0, 0.0), record(6.0, 1.0)];
        let config = ClassifierConfig {
            tie_break: TieBreak::PreferNegative,
            ..ClassifierConfig::default()
        };
        let summary = classify_records(&records, &SignOfThumb, &config).unwrap();
        assert_eq!(summary.verdict, Verdict::NoCts);
    }

    #[test]
    fn test_empty_window_is_insufficient() {
        assert!(matches!(
            classify_records(&[], &Always(1), &ClassifierConfig::default()),
            Err(PureItError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_synthetic_run_with_stub_model() {
        let config = SystemConfig::default();
        let detector = Detector::from_config(&config).unwrap();
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut source = SyntheticFlexSource::new(FlexSimulationConfig::default()).with_clock(clock.clone());
        let mut surface = RecordingSurface::new();

        let result = detector
            .run_with_model(&mut source, clock.as_ref(), None, &mut surface, &Always(1))
            .unwrap();

        assert_eq!(result.summary.verdict, Verdict::Cts);
        assert!(result.rows_classified > 0);
        assert!(result.rows_classified < result.samples_recorded);
        assert_eq!(result.condition_counts[2], 0);
        assert_eq!(surface.verdicts().len(), 1);
    }

    #[test]
    fn test_missing_model_reported_to_operator() {
        let mut config = SystemConfig::default();
        config.classifier.model_path = "/nonexistent/svm_flex.json".into();
        let detector = Detector::from_config(&config).unwrap();
        let clock = Arc::new(MockTimeProvider::new(0));
        let mut source = SyntheticFlexSource::new(FlexSimulationConfig::default()).with_clock(clock.clone());
        let mut surface = RecordingSurface::new();

        let result = detector.run(&mut source, clock.as_ref(), None, &mut surface);

        assert!(matches!(result, Err(PureItError::ModelNotFound { .. })));
        assert_eq!(surface.last_message(), Some("Error: model not found"));
        assert!(surface.verdicts().is_empty());
    }
}
