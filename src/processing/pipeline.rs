// src/processing/pipeline.rs
//! Live EMG pipeline: one conditioned batch per display tick

use crate::acquisition::display_buffer::DisplayBuffer;
use crate::config::EmgConfig;
use crate::error::{BatchOutcome, PureItResult};
use crate::hal::types::DeviceRow;
use crate::processing::conditioning::{ConditionedBatch, EmgConditioner};
use crate::sink::CsvSink;
use crate::utils::time::TimeProvider;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Real-time EMG session pipeline.
///
/// Owns the designed filters, the bounded display buffers, the append-only
/// session arrays and the optional artifact sink. Nothing here sleeps or
/// reads a device; callers hand it whatever rows arrived since the last tick.
pub struct EmgPipeline {
    conditioner: EmgConditioner,
    signal_column: usize,
    sampling_rate_hz: u32,
    filtered_display: DisplayBuffer,
    envelope_display: DisplayBuffer,
    session: SessionData,
    sink: Option<CsvSink>,
    time_provider: Arc<dyn TimeProvider>,
    performance_metrics: PerformanceMetrics,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct PerformanceMetrics {
    pub batches_processed: u64,
    pub batches_skipped: u64,
    pub total_samples_processed: u64,
    /// Rows too short to hold the signal column
    pub rows_rejected: u64,
    pub average_processing_time_us: f64,
    pub max_processing_time_us: f64,
}

/// Full-session series, growing for the whole run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SessionData {
    /// Seconds from session start, `n / sampling_rate`
    pub timestamps: Vec<f64>,
    pub filtered: Vec<f64>,
    pub envelope: Vec<f64>,
}

impl SessionData {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Summary shown when an acquisition run ends
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SessionSummary {
    pub samples: usize,
    pub duration_s: f64,
    pub filtered_min: f64,
    pub filtered_max: f64,
    pub envelope_max: f64,
}

impl EmgPipeline {
    pub fn new(config: &EmgConfig, time_provider: Arc<dyn TimeProvider>) -> PureItResult<Self> {
        config.validate()?;
        let conditioner = EmgConditioner::new(config)?;
        info!(
            "EMG pipeline ready: {} Hz, column {}, band {}-{} Hz, envelope window {}",
            config.sampling_rate_hz,
            config.signal_column,
            config.filters.bandpass_low_hz,
            config.filters.bandpass_high_hz,
            config.filters.envelope_window
        );

        Ok(Self {
            conditioner,
            signal_column: config.signal_column,
            sampling_rate_hz: config.sampling_rate_hz,
            filtered_display: DisplayBuffer::new(config.display_capacity),
            envelope_display: DisplayBuffer::new(config.display_capacity),
            session: SessionData::default(),
            sink: None,
            time_provider,
            performance_metrics: PerformanceMetrics::default(),
        })
    }

    /// Persist every processed sample to `sink`
    pub fn with_sink(mut self, sink: CsvSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Raw signal values from the configured column.
    ///
    /// Rows too short to hold the column are left out and counted.
    pub fn select_signal(&mut self, rows: &[DeviceRow]) -> Vec<f64> {
        let column = self.signal_column;
        let selected: Vec<f64> = rows.iter().filter_map(|row| row.get(column).copied()).collect();
        let rejected = rows.len() - selected.len();
        if rejected > 0 {
            self.performance_metrics.rows_rejected += rejected as u64;
            debug!("{} rows too short for signal column {}", rejected, column);
        }
        selected
    }

    /// Select the signal column from device rows and process it
    pub fn process_rows(&mut self, rows: &[DeviceRow]) -> BatchOutcome<usize> {
        let raw = self.select_signal(rows);
        self.process_batch(&raw)
    }

    /// Condition one raw batch and append it to every output.
    ///
    /// Returns the number of samples appended. An empty batch or a numeric
    /// failure leaves every buffer as it was; only a failing artifact sink
    /// stops the session.
    pub fn process_batch(&mut self, raw: &[f64]) -> BatchOutcome<usize> {
        if raw.is_empty() {
            return BatchOutcome::SkippedTransient("no data this tick".to_string());
        }

        let start_time = self.time_provider.now_nanos();
        let batch = match self.conditioner.condition(raw) {
            Ok(batch) => batch,
            Err(e) => {
                self.performance_metrics.batches_skipped += 1;
                warn!("Dropping EMG batch of {} samples: {}", raw.len(), e);
                return BatchOutcome::SkippedTransient(e.to_string());
            }
        };

        let first = self.session.len();
        let rate = self.sampling_rate_hz as f64;
        let timestamps: Vec<f64> = (first..first + batch.len()).map(|n| n as f64 / rate).collect();

        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.append_batch(&timestamps, &batch) {
                error!("Artifact write failed, stopping session: {}", e);
                return BatchOutcome::Fatal(e);
            }
        }

        self.append(timestamps, batch);

        let end_time = self.time_provider.now_nanos();
        let processing_time_us = end_time.saturating_sub(start_time) as f64 / 1000.0;
        self.update_performance_metrics(raw.len(), processing_time_us);
        debug!("Processed EMG batch of {} samples in {:.1} us", raw.len(), processing_time_us);

        BatchOutcome::Processed(raw.len())
    }

    fn append(&mut self, timestamps: Vec<f64>, batch: ConditionedBatch) {
        self.filtered_display.extend_from_slice(&batch.filtered);
        self.envelope_display.extend_from_slice(&batch.envelope);
        self.session.timestamps.extend(timestamps);
        self.session.filtered.extend(batch.filtered);
        self.session.envelope.extend(batch.envelope);
    }

    pub fn filtered_display(&self) -> &DisplayBuffer {
        &self.filtered_display
    }

    pub fn envelope_display(&self) -> &DisplayBuffer {
        &self.envelope_display
    }

    pub fn session(&self) -> &SessionData {
        &self.session
    }

    pub fn conditioner(&self) -> &EmgConditioner {
        &self.conditioner
    }

    /// Get current performance metrics
    pub fn get_performance_metrics(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Reset performance metrics
    pub fn reset_metrics(&mut self) {
        self.performance_metrics = PerformanceMetrics::default();
    }

    pub fn summary(&self) -> SessionSummary {
        let session = &self.session;
        if session.is_empty() {
            return SessionSummary::default();
        }
        let fold = |values: &[f64], init: f64, pick: fn(f64, f64) -> f64| values.iter().copied().fold(init, pick);

        SessionSummary {
            samples: session.len(),
            duration_s: session.len() as f64 / self.sampling_rate_hz as f64,
            filtered_min: fold(&session.filtered, f64::INFINITY, f64::min),
            filtered_max: fold(&session.filtered, f64::NEG_INFINITY, f64::max),
            envelope_max: fold(&session.envelope, f64::NEG_INFINITY, f64::max),
        }
    }

    /// End the session, flushing the artifact if there is one
    pub fn finish(mut self) -> PureItResult<SessionSummary> {
        let summary = self.summary();
        if let Some(sink) = self.sink.take() {
            sink.finish()?;
        }
        info!(
            "EMG session finished: {} samples over {:.2} s, envelope peak {:.3}",
            summary.samples, summary.duration_s, summary.envelope_max
        );
        Ok(summary)
    }

    fn update_performance_metrics(&mut self, samples: usize, processing_time_us: f64) {
        let metrics = &mut self.performance_metrics;
        metrics.batches_processed += 1;
        metrics.total_samples_processed += samples as u64;

        let n = metrics.batches_processed as f64;
        metrics.average_processing_time_us = (metrics.average_processing_time_us * (n - 1.0) + processing_time_us) / n;

        if processing_time_us > metrics.max_processing_time_us {
            metrics.max_processing_time_us = processing_time_us;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::time::MockTimeProvider;
    use tempfile::tempdir;

    fn pipeline() -> EmgPipeline {
        EmgPipeline::new(&EmgConfig::default(), Arc::new(MockTimeProvider::new(0))).unwrap()
    }

    fn rows(values: &[f64]) -> Vec<DeviceRow> {
        values.iter().map(|&v| vec![0.0, 0.0, 0.0, 0.0, 0.0, v]).collect()
    }

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| 512.0 + ((i * 37) % 23) as f64).collect()
    }

    #[test]
    fn test_processed_batch_reaches_every_output() {
        let mut pipeline = pipeline();
        let outcome = pipeline.process_batch(&ramp(50));
        assert!(matches!(outcome, BatchOutcome::Processed(50)));

        assert_eq!(pipeline.session().len(), 50);
        assert_eq!(pipeline.filtered_display().len(), EmgConfig::default().display_capacity);
        assert_eq!(pipeline.get_performance_metrics().batches_processed, 1);
        assert_eq!(pipeline.get_performance_metrics().total_samples_processed, 50);
    }

    #[test]
    fn test_timestamps_relative_to_session_start() {
        let mut pipeline = pipeline();
        pipeline.process_batch(&ramp(50));
        pipeline.process_batch(&ramp(50));
        let timestamps = &pipeline.session().timestamps;
        assert_eq!(timestamps[0], 0.0);
        assert!((timestamps[50] - 0.05).abs() < 1e-12);
        assert!((timestamps[99] - 0.099).abs() < 1e-12);
    }

    #[test]
    fn test_empty_batch_leaves_state_unchanged() {
        let mut pipeline = pipeline();
        pipeline.process_batch(&ramp(50));
        let before = pipeline.filtered_display().to_vec();

        assert!(matches!(pipeline.process_batch(&[]), BatchOutcome::SkippedTransient(_)));
        assert_eq!(pipeline.filtered_display().to_vec(), before);
        assert_eq!(pipeline.session().len(), 50);
    }

    #[test]
    fn test_non_finite_batch_skipped_and_pipeline_continues() {
        let mut pipeline = pipeline();
        let mut bad = ramp(50);
        bad[7] = f64::NAN;

        assert!(matches!(pipeline.process_batch(&bad), BatchOutcome::SkippedTransient(_)));
        assert!(pipeline.session().is_empty());
        assert_eq!(pipeline.get_performance_metrics().batches_skipped, 1);

        assert!(pipeline.process_batch(&ramp(50)).is_processed());
        assert_eq!(pipeline.session().len(), 50);
    }

    #[test]
    fn test_signal_column_selection() {
        let mut pipeline = pipeline();
        let mut device_rows = rows(&ramp(10));
        device_rows.push(vec![1.0, 2.0]);

        assert_eq!(pipeline.select_signal(&device_rows), ramp(10));
        assert_eq!(pipeline.get_performance_metrics().rows_rejected, 1);
        assert!(matches!(pipeline.process_rows(&device_rows), BatchOutcome::Processed(10)));
    }

    #[test]
    fn test_rows_without_signal_column_skip_the_tick() {
        let mut pipeline = pipeline();
        let outcome = pipeline.process_rows(&[vec![1.0, 2.0, 3.0]]);
        assert!(matches!(outcome, BatchOutcome::SkippedTransient(_)));
    }

    #[test]
    fn test_summary_and_artifact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("emg.csv");
        let mut pipeline = pipeline().with_sink(CsvSink::create(&path).unwrap());
        for _ in 0..4 {
            pipeline.process_batch(&ramp(50));
        }

        let session = pipeline.session().clone();
        let summary = pipeline.finish().unwrap();
        assert_eq!(summary.samples, 200);
        assert!((summary.duration_s - 0.2).abs() < 1e-12);
        assert!(summary.filtered_min <= summary.filtered_max);
        assert_eq!(
            summary.envelope_max,
            session.envelope.iter().copied().fold(f64::NEG_INFINITY, f64::max)
        );

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 201);
    }

    #[test]
    fn test_empty_session_summary() {
        assert_eq!(pipeline().summary(), SessionSummary::default());
    }
}
