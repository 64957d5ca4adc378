//! Synthetic EMG device link
//! Location: src/hal/simulation/emg.rs

use crate::config::constants::emg;
use crate::config::EmgConfig;
use crate::error::{PureItErrorBuilder, PureItResult};
use crate::hal::traits::EmgBatchSource;
use crate::hal::types::DeviceRow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Muscle activation over time
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ActivationPattern {
    Rest,
    Constant { level: f64 },
    /// Alternating contraction bursts and rest
    Burst { on_ms: u32, off_ms: u32, level: f64 },
}

impl ActivationPattern {
    /// Activation in `0..=1` at `t_ms` from the start of the stream
    pub fn level_at(&self, t_ms: f64) -> f64 {
        match *self {
            ActivationPattern::Rest => 0.0,
            ActivationPattern::Constant { level } => level.clamp(0.0, 1.0),
            ActivationPattern::Burst { on_ms, off_ms, level } => {
                let period = (on_ms + off_ms) as f64;
                if period <= 0.0 || t_ms % period >= on_ms as f64 {
                    0.0
                } else {
                    level.clamp(0.0, 1.0)
                }
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmgSimulationConfig {
    pub sampling_rate_hz: u32,
    /// Width of each device row
    pub column_count: usize,
    pub signal_column: usize,
    /// ADC mid-scale the electrode signal rides on
    pub baseline: f64,
    pub noise_amplitude: f64,
    pub activation_amplitude: f64,
    pub powerline_hz: f64,
    pub powerline_amplitude: f64,
    pub pattern: ActivationPattern,
    pub rows_per_poll: usize,
    pub seed: u64,
}

impl Default for EmgSimulationConfig {
    fn default() -> Self {
        Self {
            sampling_rate_hz: emg::DEFAULT_SAMPLING_RATE_HZ,
            column_count: emg::DEFAULT_SIGNAL_COLUMN + 1,
            signal_column: emg::DEFAULT_SIGNAL_COLUMN,
            baseline: 512.0,
            noise_amplitude: 2.0,
            activation_amplitude: 150.0,
            powerline_hz: 50.0,
            powerline_amplitude: 5.0,
            pattern: ActivationPattern::Burst {
                on_ms: 1000,
                off_ms: 1000,
                level: 1.0,
            },
            rows_per_poll: emg::DEFAULT_BATCH_SIZE,
            seed: 7,
        }
    }
}

impl EmgSimulationConfig {
    /// Device shaped like the configured acquisition: same rate, row layout and batch size
    pub fn for_session(config: &EmgConfig) -> Self {
        Self {
            sampling_rate_hz: config.sampling_rate_hz,
            column_count: config.signal_column + 1,
            signal_column: config.signal_column,
            rows_per_poll: config.batch_size,
            ..Self::default()
        }
    }
}

/// Emits device rows with a synthetic EMG trace in the signal column.
///
/// Column 0 carries the running sample counter, the way the acquisition
/// board numbers its rows; the remaining columns are idle.
pub struct SyntheticEmgSource {
    config: EmgSimulationConfig,
    rng: StdRng,
    sample_index: u64,
    limit: Option<u64>,
}

impl SyntheticEmgSource {
    pub fn new(config: EmgSimulationConfig) -> PureItResult<Self> {
        let err = |reason: &str| PureItErrorBuilder::new("emg_simulator", "new").configuration(reason);
        if config.sampling_rate_hz == 0 {
            return Err(err("Sampling rate must be positive"));
        }
        if config.signal_column >= config.column_count {
            return Err(err("Signal column outside the row"));
        }
        if config.rows_per_poll == 0 {
            return Err(err("Rows per poll must be positive"));
        }

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sample_index: 0,
            limit: None,
        })
    }

    /// Stop producing rows after `total_samples`
    pub fn with_limit(mut self, total_samples: u64) -> Self {
        self.limit = Some(total_samples);
        self
    }

    pub fn samples_emitted(&self) -> u64 {
        self.sample_index
    }

    fn next_value(&mut self) -> f64 {
        let t = self.sample_index as f64 / self.config.sampling_rate_hz as f64;
        let activation = self.config.pattern.level_at(t * 1000.0);

        // Sum of uniforms as a cheap bell-shaped draw
        let mut draw = || (0..3).map(|_| self.rng.gen_range(-1.0f64..1.0)).sum::<f64>() / 3.0;
        let muscle = activation * self.config.activation_amplitude * draw();
        let noise = self.config.noise_amplitude * draw();
        let hum = self.config.powerline_amplitude * (2.0 * PI * self.config.powerline_hz * t).sin();

        self.config.baseline + muscle + noise + hum
    }
}

impl EmgBatchSource for SyntheticEmgSource {
    fn poll_rows(&mut self) -> PureItResult<Vec<DeviceRow>> {
        let mut count = self.config.rows_per_poll as u64;
        if let Some(limit) = self.limit {
            count = count.min(limit.saturating_sub(self.sample_index));
        }

        let mut rows = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut row = vec![0.0; self.config.column_count];
            row[0] = self.sample_index as f64;
            row[self.config.signal_column] = self.next_value();
            rows.push(row);
            self.sample_index += 1;
        }
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_shape_follows_config() {
        let config = EmgConfig {
            sampling_rate_hz: 2000,
            signal_column: 2,
            batch_size: 80,
            ..EmgConfig::default()
        };
        let mut source = SyntheticEmgSource::new(EmgSimulationConfig::for_session(&config)).unwrap();
        let rows = source.poll_rows().unwrap();
        assert_eq!(rows.len(), 80);
        assert!(rows.iter().all(|row| row.len() == 3));
    }

    #[test]
    fn test_rows_have_signal_in_column() {
        let mut source = SyntheticEmgSource::new(EmgSimulationConfig::default()).unwrap();
        let rows = source.poll_rows().unwrap();
        assert_eq!(rows.len(), 50);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.len(), 6);
            assert_eq!(row[0], i as f64);
            assert!((row[5] - 512.0).abs() < 200.0);
        }
    }

    #[test]
    fn test_limit_stops_stream() {
        let mut source = SyntheticEmgSource::new(EmgSimulationConfig::default())
            .unwrap()
            .with_limit(70);
        assert_eq!(source.poll_rows().unwrap().len(), 50);
        assert_eq!(source.poll_rows().unwrap().len(), 20);
        assert!(source.poll_rows().unwrap().is_empty());
    }

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = SyntheticEmgSource::new(EmgSimulationConfig::default()).unwrap();
        let mut b = SyntheticEmgSource::new(EmgSimulationConfig::default()).unwrap();
        assert_eq!(a.poll_rows().unwrap(), b.poll_rows().unwrap());
    }

    #[test]
    fn test_burst_pattern() {
        let pattern = ActivationPattern::Burst { on_ms: 100, off_ms: 100, level: 0.5 };
        assert_eq!(pattern.level_at(50.0), 0.5);
        assert_eq!(pattern.level_at(150.0), 0.0);
        assert_eq!(pattern.level_at(250.0), 0.5);
    }

    #[test]
    fn test_invalid_column_rejected() {
        let config = EmgSimulationConfig {
            signal_column: 6,
            ..EmgSimulationConfig::default()
        };
        assert!(SyntheticEmgSource::new(config).is_err());
    }
}
