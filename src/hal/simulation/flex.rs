//! Synthetic flex glove that follows the detection protocol
//! Location: src/hal/simulation/flex.rs

use crate::calibration::{CalibrationTable, Finger};
use crate::error::PureItResult;
use crate::hal::traits::LineSource;
use crate::processing::windowing::{Condition, ProtocolSchedule};
use crate::utils::time::MockTimeProvider;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct FlexSimulationConfig {
    pub calibration: CalibrationTable,
    pub schedule: ProtocolSchedule,
    pub line_rate_hz: u32,
    /// Fraction of each finger's range reached while contracting
    pub contraction_bend: f64,
    /// Fraction of each finger's range held while relaxed
    pub relaxation_bend: f64,
    /// ADC counts of uniform jitter on every reading
    pub jitter_counts: i32,
    /// Emit an unparseable line every this many lines
    pub malformed_every: Option<usize>,
    pub seed: u64,
}

impl Default for FlexSimulationConfig {
    fn default() -> Self {
        Self {
            calibration: CalibrationTable::default(),
            schedule: ProtocolSchedule::default(),
            line_rate_hz: 50,
            contraction_bend: 0.8,
            relaxation_bend: 0.15,
            jitter_counts: 4,
            malformed_every: None,
            seed: 11,
        }
    }
}

/// Glove emulator producing `thumb,index,middle,ring,little` ADC lines.
///
/// Line `n` after the last input flush describes the hand at `n / line_rate`
/// seconds after the start signal. When a mock clock is attached it is
/// advanced by one line period per read, so a recording loop driven by that
/// clock sees the protocol unfold without any real waiting.
pub struct SyntheticFlexSource {
    config: FlexSimulationConfig,
    rng: StdRng,
    line_index: u64,
    clock: Option<Arc<MockTimeProvider>>,
}

impl SyntheticFlexSource {
    pub fn new(config: FlexSimulationConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            line_index: 0,
            clock: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<MockTimeProvider>) -> Self {
        self.clock = Some(clock);
        self
    }

    fn line_period(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.config.line_rate_hz.max(1) as u64)
    }

    fn bend_at(&self, time_s: f64) -> f64 {
        match self.config.schedule.label(time_s) {
            Some(Condition::Contraction) => self.config.contraction_bend,
            _ => self.config.relaxation_bend,
        }
    }

    fn render_line(&mut self) -> Vec<u8> {
        let time_s = self.line_index as f64 / self.config.line_rate_hz.max(1) as f64;
        if let Some(every) = self.config.malformed_every {
            if every > 0 && self.line_index % every as u64 == (every as u64 - 1) {
                return b"12,34,\xff\xfe".to_vec();
            }
        }

        let bend = self.bend_at(time_s);
        let jitter = self.config.jitter_counts.max(0);
        let fields: Vec<String> = Finger::ALL
            .iter()
            .map(|&finger| {
                let pair = self.config.calibration.pair(finger);
                let span = (pair.adc_max - pair.adc_min) as f64;
                let noise = if jitter > 0 { self.rng.gen_range(-jitter..=jitter) } else { 0 };
                (pair.adc_min + (span * bend).round() as i32 + noise).to_string()
            })
            .collect();
        fields.join(",").into_bytes()
    }
}

impl LineSource for SyntheticFlexSource {
    fn read_line(&mut self) -> PureItResult<Option<Vec<u8>>> {
        let line = self.render_line();
        self.line_index += 1;
        if let Some(clock) = &self.clock {
            clock.advance(self.line_period());
        }
        Ok(Some(line))
    }

    fn flush_input(&mut self) -> PureItResult<()> {
        self.line_index = 0;
        Ok(())
    }
}
