// src/acquisition/flex.rs
//! Flex glove recording
//!
//! The glove streams one `thumb,index,middle,ring,little` line per reading.
//! A recording runs until a wall-clock deadline, not a sample count: late data
//! means fewer samples, never a longer session.

use crate::calibration::{HandCalibration, FINGER_COUNT};
use crate::config::FlexConfig;
use crate::error::PureItResult;
use crate::hal::traits::{LineSource, OperatorSurface};
use crate::utils::time::{seconds_to_duration, Deadline, TimeProvider};
use crossbeam::channel::{Receiver, TryRecvError};
use std::time::Duration;
use tracing::{debug, info, warn};

/// One parsed flex line
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlexSample {
    /// Seconds since the start signal
    pub time_s: f64,
    /// Raw ADC readings in wire order
    pub adc: [i32; FINGER_COUNT],
}

/// Parse a raw flex line.
///
/// Undecodable bytes are dropped and surrounding whitespace trimmed. Returns
/// `None` unless the line holds exactly five comma-separated integers.
pub fn parse_flex_line(raw: &[u8]) -> Option<[i32; FINGER_COUNT]> {
    let decoded: String = String::from_utf8_lossy(raw)
        .chars()
        .filter(|&c| c != char::REPLACEMENT_CHARACTER)
        .collect();
    let line = decoded.trim();
    if line.is_empty() {
        return None;
    }

    let mut adc = [0i32; FINGER_COUNT];
    let mut fields = line.split(',');
    for slot in adc.iter_mut() {
        *slot = fields.next()?.trim().parse().ok()?;
    }
    if fields.next().is_some() {
        return None;
    }
    Some(adc)
}

/// Everything captured during one recording
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlexRecording {
    pub samples: Vec<FlexSample>,
    pub lines_read: usize,
    pub lines_skipped: usize,
    pub timeouts: usize,
    /// The stop signal ended the recording before its deadline
    pub stopped_early: bool,
}

impl FlexRecording {
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Calibrated `(time, angles)` rows, ready for windowing
    pub fn angle_rows<'a>(
        &'a self,
        calibration: &'a HandCalibration,
    ) -> impl Iterator<Item = (f64, [f64; FINGER_COUNT])> + 'a {
        self.samples
            .iter()
            .map(move |sample| (sample.time_s, calibration.angles(&sample.adc)))
    }
}

/// Deadline-bounded flex recorder
#[derive(Debug, Clone)]
pub struct FlexRecorder {
    duration: Duration,
}

impl FlexRecorder {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn from_config(config: &FlexConfig) -> Self {
        Self::new(seconds_to_duration(config.duration_s))
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Discard whatever the glove sent while the link was settling
    pub fn prepare<S: LineSource + ?Sized>(&self, source: &mut S) -> PureItResult<()> {
        source.flush_input()
    }

    /// Record from the start signal until the deadline, a stop signal or the
    /// end of the source.
    ///
    /// The link is closed on every exit path, including errors.
    pub fn record<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        clock: &dyn TimeProvider,
        stop: Option<&Receiver<()>>,
        surface: Option<&mut dyn OperatorSurface>,
    ) -> PureItResult<FlexRecording> {
        let result = self.record_until_deadline(source, clock, stop, surface);
        if let Err(e) = source.close() {
            warn!("Failed to close flex link: {}", e);
        }
        result
    }

    fn record_until_deadline<S: LineSource + ?Sized>(
        &self,
        source: &mut S,
        clock: &dyn TimeProvider,
        stop: Option<&Receiver<()>>,
        mut surface: Option<&mut dyn OperatorSurface>,
    ) -> PureItResult<FlexRecording> {
        let mut recording = FlexRecording::default();
        let deadline = Deadline::start(clock, self.duration);
        let mut shown_second = None;
        info!("Flex recording started for {:?}", self.duration);

        while !deadline.is_expired(clock) {
            if let Some(stop) = stop {
                match stop.try_recv() {
                    Ok(()) => {
                        recording.stopped_early = true;
                        break;
                    }
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => {}
                }
            }

            let elapsed = deadline.elapsed_s(clock);
            let second = elapsed as u64;
            if shown_second != Some(second) {
                if let Some(surface) = surface.as_deref_mut() {
                    surface.show_status(&format!("Recording: {} s", second));
                }
                shown_second = Some(second);
            }

            match source.read_line()? {
                Some(raw) => {
                    recording.lines_read += 1;
                    match parse_flex_line(&raw) {
                        Some(adc) => recording.samples.push(FlexSample { time_s: elapsed, adc }),
                        None => {
                            recording.lines_skipped += 1;
                            debug!("Skipping malformed flex line: {:?}", String::from_utf8_lossy(&raw));
                        }
                    }
                }
                None if source.is_exhausted() => {
                    info!("Flex source exhausted after {:.2} s", elapsed);
                    break;
                }
                None => recording.timeouts += 1,
            }
        }

        info!(
            "Flex recording finished: {} samples, {} skipped, {} timeouts",
            recording.samples.len(),
            recording.lines_skipped,
            recording.timeouts
        );
        Ok(recording)
    }
}
