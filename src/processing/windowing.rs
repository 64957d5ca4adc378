// src/processing/windowing.rs
//! Protocol windowing and condition labelling for flex recordings
//!
//! A detection recording follows a fixed protocol: the subject alternates
//! contraction and relaxation in sub-windows measured from the start signal.
//! Rows outside the analysis window are dropped and every remaining row gets
//! the label of the sub-window it falls in.

use crate::calibration::FINGER_COUNT;
use crate::config::constants::protocol;
use crate::error::{PureItErrorBuilder, PureItResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Expected muscle state during a protocol sub-window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    Contraction,
    Relaxation,
    /// Inside the analysis window but in no sub-window
    Unknown,
}

impl Condition {
    pub fn as_str(self) -> &'static str {
        match self {
            Condition::Contraction => "contraction",
            Condition::Relaxation => "relaxation",
            Condition::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sub-window `[start_s, end_s)` of the protocol
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProtocolInterval {
    pub start_s: f64,
    pub end_s: f64,
    pub condition: Condition,
}

impl ProtocolInterval {
    pub const fn new(start_s: f64, end_s: f64, condition: Condition) -> Self {
        Self {
            start_s,
            end_s,
            condition,
        }
    }
}

/// Analysis window plus its ordered sub-windows.
///
/// Sub-windows are lower-inclusive. The sub-window ending exactly at
/// `analysis_end_s` also includes that instant, so a row at the very end of
/// the analysis window is labelled rather than dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolSchedule {
    #[serde(default = "schedule_defaults::analysis_start_s")]
    pub analysis_start_s: f64,
    #[serde(default = "schedule_defaults::analysis_end_s")]
    pub analysis_end_s: f64,
    #[serde(default = "schedule_defaults::intervals")]
    pub intervals: Vec<ProtocolInterval>,
}

mod schedule_defaults {
    use super::{protocol, Condition, ProtocolInterval};

    pub fn analysis_start_s() -> f64 {
        protocol::ANALYSIS_START_S
    }

    pub fn analysis_end_s() -> f64 {
        protocol::ANALYSIS_END_S
    }

    /// Contraction and relaxation alternate, starting with contraction
    pub fn intervals() -> Vec<ProtocolInterval> {
        let mut intervals = Vec::new();
        let mut start = protocol::ANALYSIS_START_S;
        let mut condition = Condition::Contraction;
        while start < protocol::ANALYSIS_END_S {
            let end = (start + protocol::SUB_WINDOW_S).min(protocol::ANALYSIS_END_S);
            intervals.push(ProtocolInterval::new(start, end, condition));
            condition = match condition {
                Condition::Contraction => Condition::Relaxation,
                _ => Condition::Contraction,
            };
            start = end;
        }
        intervals
    }
}

impl Default for ProtocolSchedule {
    fn default() -> Self {
        Self {
            analysis_start_s: schedule_defaults::analysis_start_s(),
            analysis_end_s: schedule_defaults::analysis_end_s(),
            intervals: schedule_defaults::intervals(),
        }
    }
}

impl ProtocolSchedule {
    /// Intervals must be ascending, non-overlapping and inside the analysis window
    pub fn validate(&self) -> PureItResult<()> {
        let err = |reason: String| {
            PureItErrorBuilder::new("protocol", "validate").configuration(&reason)
        };

        if !(self.analysis_start_s.is_finite()
            && self.analysis_end_s.is_finite()
            && self.analysis_start_s >= 0.0
            && self.analysis_start_s < self.analysis_end_s)
        {
            return Err(err(format!(
                "Invalid analysis window: {} - {} s",
                self.analysis_start_s, self.analysis_end_s
            )));
        }
        if self.intervals.is_empty() {
            return Err(err("Protocol needs at least one sub-window".to_string()));
        }

        let mut previous_end = self.analysis_start_s;
        for interval in &self.intervals {
            if !(interval.start_s < interval.end_s) {
                return Err(err(format!(
                    "Empty sub-window: {} - {} s",
                    interval.start_s, interval.end_s
                )));
            }
            if interval.start_s < previous_end {
                return Err(err(format!(
                    "Sub-window starting at {} s overlaps or is out of order",
                    interval.start_s
                )));
            }
            if interval.end_s > self.analysis_end_s {
                return Err(err(format!(
                    "Sub-window ending at {} s exceeds the analysis window",
                    interval.end_s
                )));
            }
            previous_end = interval.end_s;
        }
        Ok(())
    }

    pub fn in_analysis_window(&self, time_s: f64) -> bool {
        time_s >= self.analysis_start_s && time_s <= self.analysis_end_s
    }

    /// Label for a row at `time_s`, or `None` when the row is discarded
    pub fn label(&self, time_s: f64) -> Option<Condition> {
        if !self.in_analysis_window(time_s) {
            return None;
        }
        let condition = self
            .intervals
            .iter()
            .find(|interval| {
                (time_s >= interval.start_s && time_s < interval.end_s)
                    || (time_s == interval.end_s && interval.end_s == self.analysis_end_s)
            })
            .map(|interval| interval.condition)
            .unwrap_or(Condition::Unknown);
        Some(condition)
    }

    /// Filter rows to the analysis window and label the survivors, keeping order
    pub fn label_session<I>(&self, rows: I) -> Vec<WindowRecord>
    where
        I: IntoIterator<Item = (f64, [f64; FINGER_COUNT])>,
    {
        rows.into_iter()
            .filter_map(|(time_s, angles)| {
                self.label(time_s).map(|condition| WindowRecord {
                    time_s,
                    angles,
                    condition,
                })
            })
            .collect()
    }
}

/// One labelled row of a detection recording
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowRecord {
    /// Seconds since the start signal
    pub time_s: f64,
    /// Joint angles in wire order
    pub angles: [f64; FINGER_COUNT],
    pub condition: Condition,
}

/// Number of records per condition, in `[contraction, relaxation, unknown]` order
pub fn condition_counts(records: &[WindowRecord]) -> [usize; 3] {
    records.iter().fold([0; 3], |mut counts, record| {
        let slot = match record.condition {
            Condition::Contraction => 0,
            Condition::Relaxation => 1,
            Condition::Unknown => 2,
        };
        counts[slot] += 1;
        counts
    })
}
