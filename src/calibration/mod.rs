// src/calibration/mod.rs
//! Flex-sensor angle calibration
//!
//! Each finger carries its own `(adc_min, adc_max)` pair measured with the hand
//! fully open and fully closed. Readings are clamped into that range and mapped
//! linearly onto 0..=180 degrees, so a looser or tighter grip than during
//! calibration saturates instead of producing out-of-range angles.

use crate::config::constants::calibration as defaults;
use crate::error::{PureItError, PureItResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Full bend angle in degrees
pub const MAX_ANGLE_DEG: f64 = 180.0;

/// Number of flex channels on the glove
pub const FINGER_COUNT: usize = 5;

/// Flex sensor position, in the order the glove firmware sends them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Little,
}

impl Finger {
    /// Wire order of a flex line
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Little,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Little => "little",
        }
    }

    /// Position in a flex line and in angle arrays
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Finger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Map an ADC reading to a joint angle in degrees.
///
/// The reading is clamped to `[adc_min, adc_max]` first, so the result is
/// always inside `[0, 180]`. A degenerate range (`adc_max <= adc_min`) maps
/// everything to 0; use [`ChannelCalibration::new`] to reject such ranges up
/// front.
pub fn adc_to_angle(adc_value: i32, adc_min: i32, adc_max: i32) -> f64 {
    let clamped = adc_value.min(adc_max).max(adc_min);
    let span = adc_max as i64 - adc_min as i64;
    if span <= 0 {
        return 0.0;
    }
    (clamped as i64 - adc_min as i64) as f64 / span as f64 * MAX_ANGLE_DEG
}

/// Raw calibration extremes as they appear in configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationPair {
    pub adc_min: i32,
    pub adc_max: i32,
}

impl CalibrationPair {
    pub const fn new(adc_min: i32, adc_max: i32) -> Self {
        Self { adc_min, adc_max }
    }
}

/// Calibration table for all five fingers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationTable {
    #[serde(default = "table_defaults::thumb")]
    pub thumb: CalibrationPair,
    #[serde(default = "table_defaults::index")]
    pub index: CalibrationPair,
    #[serde(default = "table_defaults::middle")]
    pub middle: CalibrationPair,
    #[serde(default = "table_defaults::ring")]
    pub ring: CalibrationPair,
    #[serde(default = "table_defaults::little")]
    pub little: CalibrationPair,
}

mod table_defaults {
    use super::{defaults, CalibrationPair};

    pub fn thumb() -> CalibrationPair { CalibrationPair::new(defaults::THUMB.0, defaults::THUMB.1) }
    pub fn index() -> CalibrationPair { CalibrationPair::new(defaults::INDEX.0, defaults::INDEX.1) }
    pub fn middle() -> CalibrationPair { CalibrationPair::new(defaults::MIDDLE.0, defaults::MIDDLE.1) }
    pub fn ring() -> CalibrationPair { CalibrationPair::new(defaults::RING.0, defaults::RING.1) }
    pub fn little() -> CalibrationPair { CalibrationPair::new(defaults::LITTLE.0, defaults::LITTLE.1) }
}

impl Default for CalibrationTable {
    fn default() -> Self {
        Self {
            thumb: table_defaults::thumb(),
            index: table_defaults::index(),
            middle: table_defaults::middle(),
            ring: table_defaults::ring(),
            little: table_defaults::little(),
        }
    }
}

impl CalibrationTable {
    pub fn pair(&self, finger: Finger) -> CalibrationPair {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Little => self.little,
        }
    }
}

/// Validated, immutable calibration of one finger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCalibration {
    finger: Finger,
    adc_min: i32,
    adc_max: i32,
}

impl ChannelCalibration {
    /// Fails when `adc_max <= adc_min`; the range is never silently inverted.
    pub fn new(finger: Finger, adc_min: i32, adc_max: i32) -> PureItResult<Self> {
        if adc_max <= adc_min {
            return Err(PureItError::Calibration {
                finger,
                adc_min,
                adc_max,
            });
        }
        Ok(Self {
            finger,
            adc_min,
            adc_max,
        })
    }

    pub fn finger(&self) -> Finger {
        self.finger
    }

    pub fn adc_min(&self) -> i32 {
        self.adc_min
    }

    pub fn adc_max(&self) -> i32 {
        self.adc_max
    }

    pub fn angle(&self, adc_value: i32) -> f64 {
        adc_to_angle(adc_value, self.adc_min, self.adc_max)
    }
}

/// Calibrations for the whole hand, indexed by [`Finger::index`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandCalibration {
    channels: [ChannelCalibration; FINGER_COUNT],
}

impl HandCalibration {
    pub fn from_table(table: &CalibrationTable) -> PureItResult<Self> {
        let build = |finger: Finger| {
            let pair = table.pair(finger);
            ChannelCalibration::new(finger, pair.adc_min, pair.adc_max)
        };

        Ok(Self {
            channels: [
                build(Finger::Thumb)?,
                build(Finger::Index)?,
                build(Finger::Middle)?,
                build(Finger::Ring)?,
                build(Finger::Little)?,
            ],
        })
    }

    pub fn channel(&self, finger: Finger) -> &ChannelCalibration {
        &self.channels[finger.index()]
    }

    /// Convert one flex line to joint angles; each finger uses its own pair.
    pub fn angles(&self, adc: &[i32; FINGER_COUNT]) -> [f64; FINGER_COUNT] {
        let mut angles = [0.0; FINGER_COUNT];
        for (angle, (channel, &value)) in angles.iter_mut().zip(self.channels.iter().zip(adc)) {
            *angle = channel.angle(value);
        }
        angles
    }
}
