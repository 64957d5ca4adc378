// src/hal/types.rs
//! Types exchanged with hardware collaborators

use serde::{Deserialize, Serialize};
use std::fmt;

/// One multi-column row from the EMG device link
pub type DeviceRow = Vec<f64>;

/// Logical relay state, independent of the driving polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelayState {
    On,
    Off,
}

impl RelayState {
    /// Output level that produces this state on a relay module
    pub fn output_level(self, active_low: bool) -> bool {
        match self {
            RelayState::On => !active_low,
            RelayState::Off => active_low,
        }
    }
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelayState::On => f.write_str("on"),
            RelayState::Off => f.write_str("off"),
        }
    }
}
