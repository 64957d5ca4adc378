// src/processing/filters/mod.rs
//! Digital filters for EMG signal processing
//!
//! Filters are designed once from a [`FilterSpec`] and applied as a cascade of
//! second-order sections. Coefficients never change after design.

pub mod design;
pub mod sos;

pub use design::butterworth;
pub use sos::{Biquad, SosFilter};

use crate::config::constants::filters::{MAX_FILTER_ORDER, MIN_FILTER_ORDER};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Frequency band selected by a filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BandType {
    Lowpass { cutoff_hz: f64 },
    Highpass { cutoff_hz: f64 },
    Bandpass { low_hz: f64, high_hz: f64 },
}

/// Everything needed to design a Butterworth filter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    pub band: BandType,
    pub order: usize,
    pub sample_rate_hz: f64,
}

impl FilterSpec {
    pub fn lowpass(cutoff_hz: f64, order: usize, sample_rate_hz: f64) -> Self {
        Self {
            band: BandType::Lowpass { cutoff_hz },
            order,
            sample_rate_hz,
        }
    }

    pub fn highpass(cutoff_hz: f64, order: usize, sample_rate_hz: f64) -> Self {
        Self {
            band: BandType::Highpass { cutoff_hz },
            order,
            sample_rate_hz,
        }
    }

    pub fn bandpass(low_hz: f64, high_hz: f64, order: usize, sample_rate_hz: f64) -> Self {
        Self {
            band: BandType::Bandpass { low_hz, high_hz },
            order,
            sample_rate_hz,
        }
    }

    pub fn nyquist_hz(&self) -> f64 {
        self.sample_rate_hz / 2.0
    }

    /// Check order, sampling rate and cutoffs against Nyquist
    pub fn validate(&self) -> Result<(), FilterError> {
        if !(MIN_FILTER_ORDER..=MAX_FILTER_ORDER).contains(&self.order) {
            return Err(FilterError::InvalidParameters(format!(
                "Order must be {}-{}, got {}",
                MIN_FILTER_ORDER, MAX_FILTER_ORDER, self.order
            )));
        }
        if !self.sample_rate_hz.is_finite() || self.sample_rate_hz <= 0.0 {
            return Err(FilterError::InvalidParameters(format!(
                "Invalid sampling rate: {} Hz",
                self.sample_rate_hz
            )));
        }

        let nyquist = self.nyquist_hz();
        let check = |freq: f64| {
            if freq.is_finite() && freq > 0.0 && freq < nyquist {
                Ok(())
            } else {
                Err(FilterError::InvalidParameters(format!(
                    "Invalid cutoff frequency: {} Hz (Nyquist: {} Hz)",
                    freq, nyquist
                )))
            }
        };

        match self.band {
            BandType::Lowpass { cutoff_hz } | BandType::Highpass { cutoff_hz } => check(cutoff_hz),
            BandType::Bandpass { low_hz, high_hz } => {
                check(low_hz)?;
                check(high_hz)?;
                if low_hz >= high_hz {
                    return Err(FilterError::InvalidParameters(format!(
                        "Invalid band-pass range: {} - {} Hz",
                        low_hz, high_hz
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Common filter error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Invalid coefficients: {0}")]
    InvalidCoefficients(String),
}
