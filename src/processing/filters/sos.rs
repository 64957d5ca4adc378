// src/processing/filters/sos.rs
//! Cascaded second-order section filters

use super::design::butterworth;
use super::{FilterError, FilterSpec};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// One second-order section, `a[0]` is always 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Biquad {
    pub b: [f64; 3],
    pub a: [f64; 3],
}

impl Biquad {
    /// Both poles strictly inside the unit circle (stability triangle)
    pub fn is_stable(&self) -> bool {
        let (a1, a2) = (self.a[1], self.a[2]);
        a2.abs() < 1.0 && a1.abs() < 1.0 + a2
    }

    /// Complex response at normalised angular frequency `omega` (rad/sample)
    pub fn response(&self, omega: f64) -> Complex64 {
        let z1 = Complex64::from_polar(1.0, -omega);
        let z2 = z1 * z1;
        let num = z1 * self.b[1] + z2 * self.b[2] + self.b[0];
        let den = z1 * self.a[1] + z2 * self.a[2] + self.a[0];
        num / den
    }
}

/// Immutable Butterworth filter in second-order-section form.
///
/// The coefficients are computed once in [`SosFilter::design`]; applying the
/// filter never mutates them, so one instance serves a whole session.
#[derive(Debug, Clone)]
pub struct SosFilter {
    spec: FilterSpec,
    sections: Vec<Biquad>,
}

impl SosFilter {
    pub fn design(spec: FilterSpec) -> Result<Self, FilterError> {
        let sections = butterworth(&spec)?;
        Ok(Self { spec, sections })
    }

    pub fn spec(&self) -> &FilterSpec {
        &self.spec
    }

    pub fn sections(&self) -> &[Biquad] {
        &self.sections
    }

    /// Filter a batch starting from zero state (transposed direct form II).
    ///
    /// Each call is independent: no state leaks from one batch to the next.
    pub fn filter(&self, input: &[f64]) -> Vec<f64> {
        let mut output = input.to_vec();
        for section in &self.sections {
            let (mut z1, mut z2) = (0.0, 0.0);
            for sample in output.iter_mut() {
                let x = *sample;
                let y = section.b[0] * x + z1;
                z1 = section.b[1] * x - section.a[1] * y + z2;
                z2 = section.b[2] * x - section.a[2] * y;
                *sample = y;
            }
        }
        output
    }

    /// Gain magnitude at `freq_hz`
    pub fn magnitude_response(&self, freq_hz: f64) -> f64 {
        let omega = 2.0 * PI * freq_hz / self.spec.sample_rate_hz;
        self.sections
            .iter()
            .map(|section| section.response(omega))
            .product::<Complex64>()
            .norm()
    }
}
