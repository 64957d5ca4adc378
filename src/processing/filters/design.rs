// src/processing/filters/design.rs
//! Butterworth coefficient design
//!
//! The analog prototype is frequency-transformed in the s-plane, mapped to the
//! z-plane with a pre-warped bilinear transform and then split into
//! second-order sections. Conjugate pole pairs share a section, which keeps
//! every section well conditioned even for narrow bands at low cutoffs.

use super::sos::Biquad;
use super::{BandType, FilterError, FilterSpec};
use rustfft::num_complex::Complex64;
use std::f64::consts::PI;

/// Roots with a smaller imaginary part are treated as real
const REAL_TOLERANCE: f64 = 1e-10;

/// Zeros, poles and gain of a transfer function
#[derive(Debug, Clone)]
struct Zpk {
    zeros: Vec<Complex64>,
    poles: Vec<Complex64>,
    gain: f64,
}

impl Zpk {
    fn relative_degree(&self) -> usize {
        self.poles.len() - self.zeros.len()
    }
}

/// Design a Butterworth filter as cascaded second-order sections.
///
/// The overall gain is folded into the first section's numerator.
pub fn butterworth(spec: &FilterSpec) -> Result<Vec<Biquad>, FilterError> {
    spec.validate()?;

    let fs = spec.sample_rate_hz;
    let prototype = analog_prototype(spec.order);
    let analog = match spec.band {
        BandType::Lowpass { cutoff_hz } => lowpass_transform(prototype, prewarp(cutoff_hz, fs)),
        BandType::Highpass { cutoff_hz } => highpass_transform(prototype, prewarp(cutoff_hz, fs)),
        BandType::Bandpass { low_hz, high_hz } => {
            let low = prewarp(low_hz, fs);
            let high = prewarp(high_hz, fs);
            bandpass_transform(prototype, (low * high).sqrt(), high - low)
        }
    };

    to_sections(bilinear(analog, fs))
}

/// Analog angular frequency that the bilinear transform maps onto `freq_hz`
fn prewarp(freq_hz: f64, fs: f64) -> f64 {
    2.0 * fs * (PI * freq_hz / fs).tan()
}

/// Unit-cutoff Butterworth poles, evenly spaced on the left half circle
fn analog_prototype(order: usize) -> Zpk {
    let n = order as f64;
    let poles = (0..order)
        .map(|k| {
            let theta = PI * (2.0 * k as f64 + n + 1.0) / (2.0 * n);
            Complex64::from_polar(1.0, theta)
        })
        .collect();

    Zpk {
        zeros: Vec::new(),
        poles,
        gain: 1.0,
    }
}

fn lowpass_transform(zpk: Zpk, wo: f64) -> Zpk {
    let degree = zpk.relative_degree() as i32;
    Zpk {
        zeros: zpk.zeros.iter().map(|&z| z * wo).collect(),
        poles: zpk.poles.iter().map(|&p| p * wo).collect(),
        gain: zpk.gain * wo.powi(degree),
    }
}

fn highpass_transform(zpk: Zpk, wo: f64) -> Zpk {
    let degree = zpk.relative_degree();
    let num: Complex64 = zpk.zeros.iter().map(|&z| -z).product();
    let den: Complex64 = zpk.poles.iter().map(|&p| -p).product();

    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| wo / z).collect();
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

    Zpk {
        zeros,
        poles: zpk.poles.iter().map(|&p| wo / p).collect(),
        gain: zpk.gain * (num / den).re,
    }
}

fn bandpass_transform(zpk: Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.relative_degree() as i32;
    let split = |roots: &[Complex64]| -> Vec<Complex64> {
        let scaled: Vec<Complex64> = roots.iter().map(|&r| r * (bw / 2.0)).collect();
        let offsets: Vec<Complex64> = scaled.iter().map(|&r| (r * r - wo * wo).sqrt()).collect();
        let upper = scaled.iter().zip(&offsets).map(|(&r, &d)| r + d);
        let lower = scaled.iter().zip(&offsets).map(|(&r, &d)| r - d);
        upper.chain(lower).collect()
    };

    let mut zeros = split(&zpk.zeros);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree as usize));

    Zpk {
        zeros,
        poles: split(&zpk.poles),
        gain: zpk.gain * bw.powi(degree),
    }
}

/// Map s-plane roots into the z-plane; zeros at infinity land on z = -1
fn bilinear(zpk: Zpk, fs: f64) -> Zpk {
    let fs2 = Complex64::new(2.0 * fs, 0.0);
    let degree = zpk.relative_degree();

    let num: Complex64 = zpk.zeros.iter().map(|&z| fs2 - z).product();
    let den: Complex64 = zpk.poles.iter().map(|&p| fs2 - p).product();

    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));

    Zpk {
        zeros,
        poles: zpk.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect(),
        gain: zpk.gain * (num / den).re,
    }
}

fn to_sections(zpk: Zpk) -> Result<Vec<Biquad>, FilterError> {
    if let Some(pole) = zpk.poles.iter().find(|p| p.norm() >= 1.0) {
        return Err(FilterError::InvalidCoefficients(format!(
            "Pole outside the unit circle: {}",
            pole
        )));
    }

    let denominators = quadratic_factors(&zpk.poles);
    let mut numerators = quadratic_factors(&zpk.zeros);
    if numerators.len() > denominators.len() {
        return Err(FilterError::InvalidCoefficients(
            "More zero sections than pole sections".to_string(),
        ));
    }
    numerators.resize(denominators.len(), [1.0, 0.0, 0.0]);

    let mut sections: Vec<Biquad> = numerators
        .into_iter()
        .zip(denominators)
        .map(|(b, a)| Biquad { b, a })
        .collect();

    if let Some(first) = sections.first_mut() {
        for coeff in first.b.iter_mut() {
            *coeff *= zpk.gain;
        }
    }

    if sections
        .iter()
        .any(|s| s.b.iter().chain(s.a.iter()).any(|c| !c.is_finite()))
    {
        return Err(FilterError::InvalidCoefficients(
            "Non-finite section coefficient".to_string(),
        ));
    }

    Ok(sections)
}

/// Group roots into monic quadratics `[1, c1, c2]`.
///
/// Complex roots pair with their conjugate, ordered from the root furthest
/// from the unit circle to the closest. Real roots pair outermost-first so
/// a band-pass gets one zero at +1 and one at -1 per section. An odd real
/// root is left as a first-order factor.
fn quadratic_factors(roots: &[Complex64]) -> Vec<[f64; 3]> {
    let mut complex: Vec<Complex64> = roots
        .iter()
        .filter(|r| r.im > REAL_TOLERANCE)
        .copied()
        .collect();
    complex.sort_by(|a, b| a.norm().total_cmp(&b.norm()));

    let mut real: Vec<f64> = roots
        .iter()
        .filter(|r| r.im.abs() <= REAL_TOLERANCE)
        .map(|r| r.re)
        .collect();
    real.sort_by(|a, b| a.total_cmp(b));

    let mut factors: Vec<[f64; 3]> = complex
        .iter()
        .map(|r| [1.0, -2.0 * r.re, r.norm_sqr()])
        .collect();

    let (mut lo, mut hi) = (0usize, real.len());
    while hi - lo >= 2 {
        let (x, y) = (real[lo], real[hi - 1]);
        factors.push([1.0, -(x + y), x * y]);
        lo += 1;
        hi -= 1;
    }
    if hi > lo {
        factors.push([1.0, -real[lo], 0.0]);
    }

    factors
}
