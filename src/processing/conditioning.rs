// src/processing/conditioning.rs
//! EMG conditioning: DC removal, band-pass, rectification and envelope
//!
//! Every stage is a pure function of its batch. The only state is the pair of
//! filters, designed once when the conditioner is built.

use crate::config::EmgConfig;
use crate::error::{ProcessingStage, PureItErrorBuilder, PureItResult};
use crate::processing::filters::SosFilter;

/// Filtered signal and its envelope, sample-aligned with the raw batch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConditionedBatch {
    pub filtered: Vec<f64>,
    pub envelope: Vec<f64>,
}

impl ConditionedBatch {
    pub fn len(&self) -> usize {
        self.filtered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filtered.is_empty()
    }
}

/// Subtract the batch mean from every sample
pub fn remove_dc(batch: &[f64]) -> Vec<f64> {
    if batch.is_empty() {
        return Vec::new();
    }
    let mean = batch.iter().sum::<f64>() / batch.len() as f64;
    batch.iter().map(|&x| x - mean).collect()
}

/// Full-wave rectification
pub fn rectify(signal: &[f64]) -> Vec<f64> {
    signal.iter().map(|x| x.abs()).collect()
}

/// Uniform moving average with "same" output length.
///
/// Equivalent to the centre slice of the full convolution with a
/// `window`-long kernel of `1 / window`. Samples near either edge see
/// fewer than `window` inputs and taper toward zero.
pub fn moving_average_same(signal: &[f64], window: usize) -> Vec<f64> {
    let n = signal.len();
    if n == 0 || window == 0 {
        return vec![0.0; n];
    }

    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &x in signal {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + x);
    }

    let offset = (window - 1) / 2;
    let scale = 1.0 / window as f64;
    (0..n)
        .map(|i| {
            let hi = (i + offset).min(n - 1);
            let lo = (i + offset + 1).saturating_sub(window);
            (prefix[hi + 1] - prefix[lo]) * scale
        })
        .collect()
}

/// Short-time RMS of a rectified signal, before ripple smoothing
pub fn moving_rms(rectified: &[f64], window: usize) -> Vec<f64> {
    let squared: Vec<f64> = rectified.iter().map(|x| x * x).collect();
    moving_average_same(&squared, window)
        .into_iter()
        // prefix-sum rounding can dip a hair below zero
        .map(|power| power.max(0.0).sqrt())
        .collect()
}

/// Designed filters plus envelope parameters for one session
#[derive(Debug, Clone)]
pub struct EmgConditioner {
    bandpass: SosFilter,
    envelope_lowpass: SosFilter,
    envelope_window: usize,
}

impl EmgConditioner {
    /// Design both filters from configuration
    pub fn new(config: &EmgConfig) -> PureItResult<Self> {
        let bandpass = SosFilter::design(config.filters.bandpass_spec(config.sampling_rate_hz))?;
        let envelope_lowpass =
            SosFilter::design(config.filters.envelope_spec(config.sampling_rate_hz))?;
        Self::from_filters(bandpass, envelope_lowpass, config.filters.envelope_window)
    }

    pub fn from_filters(
        bandpass: SosFilter,
        envelope_lowpass: SosFilter,
        envelope_window: usize,
    ) -> PureItResult<Self> {
        if envelope_window == 0 {
            return Err(PureItErrorBuilder::new("conditioner", "new")
                .configuration("envelope window must be at least one sample"));
        }
        Ok(Self {
            bandpass,
            envelope_lowpass,
            envelope_window,
        })
    }

    pub fn bandpass(&self) -> &SosFilter {
        &self.bandpass
    }

    pub fn envelope_lowpass(&self) -> &SosFilter {
        &self.envelope_lowpass
    }

    pub fn envelope_window(&self) -> usize {
        self.envelope_window
    }

    /// Run one raw batch through every stage in order.
    ///
    /// Fails on an empty batch and on any non-finite value, naming the stage
    /// where it appeared.
    pub fn condition(&self, raw: &[f64]) -> PureItResult<ConditionedBatch> {
        if raw.is_empty() {
            return Err(PureItErrorBuilder::new("conditioner", "condition")
                .invalid_data("batch", "empty batch"));
        }
        ensure_finite(raw, ProcessingStage::Acquisition)?;

        let centred = remove_dc(raw);
        ensure_finite(&centred, ProcessingStage::DcRemoval)?;

        let filtered = self.bandpass.filter(&centred);
        ensure_finite(&filtered, ProcessingStage::Bandpass)?;

        let rectified = rectify(&filtered);
        let rms = moving_rms(&rectified, self.envelope_window);
        let envelope = self.envelope_lowpass.filter(&rms);
        ensure_finite(&envelope, ProcessingStage::Envelope)?;

        Ok(ConditionedBatch { filtered, envelope })
    }
}

fn ensure_finite(values: &[f64], stage: ProcessingStage) -> PureItResult<()> {
    match values.iter().position(|v| !v.is_finite()) {
        None => Ok(()),
        Some(index) => Err(PureItErrorBuilder::new("conditioner", "condition").processing(
            stage,
            &format!("non-finite value at sample {}", index),
        )),
    }
}
