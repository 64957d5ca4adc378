// src/classification/scaler.rs
//! Feature standardisation
//!
//! Detection has historically standardised each session with its own mean
//! and variance, which ties the classifier input to the value range of that
//! one recording. A scaler persisted from training time is available as an
//! alternative; the per-session behaviour stays the default.

use crate::config::constants::classifier::MIN_STD;
use crate::error::{PureItError, PureItErrorBuilder, PureItResult};
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

/// Where standardisation statistics come from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ScalingMode {
    /// Fit mean and standard deviation on the session being classified
    #[default]
    PerSession,
    /// Use statistics saved alongside the trained model
    Persisted { mean: Vec<f64>, std: Vec<f64> },
}

impl ScalingMode {
    pub fn validate(&self) -> PureItResult<()> {
        match self {
            ScalingMode::PerSession => Ok(()),
            ScalingMode::Persisted { mean, std } => {
                StandardScaler::from_parts(mean.clone(), std.clone()).map(|_| ())
            }
        }
    }
}

/// Zero-mean, unit-variance scaling per feature column
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl StandardScaler {
    /// Fit on the rows of `features` using the population standard deviation.
    ///
    /// Constant columns get a scale of one so they map to zero instead of
    /// dividing by zero.
    pub fn fit(features: ArrayView2<f64>) -> PureItResult<Self> {
        let mean = features.mean_axis(Axis(0)).ok_or_else(|| PureItError::InsufficientData {
            operation: "standardisation".to_string(),
            reason: "no feature rows".to_string(),
        })?;
        let scale = features
            .std_axis(Axis(0), 0.0)
            .mapv(|std| if std < MIN_STD { 1.0 } else { std });
        Ok(Self { mean, scale })
    }

    pub fn from_parts(mean: Vec<f64>, std: Vec<f64>) -> PureItResult<Self> {
        let err = |reason: &str| PureItErrorBuilder::new("scaler", "from_parts").configuration(reason);
        if mean.is_empty() || mean.len() != std.len() {
            return Err(err("persisted mean and std must be non-empty and equally long"));
        }
        if mean.iter().any(|v| !v.is_finite()) {
            return Err(err("persisted mean must be finite"));
        }
        if std.iter().any(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(err("persisted std must be finite and positive"));
        }
        Ok(Self {
            mean: Array1::from(mean),
            scale: Array1::from(std),
        })
    }

    /// Build the scaler a session should use
    pub fn for_session(mode: &ScalingMode, features: ArrayView2<f64>) -> PureItResult<Self> {
        match mode {
            ScalingMode::PerSession => Self::fit(features),
            ScalingMode::Persisted { mean, std } => Self::from_parts(mean.clone(), std.clone()),
        }
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    pub fn transform(&self, features: ArrayView2<f64>) -> PureItResult<Array2<f64>> {
        if features.ncols() != self.mean.len() {
            return Err(PureItErrorBuilder::new("scaler", "transform").invalid_data(
                "features",
                &format!("expected {} columns, got {}", self.mean.len(), features.ncols()),
            ));
        }
        Ok((&features - &self.mean) / &self.scale)
    }
}
