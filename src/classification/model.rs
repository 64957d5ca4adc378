// src/classification/model.rs
//! Pre-trained decision functions
//!
//! The classifier is trained offline and shipped as a JSON artifact holding
//! the support vectors of a binary SVM. The core only evaluates it.

use crate::error::{PureItError, PureItErrorBuilder, PureItResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

pub type ClassLabel = i64;

/// Label of the CTS class
pub const POSITIVE_CLASS: ClassLabel = 1;
pub const NEGATIVE_CLASS: ClassLabel = 0;

/// Opaque binary classifier
pub trait DecisionFunction {
    /// Number of feature columns the classifier expects
    fn n_features(&self) -> usize;

    /// One label per row of `features`
    fn predict(&self, features: ArrayView2<f64>) -> PureItResult<Vec<ClassLabel>>;
}

/// SVM kernel, matching the usual `libsvm` parameterisation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Kernel {
    Linear,
    Rbf { gamma: f64 },
    Poly { gamma: f64, coef0: f64, degree: i32 },
    Sigmoid { gamma: f64, coef0: f64 },
}

impl Kernel {
    pub fn evaluate(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match *self {
            Kernel::Linear => a.dot(&b),
            Kernel::Rbf { gamma } => {
                let distance: f64 = a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum();
                (-gamma * distance).exp()
            }
            Kernel::Poly { gamma, coef0, degree } => (gamma * a.dot(&b) + coef0).powi(degree),
            Kernel::Sigmoid { gamma, coef0 } => (gamma * a.dot(&b) + coef0).tanh(),
        }
    }

    fn parameters_finite(&self) -> bool {
        match *self {
            Kernel::Linear => true,
            Kernel::Rbf { gamma } => gamma.is_finite(),
            Kernel::Poly { gamma, coef0, .. } | Kernel::Sigmoid { gamma, coef0 } => {
                gamma.is_finite() && coef0.is_finite()
            }
        }
    }
}

/// On-disk form of the model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SvmArtifact {
    pub kernel: Kernel,
    pub support_vectors: Vec<Vec<f64>>,
    /// Signed dual coefficient of each support vector
    pub dual_coef: Vec<f64>,
    pub intercept: f64,
    /// `[negative, positive]`: the second label wins when the decision value is positive
    pub classes: [ClassLabel; 2],
}

/// Validated binary SVM
#[derive(Debug, Clone)]
pub struct SvmModel {
    kernel: Kernel,
    support_vectors: Array2<f64>,
    dual_coef: Array1<f64>,
    intercept: f64,
    classes: [ClassLabel; 2],
}

impl SvmModel {
    pub fn from_artifact(artifact: SvmArtifact) -> PureItResult<Self> {
        let invalid = |reason: String| PureItError::Model { reason };

        let n_vectors = artifact.support_vectors.len();
        if n_vectors == 0 {
            return Err(invalid("model has no support vectors".to_string()));
        }
        if artifact.dual_coef.len() != n_vectors {
            return Err(invalid(format!(
                "{} dual coefficients for {} support vectors",
                artifact.dual_coef.len(),
                n_vectors
            )));
        }
        let n_features = artifact.support_vectors[0].len();
        if n_features == 0 || artifact.support_vectors.iter().any(|sv| sv.len() != n_features) {
            return Err(invalid("support vectors differ in length".to_string()));
        }
        let all_finite = artifact
            .support_vectors
            .iter()
            .flatten()
            .chain(artifact.dual_coef.iter())
            .all(|v| v.is_finite());
        if !all_finite || !artifact.intercept.is_finite() || !artifact.kernel.parameters_finite() {
            return Err(invalid("non-finite model parameter".to_string()));
        }

        let flat: Vec<f64> = artifact.support_vectors.into_iter().flatten().collect();
        let support_vectors = Array2::from_shape_vec((n_vectors, n_features), flat)
            .map_err(|e| invalid(e.to_string()))?;

        Ok(Self {
            kernel: artifact.kernel,
            support_vectors,
            dual_coef: Array1::from(artifact.dual_coef),
            intercept: artifact.intercept,
            classes: artifact.classes,
        })
    }

    pub fn kernel(&self) -> Kernel {
        self.kernel
    }

    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.nrows()
    }

    pub fn classes(&self) -> [ClassLabel; 2] {
        self.classes
    }

    /// Signed distance from the separating surface
    pub fn decision_value(&self, row: ArrayView1<f64>) -> f64 {
        self.support_vectors
            .rows()
            .into_iter()
            .zip(self.dual_coef.iter())
            .map(|(sv, &coef)| coef * self.kernel.evaluate(sv, row))
            .sum::<f64>()
            + self.intercept
    }
}

impl DecisionFunction for SvmModel {
    fn n_features(&self) -> usize {
        self.support_vectors.ncols()
    }

    fn predict(&self, features: ArrayView2<f64>) -> PureItResult<Vec<ClassLabel>> {
        if features.ncols() != self.n_features() {
            return Err(PureItErrorBuilder::new("svm", "predict").invalid_data(
                "features",
                &format!("expected {} columns, got {}", self.n_features(), features.ncols()),
            ));
        }
        Ok(features
            .rows()
            .into_iter()
            .map(|row| {
                if self.decision_value(row) > 0.0 {
                    self.classes[1]
                } else {
                    self.classes[0]
                }
            })
            .collect())
    }
}

/// Load the classifier artifact.
///
/// A missing file is [`PureItError::ModelNotFound`] so the caller can tell the
/// operator "model not found" and go back to idle.
pub fn load_model<P: AsRef<Path>>(path: P) -> PureItResult<SvmModel> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(PureItError::ModelNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|e| PureItError::Io {
        operation: format!("read model {}", path.display()),
        source: Arc::new(e),
    })?;
    let artifact: SvmArtifact = serde_json::from_str(&content).map_err(|e| PureItError::Model {
        reason: format!("{}: {}", path.display(), e),
    })?;

    let model = SvmModel::from_artifact(artifact)?;
    info!(
        "Loaded {:?} SVM with {} support vectors from {}",
        model.kernel,
        model.n_support_vectors(),
        path.display()
    );
    Ok(model)
}
