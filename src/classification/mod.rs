// src/classification/mod.rs
//! CTS screening from flex-sensor angles
//!
//! The classifier itself is trained offline. This module standardises the
//! windowed angle rows, asks the decision function for one label per row and
//! reduces the labels to a single verdict.

pub mod detection;
pub mod model;
pub mod scaler;
pub mod verdict;

pub use detection::{classify_records, features_matrix, DetectionResult, Detector};
pub use model::{
    load_model, ClassLabel, DecisionFunction, Kernel, SvmArtifact, SvmModel, NEGATIVE_CLASS, POSITIVE_CLASS,
};
pub use scaler::{ScalingMode, StandardScaler};
pub use verdict::{reduce_predictions, TieBreak, Verdict, VerdictSummary};
