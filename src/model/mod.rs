//! Outcome classifier
//!
//! - Gradient-boosted trees: multiclass softmax classifier over match features
//! - Isotonic regression: per-class probability calibration
//! - Artifact: the persisted calibrated model

pub mod artifact;
pub mod calibrated;
pub mod gbdt;
pub mod isotonic;

pub use artifact::ModelArtifact;
pub use calibrated::CalibratedClassifier;
pub use gbdt::{BoosterParams, GradientBoostedTrees};
pub use isotonic::IsotonicRegression;
