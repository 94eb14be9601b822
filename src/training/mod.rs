//! Model training
//!
//! Stratified splitting, boosted-tree fitting, calibration and holdout metrics.

pub mod metrics;
pub mod split;
pub mod trainer;

pub use metrics::{Metrics, TrainingReport};
pub use split::{stratified_split, StratifiedSplit};
pub use trainer::Trainer;
