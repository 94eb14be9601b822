//! Prediction and pick selection
//!
//! Choose a probability source, score every match and surface value picks.

pub mod inference;
pub mod picks;
pub mod source;

pub use inference::{MatchPrediction, Predictor};
pub use picks::PickSelector;
pub use source::{ProbabilityEstimator, ProbabilitySource};
