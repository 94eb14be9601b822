//! Feature extraction and labeling
//!
//! Converts raw match data into model-ready features.

pub mod builder;
pub mod label;
pub mod odds;
pub mod team_form;

pub use builder::{FeatureBuilder, FeatureVector};
pub use label::{labeled_examples, LabeledExample};
pub use odds::{MarketProbabilities, DEFAULT_IMPLIED};
pub use team_form::{FormStats, FormTable, TeamForm};
