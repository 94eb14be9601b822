//! Persisted model artifact
//!
//! A single JSON file holding the calibrated classifier and its metadata.
//! Writes go to a sibling temporary file that is renamed over the target, so a
//! reader sees either the old artifact or the new one, never a partial file.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use super::calibrated::CalibratedClassifier;
use crate::features::FeatureVector;
use crate::training::metrics::TrainingReport;
use crate::{OutcomeProbabilities, QuinielaError, Result};

pub const ARTIFACT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    /// Rolling form window the features were built with
    pub window: usize,
    pub model: CalibratedClassifier,
    pub report: TrainingReport,
}

impl ModelArtifact {
    pub fn new(model: CalibratedClassifier, window: usize, report: TrainingReport) -> Self {
        ModelArtifact {
            version: ARTIFACT_VERSION,
            created_at: Utc::now(),
            feature_names: FeatureVector::NAMES.iter().map(|s| s.to_string()).collect(),
            window,
            model,
            report,
        }
    }

    /// Calibrated probabilities for a match
    pub fn predict(&self, features: &FeatureVector) -> OutcomeProbabilities {
        self.model.predict(&features.to_inputs())
    }

    /// Write the artifact, replacing any existing file atomically
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = serde_json::to_vec(self)?;
        write_atomic(path.as_ref(), &bytes)
    }

    /// Load and validate an artifact
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))?;

        if artifact.version != ARTIFACT_VERSION {
            return Err(QuinielaError::Model(format!(
                "{} has artifact version {}, expected {}",
                path.display(),
                artifact.version,
                ARTIFACT_VERSION
            )));
        }
        if artifact.feature_names != FeatureVector::NAMES {
            return Err(QuinielaError::Model(format!(
                "{} was trained on features {:?}",
                path.display(),
                artifact.feature_names
            )));
        }
        if artifact.model.classifier().num_features() != FeatureVector::DIM {
            return Err(QuinielaError::Model(format!(
                "{} classifier expects {} inputs",
                path.display(),
                artifact.model.classifier().num_features()
            )));
        }
        artifact.model.validate()?;

        Ok(artifact)
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "model".into());
    name.push(format!(".{}.tmp", std::process::id()));
    path.with_file_name(name)
}

/// Write bytes to a temporary sibling, flush to disk, then rename over `path`
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = temp_path(path);
    let written = (|| -> std::io::Result<()> {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
        fs::rename(&tmp, path)
    })();

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}
