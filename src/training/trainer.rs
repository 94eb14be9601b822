//! Model training: boosted classifier plus holdout calibration

use std::path::PathBuf;

use super::metrics::{Metrics, TrainingReport};
use super::split::stratified_split;
use crate::features::label::{class_counts, labeled_examples, LabeledExample};
use crate::features::FeatureBuilder;
use crate::model::{BoosterParams, CalibratedClassifier, GradientBoostedTrees, ModelArtifact};
use crate::{Config, MatchRecord, Outcome, QuinielaError, Result};

/// Below this many labeled matches training still runs, with a warning
pub const SMALL_DATASET: usize = 5;

/// Trainer for the calibrated outcome model
pub struct Trainer {
    config: Config,
}

impl Trainer {
    pub fn new(config: Config) -> Self {
        Trainer { config }
    }

    /// Build features, fit and calibrate a model without touching disk
    pub fn fit(&self, matches: &[MatchRecord]) -> Result<ModelArtifact> {
        if matches.is_empty() {
            return Err(QuinielaError::NoMatches);
        }

        let features = FeatureBuilder::new(&self.config.features).build(matches);
        let examples = labeled_examples(&features);
        if examples.is_empty() {
            return Err(QuinielaError::NoTrainingData);
        }
        if examples.len() < SMALL_DATASET {
            log::warn!(
                "Only {} labeled matches; the model will be unreliable",
                examples.len()
            );
        }

        let labels: Vec<Outcome> = examples.iter().map(|e| e.label).collect();
        let training = &self.config.training;
        let split = stratified_split(&labels, training.test_fraction, training.seed)?;

        log::info!(
            "Training on {} labeled matches: train={}, holdout={}",
            examples.len(),
            split.train.len(),
            split.holdout.len()
        );

        let (train_rows, train_labels) = select(&examples, &split.train);
        let (holdout_rows, holdout_labels) = select(&examples, &split.holdout);

        let train_classes: Vec<usize> = train_labels.iter().map(|o| o.index()).collect();
        let params = BoosterParams::from(training);
        log::info!(
            "Fitting {} boosting rounds (lr {}, max depth {})",
            params.rounds,
            params.learning_rate,
            params.max_depth
        );
        let classifier =
            GradientBoostedTrees::fit(&train_rows, &train_classes, Outcome::ALL.len(), params)?;

        let model = CalibratedClassifier::fit(classifier, &holdout_rows, &holdout_labels)?;

        let raw: Vec<_> = holdout_rows.iter().map(|r| model.predict_raw(r)).collect();
        let calibrated: Vec<_> = holdout_rows.iter().map(|r| model.predict(r)).collect();
        let report = TrainingReport {
            labeled: examples.len(),
            train_size: split.train.len(),
            holdout_size: split.holdout.len(),
            class_counts: class_counts(&examples),
            raw: Metrics::evaluate(&raw, &holdout_labels),
            calibrated: Metrics::evaluate(&calibrated, &holdout_labels),
        };
        log::info!("  Holdout (raw):        {}", report.raw);
        log::info!("  Holdout (calibrated): {}", report.calibrated);

        Ok(ModelArtifact::new(model, self.config.features.window, report))
    }

    /// Fit a model and persist it at the configured path, replacing any previous artifact
    pub fn train(&self, matches: &[MatchRecord]) -> Result<PathBuf> {
        let artifact = self.fit(matches)?;
        let path = self.config.data.model_path.clone();
        artifact.save(&path)?;
        log::info!("Saved model to {}", path.display());
        Ok(path)
    }
}

fn select(examples: &[LabeledExample], indices: &[usize]) -> (Vec<Vec<f64>>, Vec<Outcome>) {
    indices
        .iter()
        .map(|&i| {
            let example = &examples[i];
            (example.features.to_inputs().to_vec(), example.label)
        })
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    /// A league where the stronger side (lower index) tends to win
    fn league(rounds: usize) -> Vec<MatchRecord> {
        let teams = ["Lions", "Tigers", "Bears", "Wolves", "Hawks", "Owls"];
        let start = NaiveDate::from_ymd_opt(2023, 8, 1).unwrap();
        let mut matches = Vec::new();
        let mut day = 0i64;
        for round in 0..rounds {
            for (i, home) in teams.iter().enumerate() {
                let j = (i + round + 1) % teams.len();
                if i == j {
                    continue;
                }
                let away = teams[j];
                let (hg, ag) = match (i + 2 * round) % 5 {
                    0 | 1 if i < j => (2, 0),
                    0 | 1 => (0, 1),
                    2 => (1, 1),
                    3 => (3, 1),
                    _ => (0, 2),
                };
                let id = format!("r{}-{}", round, i);
                matches.push(
                    MatchRecord::new(id, start + Duration::days(day), *home, away)
                        .with_score(hg, ag)
                        .with_odds(2.1, 3.3, 3.6),
                );
                day += 1;
            }
        }
        matches
    }

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.data.model_path = dir.join("model.json");
        config.training.rounds = 10;
        config
    }

    #[test]
    fn test_no_matches() {
        let trainer = Trainer::new(Config::default());
        assert!(matches!(trainer.fit(&[]), Err(QuinielaError::NoMatches)));
    }

    #[test]
    fn test_no_labeled_matches() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let matches = vec![MatchRecord::new("m1", date, "A", "B")];
        let trainer = Trainer::new(Config::default());
        assert!(matches!(
            trainer.fit(&matches),
            Err(QuinielaError::NoTrainingData)
        ));
    }

    #[test]
    fn test_infeasible_split_propagates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let matches = vec![
            MatchRecord::new("m1", date, "A", "B").with_score(1, 0),
            MatchRecord::new("m2", date, "B", "A").with_score(1, 1),
            MatchRecord::new("m3", date, "A", "B").with_score(0, 2),
        ];
        let trainer = Trainer::new(Config::default());
        assert!(matches!(trainer.fit(&matches), Err(QuinielaError::Split(_))));
    }

    #[test]
    fn test_small_dataset_still_trains() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let matches = vec![
            MatchRecord::new("m1", date, "A", "B").with_score(2, 0),
            MatchRecord::new("m2", date, "C", "D").with_score(0, 1),
            MatchRecord::new("m3", date, "B", "C").with_score(3, 1),
            MatchRecord::new("m4", date, "D", "A").with_score(1, 2),
        ];
        assert!(matches.len() < SMALL_DATASET);

        // A 20% holdout of four rows cannot hold both classes
        let result = Trainer::new(Config::default()).fit(&matches);
        assert!(matches!(result, Err(QuinielaError::Split(_))));

        let mut config = Config::default();
        config.training.test_fraction = 0.5;
        config.training.rounds = 3;
        let artifact = Trainer::new(config).fit(&matches).unwrap();
        assert_eq!(artifact.report.labeled, 4);
        assert_eq!(artifact.report.holdout_size, 2);
    }

    #[test]
    fn test_fit_reports_split() {
        let matches = league(12);
        let dir = tempfile::tempdir().unwrap();
        let artifact = Trainer::new(config_in(dir.path())).fit(&matches).unwrap();

        let report = &artifact.report;
        assert_eq!(report.labeled, matches.len());
        assert_eq!(report.train_size + report.holdout_size, matches.len());
        assert_eq!(report.class_counts.iter().sum::<usize>(), matches.len());
        assert_eq!(report.calibrated.samples, report.holdout_size);
        assert_eq!(artifact.window, 3);
    }

    #[test]
    fn test_train_writes_loadable_artifact() {
        let matches = league(12);
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let path = Trainer::new(config.clone()).train(&matches).unwrap();
        assert_eq!(path, config.data.model_path);

        let artifact = ModelArtifact::load(&path).unwrap();
        let features = FeatureBuilder::new(&config.features).build(&matches);
        for f in &features {
            let probs = artifact.predict(f);
            assert!((probs.sum() - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_training_is_reproducible() {
        let matches = league(10);
        let dir = tempfile::tempdir().unwrap();
        let trainer = Trainer::new(config_in(dir.path()));
        let a = trainer.fit(&matches).unwrap();
        let b = trainer.fit(&matches).unwrap();
        assert_eq!(a.model, b.model);
        assert_eq!(a.report, b.report);
    }
}
