//! Outcome labels for training

use super::builder::FeatureVector;
use crate::Outcome;

/// A feature vector with a known outcome
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledExample {
    pub features: FeatureVector,
    pub label: Outcome,
}

/// Label for a feature vector; None if the match is unresolved
pub fn label(features: &FeatureVector) -> Option<Outcome> {
    Outcome::from_goals(features.home_goals, features.away_goals)
}

/// Keep only resolved matches, paired with their labels
pub fn labeled_examples(features: &[FeatureVector]) -> Vec<LabeledExample> {
    features
        .iter()
        .filter_map(|f| {
            label(f).map(|label| LabeledExample {
                features: f.clone(),
                label,
            })
        })
        .collect()
}

/// Count examples per class, indexed by [`Outcome::index`]
pub fn class_counts(examples: &[LabeledExample]) -> [usize; 3] {
    let mut counts = [0usize; 3];
    for example in examples {
        counts[example.label.index()] += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::FeatureBuilder;
    use crate::MatchRecord;
    use chrono::NaiveDate;

    fn vector(home_goals: Option<u32>, away_goals: Option<u32>) -> FeatureVector {
        let mut record =
            MatchRecord::new("m", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "A", "B");
        record.home_goals = home_goals;
        record.away_goals = away_goals;
        FeatureBuilder::with_window(3).build(&[record]).remove(0)
    }

    #[test]
    fn test_label_rule() {
        assert_eq!(label(&vector(Some(2), Some(1))), Some(Outcome::Home));
        assert_eq!(label(&vector(Some(1), Some(1))), Some(Outcome::Draw));
        assert_eq!(label(&vector(Some(0), Some(3))), Some(Outcome::Away));
        assert_eq!(label(&vector(None, Some(2))), None);
        assert_eq!(label(&vector(Some(2), None)), None);
    }

    #[test]
    fn test_unlabeled_examples_are_excluded() {
        let features = vec![
            vector(Some(2), Some(1)),
            vector(None, Some(2)),
            vector(Some(2), None),
            vector(Some(0), Some(3)),
        ];
        let examples = labeled_examples(&features);
        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].label, Outcome::Home);
        assert_eq!(examples[1].label, Outcome::Away);
        assert_eq!(class_counts(&examples), [1, 0, 1]);
    }
}
