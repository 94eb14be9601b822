//! Stratified train/holdout split with a fixed seed

use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::{Outcome, QuinielaError, Result};

/// Row indices of each side of the split, ascending
#[derive(Debug, Clone, PartialEq)]
pub struct StratifiedSplit {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

/// Split labels into train and holdout sets preserving class proportions.
///
/// The holdout size is `ceil(test_fraction * n)`. Fails when a present class
/// has a single member, or when either side would be smaller than the number
/// of classes present.
pub fn stratified_split(
    labels: &[Outcome],
    test_fraction: f64,
    seed: u64,
) -> Result<StratifiedSplit> {
    let n = labels.len();
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(QuinielaError::Split(format!(
            "test fraction must be in (0, 1), got {}",
            test_fraction
        )));
    }

    let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); Outcome::ALL.len()];
    for (i, label) in labels.iter().enumerate() {
        by_class[label.index()].push(i);
    }

    let present: Vec<usize> = (0..by_class.len())
        .filter(|&c| !by_class[c].is_empty())
        .collect();
    if present.is_empty() {
        return Err(QuinielaError::Split("no labeled examples".to_string()));
    }

    if let Some(&smallest) = present.iter().min_by_key(|&&c| by_class[c].len()) {
        if by_class[smallest].len() < 2 {
            return Err(QuinielaError::Split(format!(
                "class {} has only {} member; every class needs at least 2",
                Outcome::ALL[smallest],
                by_class[smallest].len()
            )));
        }
    }

    let n_holdout = ((test_fraction * n as f64) - 1e-9).ceil().max(0.0) as usize;
    let n_train = n - n_holdout.min(n);
    if n_holdout < present.len() || n_train < present.len() {
        return Err(QuinielaError::Split(format!(
            "{} examples give {} train / {} holdout rows, need at least {} on each side (one per class)",
            n,
            n_train,
            n_holdout,
            present.len()
        )));
    }

    // Largest-remainder allocation of holdout rows across classes
    let mut allocation = vec![0usize; by_class.len()];
    let mut remainders = Vec::with_capacity(present.len());
    for &c in &present {
        let share = by_class[c].len() as f64 * n_holdout as f64 / n as f64;
        allocation[c] = share.floor() as usize;
        remainders.push((c, share - share.floor()));
    }
    remainders.sort_by(|a, b| b.1.total_cmp(&a.1));
    let mut missing = n_holdout - allocation.iter().sum::<usize>();
    for &(c, _) in remainders.iter().cycle() {
        if missing == 0 {
            break;
        }
        if allocation[c] < by_class[c].len() {
            allocation[c] += 1;
            missing -= 1;
        }
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut holdout = Vec::with_capacity(n_holdout);
    for (c, members) in by_class.iter_mut().enumerate() {
        members.shuffle(&mut rng);
        holdout.extend_from_slice(&members[..allocation[c]]);
        train.extend_from_slice(&members[allocation[c]..]);
    }
    train.sort_unstable();
    holdout.sort_unstable();

    log::debug!(
        "Stratified split of {}: train={}, holdout={} (per class {:?})",
        n,
        train.len(),
        holdout.len(),
        allocation
    );

    Ok(StratifiedSplit { train, holdout })
}
