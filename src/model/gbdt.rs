//! Gradient-boosted regression trees with a softmax objective
//!
//! Second-order boosting: every round fits one regression tree per class to
//! the gradient/hessian of the multiclass log loss, using exact greedy splits.

use serde::{Deserialize, Serialize};

use crate::{QuinielaError, Result, TrainingConfig};

/// Boosting hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoosterParams {
    /// Number of boosting rounds (one tree per class per round)
    pub rounds: usize,
    /// Shrinkage applied to every leaf weight
    pub learning_rate: f64,
    pub max_depth: usize,
    /// L2 regularization on leaf weights
    pub lambda: f64,
    /// Minimum hessian sum in each child of a split
    pub min_child_weight: f64,
}

impl Default for BoosterParams {
    fn default() -> Self {
        BoosterParams {
            rounds: 50,
            learning_rate: 0.1,
            max_depth: 6,
            lambda: 1.0,
            min_child_weight: 1.0,
        }
    }
}

impl From<&TrainingConfig> for BoosterParams {
    fn from(config: &TrainingConfig) -> Self {
        BoosterParams {
            rounds: config.rounds,
            learning_rate: config.learning_rate,
            max_depth: config.max_depth,
            lambda: config.lambda,
            min_child_weight: config.min_child_weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum TreeNode {
    Leaf {
        value: f64,
    },
    /// Rows with `x[feature] < threshold` go left
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A single regression tree; node 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

struct GrowContext<'a> {
    rows: &'a [Vec<f64>],
    grad: &'a [f64],
    hess: &'a [f64],
    params: &'a BoosterParams,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit a tree to per-row gradients and hessians
    fn fit(rows: &[Vec<f64>], grad: &[f64], hess: &[f64], params: &BoosterParams) -> Self {
        let ctx = GrowContext {
            rows,
            grad,
            hess,
            params,
        };
        let mut tree = RegressionTree { nodes: Vec::new() };
        let mut indices: Vec<usize> = (0..rows.len()).collect();
        tree.grow(&ctx, &mut indices, 0);
        tree
    }

    fn grow(&mut self, ctx: &GrowContext<'_>, indices: &mut [usize], depth: usize) -> usize {
        let g: f64 = indices.iter().map(|&i| ctx.grad[i]).sum();
        let h: f64 = indices.iter().map(|&i| ctx.hess[i]).sum();

        let node = self.nodes.len();
        self.nodes.push(TreeNode::Leaf {
            value: -g / (h + ctx.params.lambda) * ctx.params.learning_rate,
        });

        if depth >= ctx.params.max_depth || indices.len() < 2 {
            return node;
        }

        let Some(split) = best_split(ctx, indices, g, h) else {
            return node;
        };

        let mut mid = 0;
        for i in 0..indices.len() {
            if ctx.rows[indices[i]][split.feature] < split.threshold {
                indices.swap(i, mid);
                mid += 1;
            }
        }

        let (left_rows, right_rows) = indices.split_at_mut(mid);
        let left = self.grow(ctx, left_rows, depth + 1);
        let right = self.grow(ctx, right_rows, depth + 1);
        self.nodes[node] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node
    }

    pub fn predict(&self, x: &[f64]) -> f64 {
        let mut node = 0usize;
        loop {
            match self.nodes.get(node) {
                Some(TreeNode::Leaf { value }) => return *value,
                Some(TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = x.get(*feature).copied().unwrap_or(0.0);
                    node = if value < *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    /// Check a deserialized tree: children come after their parent and exist
    fn validate(&self, num_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(QuinielaError::Model("tree has no nodes".to_string()));
        }
        for (index, node) in self.nodes.iter().enumerate() {
            match *node {
                TreeNode::Leaf { value } if !value.is_finite() => {
                    return Err(QuinielaError::Model(format!(
                        "leaf {} has non-finite value",
                        index
                    )));
                }
                TreeNode::Leaf { .. } => {}
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let in_tree = |child: usize| child > index && child < self.nodes.len();
                    if !in_tree(left) || !in_tree(right) {
                        return Err(QuinielaError::Model(format!(
                            "split {} points to missing children {} and {}",
                            index, left, right
                        )));
                    }
                    if feature >= num_features || threshold.is_nan() {
                        return Err(QuinielaError::Model(format!(
                            "split {} tests feature {} at {}",
                            index, feature, threshold
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[cfg(test)]
    fn depth(&self) -> usize {
        fn depth_of(nodes: &[TreeNode], node: usize) -> usize {
            match nodes.get(node) {
                Some(TreeNode::Split { left, right, .. }) => {
                    1 + depth_of(nodes, *left).max(depth_of(nodes, *right))
                }
                _ => 0,
            }
        }
        depth_of(&self.nodes, 0)
    }
}

/// Exact greedy search over every feature's sorted distinct values
fn best_split(
    ctx: &GrowContext<'_>,
    indices: &[usize],
    g_total: f64,
    h_total: f64,
) -> Option<SplitCandidate> {
    let lambda = ctx.params.lambda;
    let min_child = ctx.params.min_child_weight;
    let parent_score = g_total * g_total / (h_total + lambda);
    let n_features = ctx.rows.get(indices[0]).map(Vec::len).unwrap_or(0);

    let mut best: Option<SplitCandidate> = None;
    let mut sorted = indices.to_vec();

    for feature in 0..n_features {
        sorted.sort_by(|&a, &b| ctx.rows[a][feature].total_cmp(&ctx.rows[b][feature]));

        let (mut g_left, mut h_left) = (0.0, 0.0);
        for pos in 0..sorted.len() - 1 {
            let row = sorted[pos];
            g_left += ctx.grad[row];
            h_left += ctx.hess[row];

            let here = ctx.rows[row][feature];
            let next = ctx.rows[sorted[pos + 1]][feature];
            if here == next {
                continue;
            }

            let g_right = g_total - g_left;
            let h_right = h_total - h_left;
            if h_left < min_child || h_right < min_child {
                continue;
            }

            let gain = 0.5
                * (g_left * g_left / (h_left + lambda) + g_right * g_right / (h_right + lambda)
                    - parent_score);
            if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitCandidate {
                    feature,
                    threshold: here + (next - here) / 2.0,
                    gain,
                });
            }
        }
    }

    best
}

/// Numerically stable softmax
pub fn softmax(scores: &[f64]) -> Vec<f64> {
    let max_score = scores
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, |acc, value| acc.max(value));
    let exp_scores: Vec<f64> = scores.iter().map(|s| (s - max_score).exp()).collect();
    let denom: f64 = exp_scores.iter().sum();
    if !denom.is_finite() || denom <= 0.0 {
        return vec![1.0 / scores.len() as f64; scores.len()];
    }
    exp_scores.into_iter().map(|e| e / denom).collect()
}

/// Multiclass boosted tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    params: BoosterParams,
    num_classes: usize,
    num_features: usize,
    /// `rounds[r][k]` is the tree for class `k` fitted in round `r`
    rounds: Vec<Vec<RegressionTree>>,
}

impl GradientBoostedTrees {
    /// Fit on dense rows with class labels in `0..num_classes`
    pub fn fit(
        rows: &[Vec<f64>],
        labels: &[usize],
        num_classes: usize,
        params: BoosterParams,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(QuinielaError::Model("cannot fit on zero rows".to_string()));
        }
        if rows.len() != labels.len() {
            return Err(QuinielaError::Model(format!(
                "{} rows but {} labels",
                rows.len(),
                labels.len()
            )));
        }
        if num_classes < 2 {
            return Err(QuinielaError::Model(format!(
                "need at least 2 classes, got {}",
                num_classes
            )));
        }
        let num_features = rows[0].len();
        if rows.iter().any(|r| r.len() != num_features) {
            return Err(QuinielaError::Model("rows have differing widths".to_string()));
        }
        if let Some(bad) = labels.iter().find(|&&l| l >= num_classes) {
            return Err(QuinielaError::Model(format!(
                "label {} out of range for {} classes",
                bad, num_classes
            )));
        }

        let n = rows.len();
        let mut margins = vec![vec![0.0; num_classes]; n];
        let mut grad = vec![0.0; n];
        let mut hess = vec![0.0; n];
        let mut rounds = Vec::with_capacity(params.rounds);

        for round in 0..params.rounds {
            let probs: Vec<Vec<f64>> = margins.iter().map(|m| softmax(m)).collect();
            let mut trees = Vec::with_capacity(num_classes);

            for class in 0..num_classes {
                for i in 0..n {
                    let p = probs[i][class];
                    let y = if labels[i] == class { 1.0 } else { 0.0 };
                    grad[i] = p - y;
                    hess[i] = (2.0 * p * (1.0 - p)).max(1e-16);
                }
                trees.push(RegressionTree::fit(rows, &grad, &hess, &params));
            }

            for (row, margin) in rows.iter().zip(margins.iter_mut()) {
                for (class, tree) in trees.iter().enumerate() {
                    margin[class] += tree.predict(row);
                }
            }

            log::debug!(
                "Boosting round {}/{}: {} nodes",
                round + 1,
                params.rounds,
                trees.iter().map(RegressionTree::node_count).sum::<usize>()
            );
            rounds.push(trees);
        }

        Ok(GradientBoostedTrees {
            params,
            num_classes,
            num_features,
            rounds,
        })
    }

    /// Raw class scores before the softmax
    pub fn predict_margins(&self, x: &[f64]) -> Vec<f64> {
        let mut margins = vec![0.0; self.num_classes];
        for trees in &self.rounds {
            for (margin, tree) in margins.iter_mut().zip(trees) {
                *margin += tree.predict(x);
            }
        }
        margins
    }

    /// Check a deserialized ensemble: one well-formed tree per class per round
    pub fn validate(&self) -> Result<()> {
        if self.num_classes < 2 {
            return Err(QuinielaError::Model(format!(
                "classifier has {} classes",
                self.num_classes
            )));
        }
        for (round, trees) in self.rounds.iter().enumerate() {
            if trees.len() != self.num_classes {
                return Err(QuinielaError::Model(format!(
                    "round {} holds {} trees for {} classes",
                    round,
                    trees.len(),
                    self.num_classes
                )));
            }
            for tree in trees {
                tree.validate(self.num_features)?;
            }
        }
        Ok(())
    }

    /// Class probabilities
    pub fn predict_proba(&self, x: &[f64]) -> Vec<f64> {
        softmax(&self.predict_margins(x))
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn tree_count(&self) -> usize {
        self.rounds.iter().map(Vec::len).sum()
    }
}
