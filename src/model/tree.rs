// CART decision tree: binary classification with Gini impurity.
//
// Nodes live in a flat arena (Vec<Node>) addressed by index, which keeps the
// tree trivially serializable. Thresholds are midpoints between consecutive
// distinct feature values; a row goes left when `value <= threshold`.
//
// Growing is iterative (explicit work stack), so unbounded depth on a large
// dataset can't overflow the call stack.

use rand::rngs::StdRng;
use rand::seq::index;
use serde::{Deserialize, Serialize};

use super::ForestParams;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        /// Fraction of the node's training samples labeled bot.
        bot_fraction: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// The best split found at one node.
struct Candidate {
    feature: usize,
    threshold: f64,
    /// Weighted impurity decrease (n * gini(node) - n_l * gini(l) - n_r * gini(r)).
    decrease: f64,
}

impl DecisionTree {
    /// Grow a tree on `samples` (row indices, duplicates allowed for
    /// bootstrap). Returns the tree and the per-feature impurity decrease it
    /// accumulated, normalized to sum to 1 (all zeros for a single leaf).
    pub fn fit(
        rows: &[&[f64]],
        labels: &[bool],
        samples: Vec<usize>,
        n_features: usize,
        params: &ForestParams,
        rng: &mut StdRng,
    ) -> (Self, Vec<f64>) {
        let mut nodes = Vec::new();
        let mut importances = vec![0.0; n_features];
        let k = params.max_features.resolve(n_features);

        let mut stack = vec![(0usize, samples, 0usize)];
        nodes.push(leaf(labels, &[]));

        while let Some((slot, samples, depth)) = stack.pop() {
            nodes[slot] = leaf(labels, &samples);

            let depth_ok = params.max_depth.is_none_or(|max| depth < max);
            if !depth_ok || samples.len() < params.min_samples_split || is_pure(labels, &samples) {
                continue;
            }

            let order = index::sample(rng, n_features, n_features).into_vec();
            let Some(best) = best_split(rows, labels, &samples, &order, k, params.min_samples_leaf)
            else {
                continue;
            };

            let (left, right): (Vec<usize>, Vec<usize>) = samples
                .iter()
                .partition(|&&i| rows[i][best.feature] <= best.threshold);
            importances[best.feature] += best.decrease;

            let left_slot = nodes.len();
            nodes.push(leaf(labels, &left));
            let right_slot = nodes.len();
            nodes.push(leaf(labels, &right));
            nodes[slot] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left: left_slot,
                right: right_slot,
            };

            stack.push((right_slot, right, depth + 1));
            stack.push((left_slot, left, depth + 1));
        }

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            importances.iter_mut().for_each(|v| *v /= total);
        }
        (Self { nodes }, importances)
    }

    /// Probability that `row` is a bot, read from the leaf it lands in.
    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        let mut at = 0;
        loop {
            match &self.nodes[at] {
                Node::Leaf { bot_fraction, .. } => return *bot_fraction,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    at = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(0usize, 0usize)];
        while let Some((at, depth)) = stack.pop() {
            match &self.nodes[at] {
                Node::Leaf { .. } => deepest = deepest.max(depth),
                Node::Split { left, right, .. } => {
                    stack.push((*left, depth + 1));
                    stack.push((*right, depth + 1));
                }
            }
        }
        deepest
    }

    /// Structural sanity: every child index points inside the arena and
    /// past its parent. Used when loading a persisted forest.
    pub fn is_well_formed(&self, n_features: usize) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(i, node)| match node {
                Node::Leaf { bot_fraction, .. } => (0.0..=1.0).contains(bot_fraction),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < n_features
                        && threshold.is_finite()
                        && *left > i
                        && *right > i
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

fn leaf(labels: &[bool], samples: &[usize]) -> Node {
    let bots = samples.iter().filter(|&&i| labels[i]).count();
    let bot_fraction = if samples.is_empty() {
        0.0
    } else {
        bots as f64 / samples.len() as f64
    };
    Node::Leaf {
        bot_fraction,
        samples: samples.len(),
    }
}

fn is_pure(labels: &[bool], samples: &[usize]) -> bool {
    samples
        .split_first()
        .is_none_or(|(first, rest)| rest.iter().all(|&i| labels[i] == labels[*first]))
}

/// Gini impurity of a node with `bots` positives out of `n`, times `n`.
fn weighted_gini(bots: usize, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let p = bots as f64 / n;
    n * 2.0 * p * (1.0 - p)
}

/// Examine features in `order` until at least `k` have been looked at and a
/// valid split exists. Features that can't split (constant in this node) do
/// not stop the search.
fn best_split(
    rows: &[&[f64]],
    labels: &[bool],
    samples: &[usize],
    order: &[usize],
    k: usize,
    min_samples_leaf: usize,
) -> Option<Candidate> {
    let n = samples.len();
    let total_bots = samples.iter().filter(|&&i| labels[i]).count();
    let parent = weighted_gini(total_bots, n);
    let min_leaf = min_samples_leaf.max(1);

    let mut best: Option<Candidate> = None;
    let mut sorted: Vec<(f64, bool)> = Vec::with_capacity(n);

    for (examined, &feature) in order.iter().enumerate() {
        if examined >= k && best.is_some() {
            break;
        }
        sorted.clear();
        sorted.extend(samples.iter().map(|&i| (rows[i][feature], labels[i])));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_bots = 0;
        for pos in 1..n {
            if sorted[pos - 1].1 {
                left_bots += 1;
            }
            let (lo, hi) = (sorted[pos - 1].0, sorted[pos].0);
            if lo == hi || pos < min_leaf || n - pos < min_leaf {
                continue;
            }
            let decrease = parent
                - weighted_gini(left_bots, pos)
                - weighted_gini(total_bots - left_bots, n - pos);
            if best.as_ref().is_none_or(|b| decrease > b.decrease) {
                let mut threshold = lo + (hi - lo) / 2.0;
                // midpoint of two adjacent floats can round up to hi
                if threshold >= hi {
                    threshold = lo;
                }
                best = Some(Candidate {
                    feature,
                    threshold,
                    decrease,
                });
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::MaxFeatures;
    use rand::SeedableRng;

    fn params() -> ForestParams {
        ForestParams {
            max_features: MaxFeatures::All,
            ..ForestParams::default()
        }
    }

    #[test]
    fn separable_data_is_learned_exactly() {
        let data: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, 0.0]).collect();
        let rows: Vec<&[f64]> = data.iter().map(Vec::as_slice).collect();
        let labels: Vec<bool> = (0..20).map(|i| i >= 10).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (tree, importances) =
            DecisionTree::fit(&rows, &labels, (0..20).collect(), 2, &params(), &mut rng);

        assert_eq!(tree.predict_proba(&[3.0, 0.0]), 0.0);
        assert_eq!(tree.predict_proba(&[15.0, 0.0]), 1.0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(importances, vec![1.0, 0.0]);
        assert!(tree.is_well_formed(2));
    }

    #[test]
    fn max_depth_caps_growth() {
        let data: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let rows: Vec<&[f64]> = data.iter().map(Vec::as_slice).collect();
        let labels: Vec<bool> = (0..32).map(|i| i % 2 == 0).collect();
        let p = ForestParams {
            max_depth: Some(2),
            ..params()
        };
        let mut rng = StdRng::seed_from_u64(1);
        let (tree, _) = DecisionTree::fit(&rows, &labels, (0..32).collect(), 1, &p, &mut rng);
        assert!(tree.depth() <= 2);
    }

    #[test]
    fn pure_node_is_a_single_leaf() {
        let data = [vec![1.0], vec![2.0]];
        let rows: Vec<&[f64]> = data.iter().map(Vec::as_slice).collect();
        let mut rng = StdRng::seed_from_u64(1);
        let (tree, importances) =
            DecisionTree::fit(&rows, &[true, true], vec![0, 1], 1, &params(), &mut rng);
        assert_eq!(tree.node_count(), 1);
        assert_eq!(importances, vec![0.0]);
    }

    #[test]
    fn constant_feature_cannot_split() {
        let data = [vec![5.0], vec![5.0], vec![5.0]];
        let rows: Vec<&[f64]> = data.iter().map(Vec::as_slice).collect();
        assert!(best_split(&rows, &[true, false, true], &[0, 1, 2], &[0], 1, 1).is_none());
    }

    #[test]
    fn gini_of_balanced_node() {
        assert!((weighted_gini(5, 10) - 5.0).abs() < 1e-12);
        assert_eq!(weighted_gini(0, 10), 0.0);
    }
}
