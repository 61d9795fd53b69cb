// Depth-limited regression tree fit to residuals.
//
// Splits are greedy: for each candidate feature, rows are sorted by value
// and every boundary between distinct values is scored with the L2-regular-
// ized gain sum²_L/(n_L+λ) + sum²_R/(n_R+λ) − sum²/(n+λ). Leaf values use
// the same shrinkage: sum/(n+λ).

use crate::model::N_FEATURES;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct TreeParams {
    pub max_depth: usize,
    pub lambda: f64,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    /// Fit a tree to `targets` over the given row indices, considering only
    /// the given feature indices. `rows` must be non-empty.
    pub fn fit(
        x: &[[f64; N_FEATURES]],
        targets: &[f64],
        rows: &[usize],
        features: &[usize],
        params: &TreeParams,
    ) -> Self {
        let mut builder = Builder {
            x,
            targets,
            features,
            params,
            nodes: Vec::new(),
        };
        builder.build(rows.to_vec(), 0);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, features: &[f64; N_FEATURES]) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if features[*feature] < *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    #[cfg(test)]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

struct Builder<'a> {
    x: &'a [[f64; N_FEATURES]],
    targets: &'a [f64],
    features: &'a [usize],
    params: &'a TreeParams,
    nodes: Vec<Node>,
}

struct Split {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl Builder<'_> {
    /// Build the subtree for `rows` and return its node index.
    fn build(&mut self, rows: Vec<usize>, depth: usize) -> usize {
        if depth >= self.params.max_depth || rows.len() < 2 * self.params.min_samples_leaf {
            return self.push_leaf(&rows);
        }
        let Some(split) = self.best_split(&rows) else {
            return self.push_leaf(&rows);
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
            .into_iter()
            .partition(|&i| self.x[i][split.feature] < split.threshold);

        // Reserve the split slot before recursing so child indices are known.
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value: 0.0 });
        let left = self.build(left_rows, depth + 1);
        let right = self.build(right_rows, depth + 1);
        self.nodes[idx] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        idx
    }

    fn push_leaf(&mut self, rows: &[usize]) -> usize {
        let sum: f64 = rows.iter().map(|&i| self.targets[i]).sum();
        let value = sum / (rows.len() as f64 + self.params.lambda);
        let idx = self.nodes.len();
        self.nodes.push(Node::Leaf { value });
        idx
    }

    fn best_split(&self, rows: &[usize]) -> Option<Split> {
        let lambda = self.params.lambda;
        let min_leaf = self.params.min_samples_leaf;
        let total: f64 = rows.iter().map(|&i| self.targets[i]).sum();
        let n = rows.len() as f64;
        let parent_score = total * total / (n + lambda);

        let mut best: Option<Split> = None;
        for &feature in self.features {
            let mut ordered: Vec<(f64, f64)> = rows
                .iter()
                .map(|&i| (self.x[i][feature], self.targets[i]))
                .collect();
            ordered.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left_sum = 0.0;
            for split_at in 1..ordered.len() {
                left_sum += ordered[split_at - 1].1;
                let (prev_val, next_val) = (ordered[split_at - 1].0, ordered[split_at].0);
                if prev_val == next_val {
                    continue;
                }
                if split_at < min_leaf || ordered.len() - split_at < min_leaf {
                    continue;
                }
                let n_left = split_at as f64;
                let n_right = n - n_left;
                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / (n_left + lambda)
                    + right_sum * right_sum / (n_right + lambda)
                    - parent_score;
                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    best = Some(Split {
                        feature,
                        threshold: (prev_val + next_val) / 2.0,
                        gain,
                    });
                }
            }
        }
        best
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PARAMS: TreeParams = TreeParams {
        max_depth: 4,
        lambda: 0.0,
        min_samples_leaf: 1,
    };

    fn rows(n: usize) -> Vec<usize> {
        (0..n).collect()
    }

    #[test]
    fn constant_targets_yield_single_leaf() {
        let x = [[1.0, 0.0, 0.0, 0.0], [2.0, 0.0, 0.0, 0.0]];
        let y = [3.0, 3.0];
        let tree = RegressionTree::fit(&x, &y, &rows(2), &[0, 1, 2, 3], &PARAMS);
        assert_eq!(tree.n_nodes(), 1);
        assert!((tree.predict(&[5.0, 0.0, 0.0, 0.0]) - 3.0).abs() < 1e-12);
    }

    #[test]
    fn splits_on_the_informative_feature() {
        // Feature 0 separates targets cleanly; the others are constant.
        let x = [
            [1.0, 7.0, 7.0, 7.0],
            [2.0, 7.0, 7.0, 7.0],
            [10.0, 7.0, 7.0, 7.0],
            [11.0, 7.0, 7.0, 7.0],
        ];
        let y = [0.0, 0.0, 100.0, 100.0];
        let tree = RegressionTree::fit(&x, &y, &rows(4), &[0, 1, 2, 3], &PARAMS);
        assert!((tree.predict(&[1.5, 7.0, 7.0, 7.0]) - 0.0).abs() < 1e-9);
        assert!((tree.predict(&[10.5, 7.0, 7.0, 7.0]) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn respects_max_depth() {
        let x: Vec<[f64; 4]> = (0..16).map(|i| [i as f64, 0.0, 0.0, 0.0]).collect();
        let y: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let params = TreeParams {
            max_depth: 1,
            lambda: 0.0,
            min_samples_leaf: 1,
        };
        let tree = RegressionTree::fit(&x, &y, &rows(16), &[0], &params);
        // Depth 1 means one split and two leaves at most.
        assert!(tree.n_nodes() <= 3);
    }

    #[test]
    fn restricted_feature_set_is_honored() {
        // Only feature 1 is offered, and it carries no signal.
        let x = [
            [0.0, 5.0, 0.0, 0.0],
            [1.0, 5.0, 0.0, 0.0],
            [2.0, 5.0, 0.0, 0.0],
        ];
        let y = [0.0, 10.0, 20.0];
        let tree = RegressionTree::fit(&x, &y, &rows(3), &[1], &PARAMS);
        assert_eq!(tree.n_nodes(), 1);
        assert!((tree.predict(&[0.0, 5.0, 0.0, 0.0]) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn lambda_shrinks_leaf_values() {
        let x = [[0.0, 0.0, 0.0, 0.0]];
        let y = [10.0];
        let params = TreeParams {
            max_depth: 2,
            lambda: 1.0,
            min_samples_leaf: 1,
        };
        let tree = RegressionTree::fit(&x, &y, &rows(1), &[0], &params);
        // Single row, lambda 1: leaf value is 10 / (1 + 1).
        assert!((tree.predict(&[0.0, 0.0, 0.0, 0.0]) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn serde_roundtrip_preserves_structure() {
        let x = [
            [1.0, 0.0, 0.0, 0.0],
            [2.0, 0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0, 0.0],
        ];
        let y = [1.0, 2.0, 30.0];
        let tree = RegressionTree::fit(&x, &y, &rows(3), &[0], &PARAMS);
        let json = serde_json::to_string(&tree).unwrap();
        let back: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(tree, back);
    }
}
