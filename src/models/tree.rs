//! CART regression tree.
//!
//! Splits minimize the summed squared error of the two children (variance
//! reduction). Nodes live in a flat vector with the root at index 0 so a
//! fitted tree serializes as plain data.
//!
//! Candidate thresholds are midpoints between consecutive distinct feature
//! values; ties are broken by the first feature, then the first position, so
//! fitting is deterministic for a given sample.

use serde::{Deserialize, Serialize};

/// Growth limits shared by every tree of a forest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct Split {
    feature: usize,
    threshold: f64,
    n_left: usize,
    sse: f64,
}

impl RegressionTree {
    /// Fit on the rows of `x`/`y` selected by `sample` (indices may repeat).
    ///
    /// `sample` is reordered in place. An empty sample yields a single leaf
    /// predicting `0.0`.
    pub fn fit(x: &[Vec<f64>], y: &[f64], sample: &mut [usize], params: TreeParams) -> Self {
        let mut builder = Builder {
            x,
            y,
            params,
            nodes: Vec::new(),
        };
        builder.grow(sample, 0);
        Self { nodes: builder.nodes }
    }

    pub fn predict(&self, row: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            match self.nodes.get(idx) {
                Some(Node::Leaf { value }) => return *value,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = row.get(*feature).copied().unwrap_or(f64::NAN);
                    idx = if v <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf { .. })).count()
    }

    /// Length of the longest root-to-leaf path (a single leaf has depth 0).
    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match nodes.get(idx) {
                Some(Node::Split { left, right, .. }) => 1 + walk(nodes, *left).max(walk(nodes, *right)),
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }
}

struct Builder<'a> {
    x: &'a [Vec<f64>],
    y: &'a [f64],
    params: TreeParams,
    nodes: Vec<Node>,
}

impl Builder<'_> {
    fn grow(&mut self, sample: &mut [usize], depth: usize) -> usize {
        let id = self.nodes.len();
        let (sum, sum_sq) = sample.iter().fold((0.0, 0.0), |(s, q), &i| (s + self.y[i], q + self.y[i] * self.y[i]));
        let n = sample.len();
        let value = if n == 0 { 0.0 } else { sum / n as f64 };
        self.nodes.push(Node::Leaf { value });

        let depth_reached = self.params.max_depth.is_some_and(|max| depth >= max);
        if depth_reached || n < self.params.min_samples_split.max(2) {
            return id;
        }

        let parent_sse = sum_sq - sum * sum / n as f64;
        let Some(split) = self.best_split(sample) else {
            return id;
        };
        if split.sse >= parent_sse - 1e-12 * parent_sse.abs().max(1.0) {
            return id;
        }

        let feature = split.feature;
        sample.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));
        let (left, right) = sample.split_at_mut(split.n_left);
        let left_id = self.grow(left, depth + 1);
        let right_id = self.grow(right, depth + 1);

        self.nodes[id] = Node::Split {
            feature,
            threshold: split.threshold,
            left: left_id,
            right: right_id,
        };
        id
    }

    fn best_split(&self, sample: &[usize]) -> Option<Split> {
        let n = sample.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        if n < 2 * min_leaf {
            return None;
        }
        let n_features = self.x.get(sample[0]).map_or(0, Vec::len);

        let mut best: Option<Split> = None;
        let mut order = sample.to_vec();
        for feature in 0..n_features {
            order.sort_by(|&a, &b| self.x[a][feature].total_cmp(&self.x[b][feature]));

            let total: f64 = order.iter().map(|&i| self.y[i]).sum();
            let total_sq: f64 = order.iter().map(|&i| self.y[i] * self.y[i]).sum();
            let (mut left_sum, mut left_sq) = (0.0, 0.0);

            for k in 1..n {
                let prev = order[k - 1];
                left_sum += self.y[prev];
                left_sq += self.y[prev] * self.y[prev];

                if k < min_leaf || n - k < min_leaf {
                    continue;
                }
                let (lo, hi) = (self.x[prev][feature], self.x[order[k]][feature]);
                if lo >= hi {
                    continue;
                }

                let right_sum = total - left_sum;
                let right_sq = total_sq - left_sq;
                let sse = (left_sq - left_sum * left_sum / k as f64)
                    + (right_sq - right_sum * right_sum / (n - k) as f64);

                if best.is_none_or(|b| sse < b.sse) {
                    best = Some(Split {
                        feature,
                        threshold: lo + (hi - lo) / 2.0,
                        n_left: k,
                        sse,
                    });
                }
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> TreeParams {
        TreeParams {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }

    #[test]
    fn step_function_is_learned_exactly() {
        let x: Vec<Vec<f64>> = (0..10).map(|i| vec![i as f64, 0.0]).collect();
        let y: Vec<f64> = (0..10).map(|i| if i < 5 { 10.0 } else { 20.0 }).collect();
        let mut sample: Vec<usize> = (0..10).collect();

        let tree = RegressionTree::fit(&x, &y, &mut sample, params());
        assert_eq!(tree.predict(&[2.0, 0.0]), 10.0);
        assert_eq!(tree.predict(&[7.0, 0.0]), 20.0);
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.leaf_count(), 2);
    }

    #[test]
    fn constant_target_stays_a_leaf() {
        let x: Vec<Vec<f64>> = (0..6).map(|i| vec![i as f64]).collect();
        let y = vec![3.0; 6];
        let mut sample: Vec<usize> = (0..6).collect();
        let tree = RegressionTree::fit(&x, &y, &mut sample, params());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.predict(&[100.0]), 3.0);
    }

    #[test]
    fn max_depth_and_min_leaf_limit_growth() {
        let x: Vec<Vec<f64>> = (0..32).map(|i| vec![i as f64]).collect();
        let y: Vec<f64> = (0..32).map(|i| (i * i) as f64).collect();

        let mut sample: Vec<usize> = (0..32).collect();
        let shallow = RegressionTree::fit(
            &x,
            &y,
            &mut sample,
            TreeParams {
                max_depth: Some(2),
                ..params()
            },
        );
        assert!(shallow.depth() <= 2);
        assert!(shallow.leaf_count() <= 4);

        let mut sample: Vec<usize> = (0..32).collect();
        let coarse = RegressionTree::fit(
            &x,
            &y,
            &mut sample,
            TreeParams {
                min_samples_leaf: 8,
                ..params()
            },
        );
        assert!(coarse.leaf_count() <= 4);
    }

    #[test]
    fn empty_sample_predicts_zero() {
        let tree = RegressionTree::fit(&[], &[], &mut [], params());
        assert_eq!(tree.predict(&[1.0]), 0.0);
    }

    #[test]
    fn serializes_as_flat_nodes() {
        let x: Vec<Vec<f64>> = (0..4).map(|i| vec![i as f64]).collect();
        let y = vec![1.0, 1.0, 5.0, 5.0];
        let mut sample: Vec<usize> = (0..4).collect();
        let tree = RegressionTree::fit(&x, &y, &mut sample, params());

        let json = serde_json::to_string(&tree).unwrap();
        assert!(json.contains("\"node\":\"split\""));
        let back: RegressionTree = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tree);
    }
}
