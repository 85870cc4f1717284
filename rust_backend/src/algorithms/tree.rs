//! CART regression tree with variance-reduction splits.
//!
//! Trees are grown on an explicit list of sample indices so a bootstrap
//! resample (with repeated indices) needs no copy of the feature matrix.

use ndarray::{ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

/// Nodes whose per-sample variance falls below this are not split further.
const MIN_IMPURITY: f64 = f64::EPSILON;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or too small to split.
    pub max_depth: Option<usize>,
    /// Candidate features examined at each split.
    pub max_features: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            max_features: usize::MAX,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Leaf {
        value: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
        samples: usize,
    },
}

/// A fitted regression tree. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

struct TreeBuilder<'a> {
    features: ArrayView2<'a, f64>,
    labels: ArrayView1<'a, f64>,
    params: &'a TreeParams,
    rng: &'a mut ChaCha8Rng,
    nodes: Vec<Node>,
    impurity_decrease: Vec<f64>,
}

impl RegressionTree {
    /// Grow a tree on the rows listed in `samples`.
    ///
    /// `samples` may repeat indices. The caller guarantees it is non-empty
    /// and that every index is a valid row of `features` and `labels`.
    pub fn fit(
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        mut samples: Vec<usize>,
        params: &TreeParams,
        rng: &mut ChaCha8Rng,
    ) -> Self {
        let n_features = features.ncols();
        let mut builder = TreeBuilder {
            features: features.reborrow(),
            labels: labels.reborrow(),
            params,
            rng,
            nodes: Vec::new(),
            impurity_decrease: vec![0.0; n_features],
        };
        builder.build(&mut samples, 0);

        Self {
            nodes: builder.nodes,
            impurity_decrease: builder.impurity_decrease,
        }
    }

    pub fn predict(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Total squared-error reduction per feature, normalised to sum to one.
    ///
    /// A tree that never split returns all zeros.
    pub fn feature_importances(&self) -> Vec<f64> {
        let total: f64 = self.impurity_decrease.iter().sum();
        if total <= 0.0 {
            return vec![0.0; self.impurity_decrease.len()];
        }
        self.impurity_decrease.iter().map(|d| d / total).collect()
    }
}

impl TreeBuilder<'_> {
    fn build(&mut self, samples: &mut [usize], depth: usize) -> usize {
        let n = samples.len();
        let (mean, sse) = mean_and_sse(self.labels, samples);

        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: mean,
            samples: n,
        });

        let depth_reached = self.params.max_depth.is_some_and(|d| depth >= d);
        if depth_reached
            || n < self.params.min_samples_split
            || n < 2 * self.params.min_samples_leaf
            || sse / n as f64 <= MIN_IMPURITY
        {
            return node_id;
        }

        let Some(split) = self.best_split(samples) else {
            return node_id;
        };

        let features = self.features;
        let mid = partition(samples, |row| features[[row, split.feature]] <= split.threshold);
        if mid == 0 || mid == n {
            return node_id;
        }

        let (left_samples, right_samples) = samples.split_at_mut(mid);
        let (_, left_sse) = mean_and_sse(self.labels, left_samples);
        let (_, right_sse) = mean_and_sse(self.labels, right_samples);
        self.impurity_decrease[split.feature] += (sse - left_sse - right_sse).max(0.0);

        let left = self.build(left_samples, depth + 1);
        let right = self.build(right_samples, depth + 1);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
            samples: n,
        };
        node_id
    }

    /// Best threshold over a random subset of features.
    ///
    /// Maximises `sum_l^2 / n_l + sum_r^2 / n_r`, which is equivalent to
    /// minimising the children's summed squared error.
    fn best_split(&mut self, samples: &[usize]) -> Option<SplitCandidate> {
        let n = samples.len();
        let n_features = self.features.ncols();
        let features = self.features;
        let labels = self.labels;
        let min_leaf = self.params.min_samples_leaf.max(1);

        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(&mut *self.rng);
        candidates.truncate(self.params.max_features.clamp(1, n_features.max(1)));

        let total: f64 = samples.iter().map(|&i| labels[i]).sum();
        let mut order = samples.to_vec();
        let mut best: Option<SplitCandidate> = None;

        for feature in candidates {
            order.sort_by(|&a, &b| features[[a, feature]].total_cmp(&features[[b, feature]]));

            let mut left_sum = 0.0;
            for pos in 1..n {
                left_sum += labels[order[pos - 1]];
                if pos < min_leaf || n - pos < min_leaf {
                    continue;
                }

                let prev = features[[order[pos - 1], feature]];
                let next = features[[order[pos], feature]];
                if next <= prev {
                    continue;
                }

                let right_sum = total - left_sum;
                let proxy = left_sum * left_sum / pos as f64
                    + right_sum * right_sum / (n - pos) as f64;

                if best.map_or(true, |b| proxy > b.proxy) {
                    let mut threshold = prev + (next - prev) / 2.0;
                    if threshold >= next {
                        threshold = prev;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        proxy,
                    });
                }
            }
        }

        best
    }
}

/// Mean and summed squared deviation of the labels at `samples`.
fn mean_and_sse(labels: ArrayView1<'_, f64>, samples: &[usize]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&i| labels[i]).sum::<f64>() / n;
    let sse = samples
        .iter()
        .map(|&i| {
            let d = labels[i] - mean;
            d * d
        })
        .sum();
    (mean, sse)
}

/// Move entries satisfying `go_left` to the front; returns how many there are.
fn partition(samples: &mut [usize], go_left: impl Fn(usize) -> bool) -> usize {
    let mut mid = 0;
    for j in 0..samples.len() {
        if go_left(samples[j]) {
            samples.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array1, Array2};
    use rand::SeedableRng;

    fn fit_all(features: &Array2<f64>, labels: &Array1<f64>, params: &TreeParams) -> RegressionTree {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let samples = (0..features.nrows()).collect();
        RegressionTree::fit(features.view(), labels.view(), samples, params, &mut rng)
    }

    #[test]
    fn test_step_function_is_learned_exactly() {
        let features = array![[1.0], [2.0], [3.0], [10.0], [11.0], [12.0]];
        let labels = array![5.0, 5.0, 5.0, 50.0, 50.0, 50.0];

        let tree = fit_all(&features, &labels, &TreeParams::default());

        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.predict(array![2.5].view()), 5.0);
        assert_eq!(tree.predict(array![11.5].view()), 50.0);
        // threshold sits halfway between 3 and 10
        assert_eq!(tree.predict(array![6.4].view()), 5.0);
        assert_eq!(tree.predict(array![6.6].view()), 50.0);
    }

    #[test]
    fn test_depth_limit_is_respected() {
        let features = Array2::from_shape_fn((32, 1), |(i, _)| i as f64);
        let labels = Array1::from_shape_fn(32, |i| (i * i) as f64);

        for limit in 1..=4 {
            let params = TreeParams {
                max_depth: Some(limit),
                ..TreeParams::default()
            };
            let tree = fit_all(&features, &labels, &params);
            assert!(tree.depth() <= limit);
        }

        let unlimited = fit_all(&features, &labels, &TreeParams::default());
        // pure leaves reproduce the training labels
        for i in 0..32 {
            assert_eq!(unlimited.predict(features.row(i)), labels[i]);
        }
    }

    #[test]
    fn test_constant_labels_make_a_single_leaf() {
        let features = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let labels = array![7.0, 7.0, 7.0];

        let tree = fit_all(&features, &labels, &TreeParams::default());
        assert_eq!(tree.nodes().len(), 1);
        assert_eq!(tree.predict(array![100.0, 100.0].view()), 7.0);
        assert_eq!(tree.feature_importances(), vec![0.0, 0.0]);
    }

    #[test]
    fn test_importance_goes_to_informative_feature() {
        // feature 0 is noise-free signal, feature 1 is constant
        let features = Array2::from_shape_fn((20, 2), |(i, j)| if j == 0 { i as f64 } else { 1.0 });
        let labels = Array1::from_shape_fn(20, |i| if i < 10 { 0.0 } else { 100.0 });

        let tree = fit_all(&features, &labels, &TreeParams::default());
        let importances = tree.feature_importances();
        assert_eq!(importances, vec![1.0, 0.0]);
    }

    #[test]
    fn test_repeated_samples_weight_the_mean() {
        let features = array![[1.0], [2.0]];
        let labels = array![0.0, 30.0];
        let params = TreeParams {
            max_depth: Some(0),
            ..TreeParams::default()
        };
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let tree = RegressionTree::fit(features.view(), labels.view(), vec![0, 1, 1], &params, &mut rng);
        assert_eq!(tree.predict(array![1.0].view()), 20.0);
    }

    #[test]
    fn test_partition_moves_matches_front() {
        let mut samples = vec![5, 2, 8, 1, 9];
        let mid = partition(&mut samples, |v| v < 5);
        assert_eq!(mid, 2);
        assert!(samples[..mid].iter().all(|&v| v < 5));
        assert!(samples[mid..].iter().all(|&v| v >= 5));
    }
}
