use crate::classifier::{check_features, Classifier};
use crate::dataset::Dataset;
use crate::error::InferenceError;
use crate::types::{Hyperparameters, ModelSummary};
use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const ALGORITHM: &str = "random_forest";

/// Tree node. Children always sit after their parent in the node list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        distribution: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// CART tree using Gini impurity; rows with `x[feature] <= threshold` go left
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

/// Training rows with targets already mapped to class indices
struct TrainingData<'a> {
    features: &'a [Vec<f64>],
    labels: Vec<usize>,
    n_classes: usize,
}

impl TrainingData<'_> {
    fn class_counts(&self, indices: &[usize]) -> Vec<usize> {
        let mut counts = vec![0; self.n_classes];
        for &i in indices {
            counts[self.labels[i]] += 1;
        }
        counts
    }
}

struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

fn gini(counts: &[usize], total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let total = total as f64;
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c as f64 / total;
            p * p
        })
        .sum::<f64>()
}

fn normalize(counts: &[usize]) -> Vec<f64> {
    let total: usize = counts.iter().sum();
    if total == 0 {
        return vec![1.0 / counts.len() as f64; counts.len()];
    }
    counts.iter().map(|&c| c as f64 / total as f64).collect()
}

impl DecisionTree {
    fn fit(
        data: &TrainingData<'_>,
        sample: Vec<usize>,
        params: &Hyperparameters,
        max_features: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = DecisionTree { nodes: Vec::new() };
        tree.grow(data, sample, 0, params, max_features, rng);
        tree
    }

    fn grow(
        &mut self,
        data: &TrainingData<'_>,
        indices: Vec<usize>,
        depth: usize,
        params: &Hyperparameters,
        max_features: usize,
        rng: &mut StdRng,
    ) -> usize {
        let counts = data.class_counts(&indices);
        let node_id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            distribution: normalize(&counts),
        });

        let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
        if pure || depth >= params.max_depth || indices.len() < params.min_samples_split {
            return node_id;
        }

        let Some(split) = best_split(data, &indices, &counts, max_features, rng) else {
            return node_id;
        };

        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| data.features[i][split.feature] <= split.threshold);

        let left = self.grow(data, left_rows, depth + 1, params, max_features, rng);
        let right = self.grow(data, right_rows, depth + 1, params, max_features, rng);

        self.nodes[node_id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_id
    }

    /// Leaf distribution reached by one row. The row must already be checked.
    fn leaf_distribution(&self, features: &[f64]) -> &[f64] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { distribution } => return distribution,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if features[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], id: usize) -> usize {
            match &nodes[id] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn validate(&self, n_features: usize, n_classes: usize) -> Result<()> {
        if self.nodes.is_empty() {
            bail!("tree has no nodes");
        }

        for (id, node) in self.nodes.iter().enumerate() {
            match node {
                Node::Leaf { distribution } => {
                    if distribution.len() != n_classes {
                        bail!(
                            "node {} has {} class probabilities, expected {}",
                            id,
                            distribution.len(),
                            n_classes
                        );
                    }
                    if distribution.iter().any(|p| !p.is_finite() || *p < 0.0) {
                        bail!("node {} has an invalid class probability", id);
                    }
                    let total: f64 = distribution.iter().sum();
                    if (total - 1.0).abs() > 1e-6 {
                        bail!("node {} probabilities sum to {}", id, total);
                    }
                }
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    if *feature >= n_features {
                        bail!("node {} splits on feature {} of {}", id, feature, n_features);
                    }
                    if !threshold.is_finite() {
                        bail!("node {} has a non-finite threshold", id);
                    }
                    for &child in [left, right] {
                        if child <= id || child >= self.nodes.len() {
                            bail!("node {} points at invalid child {}", id, child);
                        }
                    }
                }
            }
        }

        Ok(())
    }
}

/// Search a random subset of features for the split with the lowest weighted
/// Gini impurity. Keeps drawing features past `max_features` until at least
/// one valid split turns up, like scikit-learn does.
fn best_split(
    data: &TrainingData<'_>,
    indices: &[usize],
    parent_counts: &[usize],
    max_features: usize,
    rng: &mut StdRng,
) -> Option<Split> {
    let n_features = data.features[indices[0]].len();
    let mut candidates: Vec<usize> = (0..n_features).collect();
    candidates.shuffle(rng);

    let total = indices.len();
    let parent_impurity = gini(parent_counts, total);
    let mut best: Option<Split> = None;

    for (visited, &feature) in candidates.iter().enumerate() {
        if visited >= max_features && best.is_some() {
            break;
        }

        let mut column: Vec<(f64, usize)> = indices
            .iter()
            .map(|&i| (data.features[i][feature], data.labels[i]))
            .collect();
        column.sort_by(|a, b| a.0.total_cmp(&b.0));

        let mut left_counts = vec![0usize; data.n_classes];
        let mut right_counts = parent_counts.to_vec();

        for pos in 0..total - 1 {
            let (value, label) = column[pos];
            left_counts[label] += 1;
            right_counts[label] -= 1;

            let next = column[pos + 1].0;
            if next <= value {
                continue;
            }

            let n_left = pos + 1;
            let n_right = total - n_left;
            let impurity = (n_left as f64 * gini(&left_counts, n_left)
                + n_right as f64 * gini(&right_counts, n_right))
                / total as f64;

            if impurity + 1e-12 >= parent_impurity {
                continue;
            }
            if best.as_ref().map_or(true, |b| impurity < b.impurity) {
                let mut threshold = value + (next - value) / 2.0;
                // Adjacent floats can round the midpoint up onto `next`
                if threshold >= next {
                    threshold = value;
                }
                best = Some(Split {
                    feature,
                    threshold,
                    impurity,
                });
            }
        }
    }

    best
}

/// Bagged ensemble of `DecisionTree`s; probabilities are the mean of the
/// trees' leaf distributions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestClassifier {
    n_features: usize,
    classes: Vec<i64>,
    hyperparameters: Hyperparameters,
    trees: Vec<DecisionTree>,
    trained_at: Option<DateTime<Utc>>,
}

impl RandomForestClassifier {
    pub fn fit(dataset: &Dataset, params: &Hyperparameters) -> Result<Self> {
        if params.n_estimators == 0 {
            bail!("n_estimators must be at least 1");
        }
        if dataset.is_empty() {
            bail!("cannot fit a model on an empty dataset");
        }
        dataset.validate()?;

        let n_features = dataset.n_features();
        if n_features == 0 {
            bail!("dataset has no feature columns");
        }

        let mut classes = dataset.targets.clone();
        classes.sort_unstable();
        classes.dedup();

        let labels = dataset
            .targets
            .iter()
            .map(|t| classes.binary_search(t).map_err(|_| anyhow!("unknown class {}", t)))
            .collect::<Result<Vec<_>>>()?;

        let data = TrainingData {
            features: &dataset.features,
            labels,
            n_classes: classes.len(),
        };

        let max_features = ((n_features as f64).sqrt().floor() as usize).max(1);
        let n_samples = dataset.len();

        let trees: Vec<DecisionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_index| {
                let mut rng = StdRng::seed_from_u64(params.random_state.wrapping_add(tree_index as u64));
                let sample: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                DecisionTree::fit(&data, sample, params, max_features, &mut rng)
            })
            .collect();

        debug!(
            "Fitted {} trees on {} rows, {} features, {} classes",
            trees.len(),
            n_samples,
            n_features,
            classes.len()
        );

        Ok(Self {
            n_features,
            classes,
            hyperparameters: params.clone(),
            trees,
            trained_at: Some(Utc::now()),
        })
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    pub fn trees(&self) -> &[DecisionTree] {
        &self.trees
    }

    /// Predict every row of a dataset, e.g. for evaluation
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<i64>, InferenceError> {
        rows.iter().map(|row| self.predict(row)).collect()
    }

    /// Structural checks for a model that came from outside this process
    pub fn validate(&self) -> Result<()> {
        if self.n_features == 0 {
            bail!("model expects no features");
        }
        if self.classes.is_empty() {
            bail!("model has no classes");
        }
        if self.classes.windows(2).any(|w| w[0] >= w[1]) {
            bail!("model classes must be unique and sorted");
        }
        if self.trees.is_empty() {
            bail!("model has no trees");
        }
        for (idx, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features, self.classes.len())
                .map_err(|e| anyhow!("tree {}: {}", idx, e))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForestClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn classes(&self) -> &[i64] {
        &self.classes
    }

    fn predict_proba(&self, features: &[f64]) -> Result<Vec<f64>, InferenceError> {
        check_features(features, self.n_features)?;

        let mut probabilities = vec![0.0; self.classes.len()];
        for tree in &self.trees {
            for (acc, p) in probabilities.iter_mut().zip(tree.leaf_distribution(features)) {
                *acc += p;
            }
        }

        let n_trees = self.trees.len() as f64;
        for p in &mut probabilities {
            *p /= n_trees;
        }
        Ok(probabilities)
    }

    fn summary(&self) -> ModelSummary {
        ModelSummary {
            algorithm: ALGORITHM.to_string(),
            n_features: self.n_features,
            classes: self.classes.clone(),
            trained_at: self.trained_at,
        }
    }
}
