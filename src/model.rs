//! Pre-trained binary classifiers
//!
//! The classifier is trained offline; this module only evaluates it. Two
//! artifact kinds are supported:
//! - `random_forest`: trees stored as parallel node arrays, probability is
//!   the mean of the normalized leaf values
//! - `logistic_regression`: sigmoid of a linear score

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AssessError;

const ARTIFACT: &str = "model";

/// Positive-class probability above which the label is `true`
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Marker for "no child" in the node arrays
const LEAF: i64 = -1;

/// A pre-fit binary classifier
pub trait Classifier: Send + Sync {
    /// Expected input width
    fn n_features(&self) -> usize;

    /// P(class = 1) for one scaled row
    fn predict_proba(&self, x: &[f64]) -> Result<f64, AssessError>;

    /// Class label for one scaled row
    fn predict(&self, x: &[f64]) -> Result<bool, AssessError> {
        Ok(self.predict_proba(x)? > DECISION_THRESHOLD)
    }
}

/// One decision tree in parallel-array form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    /// Per-node class weights `[negative, positive]`
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    fn check(&self, n_features: usize, tree_idx: usize) -> Result<(), AssessError> {
        let n = self.children_left.len();
        let fail = |reason: String| {
            Err(AssessError::invalid_artifact(
                ARTIFACT,
                format!("tree {}: {}", tree_idx, reason),
            ))
        };

        if n == 0 {
            return fail("no nodes".to_string());
        }
        if self.children_right.len() != n
            || self.feature.len() != n
            || self.threshold.len() != n
            || self.value.len() != n
        {
            return fail("node arrays have different lengths".to_string());
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF {
                if right != LEAF {
                    return fail(format!("node {} has only a right child", node));
                }
                let [neg, pos] = self.value[node];
                if !(neg >= 0.0 && pos >= 0.0 && neg + pos > 0.0) {
                    return fail(format!("leaf {} has no class weight", node));
                }
                continue;
            }

            // Children always follow their parent, which rules out cycles
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return fail(format!("node {} has invalid child {}", node, child));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return fail(format!("node {} splits on feature {}", node, feature));
            }
        }
        Ok(())
    }

    /// Normalized positive-class weight of the leaf reached by `x`.
    ///
    /// The walk is bounds-checked and takes at most one step per node, so a
    /// malformed tree yields `InvalidModelOutput` instead of a panic or a
    /// cycle.
    pub fn leaf_proba(&self, x: &[f64]) -> Result<f64, AssessError> {
        let malformed = |node: usize, reason: &str| {
            AssessError::InvalidModelOutput(format!("tree node {}: {}", node, reason))
        };

        let mut node = 0usize;
        for _ in 0..self.children_left.len() {
            let left = *self
                .children_left
                .get(node)
                .ok_or_else(|| malformed(node, "out of range"))?;

            if left == LEAF {
                let [neg, pos] = *self
                    .value
                    .get(node)
                    .ok_or_else(|| malformed(node, "no class weight"))?;
                return Ok(pos / (neg + pos));
            }

            let feature = *self
                .feature
                .get(node)
                .ok_or_else(|| malformed(node, "no split feature"))?;
            let value = usize::try_from(feature)
                .ok()
                .and_then(|f| x.get(f))
                .ok_or_else(|| malformed(node, "split feature outside the row"))?;
            let threshold = self
                .threshold
                .get(node)
                .ok_or_else(|| malformed(node, "no threshold"))?;
            let next = if value <= threshold {
                left
            } else {
                *self
                    .children_right
                    .get(node)
                    .ok_or_else(|| malformed(node, "no right child"))?
            };
            node = usize::try_from(next).map_err(|_| malformed(node, "invalid child"))?;
        }

        Err(malformed(node, "no leaf reached"))
    }
}

/// Averaging ensemble of decision trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

/// Linear model with a logistic link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

/// Serialized classifier artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(RandomForest),
    LogisticRegression(LogisticRegression),
}

impl ModelArtifact {
    /// Parse and structurally check a model artifact
    pub fn from_json(json: &str) -> Result<Self, AssessError> {
        let artifact: ModelArtifact =
            serde_json::from_str(json).map_err(|e| AssessError::missing_artifact(ARTIFACT, e))?;
        artifact.check()?;
        Ok(artifact)
    }

    /// Load a model artifact from disk
    pub fn load(path: &Path) -> Result<Self, AssessError> {
        let json = fs::read_to_string(path).map_err(|e| {
            AssessError::missing_artifact(ARTIFACT, format!("{}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    pub(crate) fn check(&self) -> Result<(), AssessError> {
        match self {
            ModelArtifact::RandomForest(forest) => {
                if forest.n_features == 0 {
                    return Err(AssessError::invalid_artifact(ARTIFACT, "n_features is 0"));
                }
                if forest.trees.is_empty() {
                    return Err(AssessError::invalid_artifact(ARTIFACT, "forest has no trees"));
                }
                for (idx, tree) in forest.trees.iter().enumerate() {
                    tree.check(forest.n_features, idx)?;
                }
                Ok(())
            }
            ModelArtifact::LogisticRegression(lr) => {
                if lr.coef.is_empty() {
                    return Err(AssessError::invalid_artifact(ARTIFACT, "no coefficients"));
                }
                Ok(())
            }
        }
    }

    /// Short description for diagnostics
    pub fn describe(&self) -> String {
        match self {
            ModelArtifact::RandomForest(f) => format!(
                "random forest ({} trees, {} features)",
                f.trees.len(),
                f.n_features
            ),
            ModelArtifact::LogisticRegression(lr) => {
                format!("logistic regression ({} features)", lr.coef.len())
            }
        }
    }
}

fn check_width(expected: usize, x: &[f64]) -> Result<(), AssessError> {
    if x.len() != expected {
        return Err(AssessError::dimension("model input", expected, x.len()));
    }
    Ok(())
}

fn check_proba(p: f64) -> Result<f64, AssessError> {
    if p.is_finite() && (0.0..=1.0).contains(&p) {
        Ok(p)
    } else {
        Err(AssessError::InvalidModelOutput(format!(
            "probability {} is outside [0, 1]",
            p
        )))
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, x: &[f64]) -> Result<f64, AssessError> {
        check_width(self.n_features, x)?;
        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.leaf_proba(x)?;
        }
        check_proba(total / self.trees.len() as f64)
    }
}

impl Classifier for LogisticRegression {
    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict_proba(&self, x: &[f64]) -> Result<f64, AssessError> {
        check_width(self.coef.len(), x)?;
        let z: f64 = self
            .coef
            .iter()
            .zip(x.iter())
            .map(|(w, v)| w * v)
            .sum::<f64>()
            + self.intercept;
        check_proba(1.0 / (1.0 + (-z).exp()))
    }
}

impl Classifier for ModelArtifact {
    fn n_features(&self) -> usize {
        match self {
            ModelArtifact::RandomForest(m) => m.n_features(),
            ModelArtifact::LogisticRegression(m) => m.n_features(),
        }
    }

    fn predict_proba(&self, x: &[f64]) -> Result<f64, AssessError> {
        match self {
            ModelArtifact::RandomForest(m) => m.predict_proba(x),
            ModelArtifact::LogisticRegression(m) => m.predict_proba(x),
        }
    }
}
