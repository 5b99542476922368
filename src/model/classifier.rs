//! Fitted two-class classifiers.
//!
//! Class order is always `[human, ai]`.

use super::{Classifier, FeatureVector};
use crate::Result;
use serde::{Deserialize, Serialize};

/// Binary logistic regression: `P(ai) = sigmoid(w·x + b)`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LogisticRegression {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.coef.is_empty() {
            return Err("logistic regression has no coefficients".to_string());
        }
        Ok(())
    }
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]> {
        let z = features.dot(&self.coef)? + self.intercept;
        let ai = 1.0 / (1.0 + (-z).exp());
        Ok([1.0 - ai, ai])
    }
}

/// Multinomial naive Bayes over TF-IDF features
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialNb {
    pub class_log_prior: [f64; 2],
    pub feature_log_prob: [Vec<f64>; 2],
}

impl MultinomialNb {
    pub fn validate(&self) -> std::result::Result<(), String> {
        let [human, ai] = &self.feature_log_prob;
        if human.is_empty() || human.len() != ai.len() {
            return Err(format!(
                "feature_log_prob rows must be non-empty and equal length (got {} and {})",
                human.len(),
                ai.len()
            ));
        }
        Ok(())
    }
}

impl Classifier for MultinomialNb {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]> {
        let human = self.class_log_prior[0] + features.dot(&self.feature_log_prob[0])?;
        let ai = self.class_log_prior[1] + features.dot(&self.feature_log_prob[1])?;

        // log-sum-exp to keep the softmax stable
        let max = human.max(ai);
        let h = (human - max).exp();
        let a = (ai - max).exp();
        let total = h + a;
        Ok([h / total, a / total])
    }
}

/// One node of a fitted decision tree
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go to `left` when `x[feature] <= threshold`, otherwise `right`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Class counts or weights at this leaf, `[human, ai]`
    Leaf { value: [f64; 2] },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    pub nodes: Vec<TreeNode>,
}

impl DecisionTree {
    /// Children must point forward so every walk ends at a leaf
    fn validate(&self, n_features: usize) -> std::result::Result<(), String> {
        if self.nodes.is_empty() {
            return Err("decision tree has no nodes".to_string());
        }
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Split {
                    feature,
                    left,
                    right,
                    ..
                } => {
                    if *feature >= n_features {
                        return Err(format!("node {} splits on feature {} >= {}", i, feature, n_features));
                    }
                    for child in [*left, *right] {
                        if child <= i || child >= self.nodes.len() {
                            return Err(format!("node {} has invalid child {}", i, child));
                        }
                    }
                }
                TreeNode::Leaf { value } => {
                    if value.iter().any(|v| !v.is_finite() || *v < 0.0) {
                        return Err(format!("leaf {} has invalid value {:?}", i, value));
                    }
                }
            }
        }
        Ok(())
    }

    fn leaf_distribution(&self, x: &[f64]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                TreeNode::Leaf { value } => {
                    let total = value[0] + value[1];
                    return if total > 0.0 {
                        [value[0] / total, value[1] / total]
                    } else {
                        [0.5, 0.5]
                    };
                }
            }
        }
    }
}

/// Averaged ensemble of decision trees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub n_features: usize,
    pub trees: Vec<DecisionTree>,
}

impl RandomForest {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.trees.is_empty() {
            return Err("random forest has no trees".to_string());
        }
        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|e| format!("tree {}: {}", i, e))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn predict_proba(&self, features: &FeatureVector) -> Result<[f64; 2]> {
        features.expect_dim(self.n_features)?;
        let x = features.to_dense();

        let mut sum = [0.0, 0.0];
        for tree in &self.trees {
            let [h, a] = tree.leaf_distribution(&x);
            sum[0] += h;
            sum[1] += a;
        }
        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }
}
