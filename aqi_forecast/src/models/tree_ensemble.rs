//! Tree ensemble artifacts: random forests and gradient boosted trees

use crate::error::{ForecastError, Result};
use crate::models::{check_width, Regressor};
use serde::{Deserialize, Serialize};

/// A node of a binary regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TreeNode {
    /// Goes to `left` when `x[feature] <= threshold`, otherwise `right`
    Branch {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal value
    Leaf { value: f64 },
}

/// A single regression tree stored as a flat node list rooted at index 0
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
}

impl Tree {
    /// Create a tree from its nodes
    pub fn new(nodes: Vec<TreeNode>) -> Self {
        Self { nodes }
    }

    /// Walk the tree for one sample
    pub fn evaluate(&self, features: &[f64]) -> Result<f64> {
        let mut index = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes
        for _ in 0..self.nodes.len() {
            match self.nodes.get(index) {
                Some(TreeNode::Leaf { value }) => return Ok(*value),
                Some(TreeNode::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let x = features.get(*feature).copied().ok_or_else(|| {
                        ForecastError::ModelError(format!(
                            "Tree splits on feature {} but only {} were given",
                            feature,
                            features.len()
                        ))
                    })?;
                    index = if x <= *threshold { *left } else { *right };
                }
                None => {
                    return Err(ForecastError::ModelError(format!(
                        "Tree references missing node {}",
                        index
                    )))
                }
            }
        }

        Err(ForecastError::ModelError(
            "Tree walk did not reach a leaf".to_string(),
        ))
    }

    fn validate(&self, n_features: usize) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(ForecastError::ModelError("Tree has no nodes".to_string()));
        }

        for (index, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Branch {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    // Children always come after their parent, which rules out cycles
                    if *left <= index || *right <= index {
                        return Err(ForecastError::ModelError(format!(
                            "Node {} has a child that does not follow it",
                            index
                        )));
                    }
                    if *left >= self.nodes.len() || *right >= self.nodes.len() {
                        return Err(ForecastError::ModelError(format!(
                            "Node {} references a missing child",
                            index
                        )));
                    }
                    if *feature >= n_features || !threshold.is_finite() {
                        return Err(ForecastError::ModelError(format!(
                            "Node {} has an invalid split",
                            index
                        )));
                    }
                }
                TreeNode::Leaf { value } => {
                    if !value.is_finite() {
                        return Err(ForecastError::ModelError(format!(
                            "Leaf {} holds a non-finite value",
                            index
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

/// How tree outputs are combined
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Aggregation {
    /// Average of all trees (random forest)
    Mean,
    /// `base_score + learning_rate * Σ trees` (gradient boosting)
    Sum { base_score: f64, learning_rate: f64 },
}

/// Fitted tree ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeEnsembleModel {
    /// Name of the model
    #[serde(default = "default_name")]
    name: String,
    /// Width of the input
    n_features: usize,
    /// Combination rule
    aggregation: Aggregation,
    /// The trees
    trees: Vec<Tree>,
}

fn default_name() -> String {
    "RandomForestRegressor".to_string()
}

impl TreeEnsembleModel {
    /// Create a new tree ensemble
    pub fn new(
        name: &str,
        n_features: usize,
        aggregation: Aggregation,
        trees: Vec<Tree>,
    ) -> Result<Self> {
        let model = Self {
            name: name.to_string(),
            n_features,
            aggregation,
            trees,
        };
        model.validate()?;
        Ok(model)
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for TreeEnsembleModel {
    fn predict(&self, features: &[f64]) -> Result<f64> {
        check_width(&self.name, self.n_features, features)?;

        let mut total = 0.0;
        for tree in &self.trees {
            total += tree.evaluate(features)?;
        }

        Ok(match self.aggregation {
            Aggregation::Mean => total / self.trees.len() as f64,
            Aggregation::Sum {
                base_score,
                learning_rate,
            } => base_score + learning_rate * total,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(ForecastError::ModelError(format!(
                "{} has no trees",
                self.name
            )));
        }
        if self.n_features == 0 {
            return Err(ForecastError::ModelError(format!(
                "{} declares zero input features",
                self.name
            )));
        }
        for tree in &self.trees {
            tree.validate(self.n_features)?;
        }
        Ok(())
    }
}
