//! XGBoost model loading and scoring
//!
//! Reads the JSON document written by XGBoost's `save_model("*.json")` and
//! scores dense rows with it. Only what binary classification with a
//! `gbtree` booster needs is read; everything else in the document is
//! ignored.
//!
//! Layout of the parts that matter:
//!
//! ```text
//! learner
//! ├── feature_names             optional column order
//! ├── learner_model_param       base_score, num_feature, num_class (strings)
//! ├── objective.name            e.g. "binary:logistic"
//! └── gradient_booster
//!     ├── name                  "gbtree"
//!     └── model.trees[]         parallel node arrays per tree
//! ```

use std::path::Path;

use ndarray::{ArrayView1, ArrayView2};
use rayon::prelude::*;
use serde::Deserialize;

use crate::error::{ModelError, PredictionError};
use crate::predictor::Scorer;

// ===== On-disk format =====

#[derive(Debug, Deserialize)]
struct ModelDocument {
    learner: LearnerDocument,
}

#[derive(Debug, Deserialize)]
struct LearnerDocument {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: BoosterDocument,
    learner_model_param: ModelParamDocument,
    objective: ObjectiveDocument,
}

#[derive(Debug, Deserialize)]
struct BoosterDocument {
    name: String,
    #[serde(default)]
    model: Option<ForestDocument>,
}

#[derive(Debug, Deserialize)]
struct ForestDocument {
    trees: Vec<TreeDocument>,
}

#[derive(Debug, Deserialize)]
struct TreeDocument {
    left_children: Vec<i64>,
    right_children: Vec<i64>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f32>,
    default_left: Vec<Flag>,
    #[serde(default)]
    split_type: Vec<i64>,
}

/// Older writers store flags as 0/1, newer ones as booleans
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(self) -> bool {
        match self {
            Flag::Bool(b) => b,
            Flag::Int(i) => i != 0,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ModelParamDocument {
    base_score: String,
    num_feature: String,
    #[serde(default)]
    num_class: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectiveDocument {
    name: String,
}

// ===== In-memory model =====

/// Training objective; only those whose output is a probability load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Objective {
    /// `binary:logistic`
    BinaryLogistic,
    /// `reg:logistic`
    RegLogistic,
}

impl Objective {
    /// Raw-margin objectives (`binary:logitraw`, `reg:squarederror`, ...) are
    /// rejected here rather than failing every request at scoring time
    fn parse(name: &str) -> Result<Self, ModelError> {
        match name {
            "binary:logistic" => Ok(Objective::BinaryLogistic),
            "reg:logistic" => Ok(Objective::RegLogistic),
            other => Err(ModelError::UnsupportedObjective(other.to_string())),
        }
    }

    /// `base_score` is a probability; trees add to its logit
    fn base_margin(self, base_score: f32) -> Result<f32, ModelError> {
        if !(base_score > 0.0 && base_score < 1.0) {
            return Err(ModelError::InvalidParam {
                name: "base_score",
                value: base_score.to_string(),
            });
        }
        Ok((base_score / (1.0 - base_score)).ln())
    }

    fn transform(self, margin: f32) -> f32 {
        1.0 / (1.0 + (-margin).exp())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Node {
    Leaf(f32),
    Split {
        feature: usize,
        threshold: f32,
        left: usize,
        right: usize,
        default_left: bool,
    },
}

#[derive(Debug, Clone)]
struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    fn from_document(
        index: usize,
        doc: TreeDocument,
        num_features: usize,
    ) -> Result<Self, ModelError> {
        let malformed = |reason: String| ModelError::MalformedTree { tree: index, reason };

        let len = doc.left_children.len();
        if len == 0 {
            return Err(malformed("tree has no nodes".to_string()));
        }
        let lengths = [
            ("right_children", doc.right_children.len()),
            ("split_indices", doc.split_indices.len()),
            ("split_conditions", doc.split_conditions.len()),
            ("default_left", doc.default_left.len()),
        ];
        for (name, actual) in lengths {
            if actual != len {
                return Err(malformed(format!("{name} has {actual} entries, expected {len}")));
            }
        }
        if doc.split_type.iter().any(|&t| t != 0) {
            return Err(ModelError::CategoricalSplit { tree: index });
        }

        let mut nodes = Vec::with_capacity(len);
        for id in 0..len {
            let left = doc.left_children[id];
            if left == -1 {
                nodes.push(Node::Leaf(doc.split_conditions[id]));
                continue;
            }

            let right = doc.right_children[id];
            // Children always follow their parent, which also rules out cycles
            let child = |c: i64| -> Result<usize, ModelError> {
                usize::try_from(c)
                    .ok()
                    .filter(|&c| c > id && c < len)
                    .ok_or_else(|| malformed(format!("node {id} has invalid child {c}")))
            };
            let feature = usize::try_from(doc.split_indices[id])
                .ok()
                .filter(|&f| f < num_features)
                .ok_or_else(|| {
                    malformed(format!(
                        "node {id} splits on feature {} of {num_features}",
                        doc.split_indices[id]
                    ))
                })?;

            nodes.push(Node::Split {
                feature,
                threshold: doc.split_conditions[id],
                left: child(left)?,
                right: child(right)?,
                default_left: doc.default_left[id].is_set(),
            });
        }

        Ok(Self { nodes })
    }

    fn leaf_value(&self, row: ArrayView1<f32>) -> f32 {
        let mut id = 0;
        loop {
            match self.nodes[id] {
                Node::Leaf(value) => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                    default_left,
                } => {
                    let value = row[feature];
                    id = if value.is_nan() {
                        if default_left {
                            left
                        } else {
                            right
                        }
                    } else if value < threshold {
                        left
                    } else {
                        right
                    };
                }
            }
        }
    }
}

/// A loaded gradient-boosted tree ensemble
#[derive(Debug, Clone)]
pub struct XgbBooster {
    trees: Vec<Tree>,
    base_margin: f32,
    objective: Objective,
    num_features: usize,
    feature_names: Vec<String>,
}

impl XgbBooster {
    /// Load a model file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Parse a model document
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let doc: ModelDocument = serde_json::from_str(json)?;
        let learner = doc.learner;

        let objective = Objective::parse(&learner.objective.name)?;

        let params = &learner.learner_model_param;
        let num_features = parse_param("num_feature", &params.num_feature)?;
        let num_class = match &params.num_class {
            Some(raw) => parse_param("num_class", raw)?,
            None => 0,
        };
        if num_class > 1 {
            return Err(ModelError::MultiClass(num_class));
        }
        let base_score: f32 = parse_param("base_score", &params.base_score)?;
        let base_margin = objective.base_margin(base_score)?;

        if !learner.feature_names.is_empty() && learner.feature_names.len() != num_features {
            return Err(ModelError::FeatureCountMismatch {
                expected: num_features,
                actual: learner.feature_names.len(),
            });
        }

        let booster = learner.gradient_booster;
        if booster.name != "gbtree" {
            return Err(ModelError::UnsupportedBooster(booster.name));
        }
        let forest = booster
            .model
            .ok_or_else(|| ModelError::UnsupportedBooster("gbtree without model".to_string()))?;

        let trees = forest
            .trees
            .into_iter()
            .enumerate()
            .map(|(index, tree)| Tree::from_document(index, tree, num_features))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            trees,
            base_margin,
            objective,
            num_features,
            feature_names: learner.feature_names,
        })
    }

    /// Number of trees in the ensemble
    pub fn num_trees(&self) -> usize {
        self.trees.len()
    }

    /// Column names saved with the model, empty when none were
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn objective(&self) -> Objective {
        self.objective
    }

    /// Summed tree output plus base margin, before the objective transform
    pub fn margin(&self, row: ArrayView1<f32>) -> f32 {
        self.base_margin + self.trees.iter().map(|t| t.leaf_value(row)).sum::<f32>()
    }
}

impl Scorer for XgbBooster {
    fn num_features(&self) -> usize {
        self.num_features
    }

    fn score(&self, matrix: ArrayView2<f32>) -> Result<Vec<f32>, PredictionError> {
        if matrix.ncols() != self.num_features {
            return Err(PredictionError::ShapeMismatch {
                expected: self.num_features,
                actual: matrix.ncols(),
            });
        }

        Ok((0..matrix.nrows())
            .into_par_iter()
            .map(|row| self.objective.transform(self.margin(matrix.row(row))))
            .collect())
    }
}

/// XGBoost stores scalars as strings, `base_score` sometimes as `"[5E-1]"`
fn parse_param<T: std::str::FromStr>(name: &'static str, raw: &str) -> Result<T, ModelError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']').trim();
    trimmed.parse().map_err(|_| ModelError::InvalidParam {
        name,
        value: raw.to_string(),
    })
}
