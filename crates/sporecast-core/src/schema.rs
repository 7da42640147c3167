//! Feature layout expected by the model

use serde::{Deserialize, Serialize};

/// Features of the secondary mushroom dataset, in training column order
pub const MUSHROOM_FEATURES: [&str; 20] = [
    "cap-diameter",
    "cap-shape",
    "cap-surface",
    "cap-color",
    "does-bruise-or-bleed",
    "gill-attachment",
    "gill-spacing",
    "gill-color",
    "stem-height",
    "stem-width",
    "stem-root",
    "stem-surface",
    "stem-color",
    "veil-type",
    "veil-color",
    "has-ring",
    "ring-type",
    "spore-print-color",
    "habitat",
    "season",
];

/// Features that arrive as strings and are replaced by integer codes
pub const CATEGORICAL_FEATURES: [&str; 17] = [
    "cap-shape",
    "cap-surface",
    "cap-color",
    "does-bruise-or-bleed",
    "gill-attachment",
    "gill-spacing",
    "gill-color",
    "stem-root",
    "stem-surface",
    "stem-color",
    "veil-type",
    "veil-color",
    "has-ring",
    "ring-type",
    "spore-print-color",
    "habitat",
    "season",
];

/// Field whose nulls are replaced by [`MISSING_TOKEN`] before encoding
pub const PLACEHOLDER_FEATURE: &str = "stem-width";

/// Placeholder substituted for absent values of [`PLACEHOLDER_FEATURE`]
pub const MISSING_TOKEN: &str = "missing";

/// Ordered feature names plus the encoding role of each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Model input columns, in order
    pub features: Vec<String>,
    /// Subset of `features` that are categorical
    pub categorical: Vec<String>,
    /// Field whose nulls become the missing token
    pub placeholder_feature: Option<String>,
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self::mushroom()
    }
}

impl FeatureSchema {
    /// The 20-feature mushroom layout
    pub fn mushroom() -> Self {
        Self {
            features: MUSHROOM_FEATURES.iter().map(|s| s.to_string()).collect(),
            categorical: CATEGORICAL_FEATURES.iter().map(|s| s.to_string()).collect(),
            placeholder_feature: Some(PLACEHOLDER_FEATURE.to_string()),
        }
    }

    /// Mushroom encoding rules over a model-provided column order
    ///
    /// Categorical names the model does not use are dropped.
    pub fn with_feature_order(features: Vec<String>) -> Self {
        let categorical = CATEGORICAL_FEATURES
            .iter()
            .filter(|name| features.iter().any(|f| f == *name))
            .map(|s| s.to_string())
            .collect();
        Self {
            features,
            categorical,
            placeholder_feature: Some(PLACEHOLDER_FEATURE.to_string()),
        }
    }

    /// Number of model input columns
    pub fn num_features(&self) -> usize {
        self.features.len()
    }

    /// Get column index by name
    pub fn feature_index(&self, name: &str) -> Option<usize> {
        self.features.iter().position(|f| f == name)
    }

    /// Whether a field is categorical
    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.iter().any(|c| c == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mushroom_layout() {
        let schema = FeatureSchema::mushroom();
        assert_eq!(schema.num_features(), 20);
        assert_eq!(schema.categorical.len(), 17);
        assert_eq!(schema.feature_index("stem-width"), Some(9));
        assert!(schema.is_categorical("season"));
        assert!(!schema.is_categorical("cap-diameter"));
    }

    #[test]
    fn test_every_categorical_is_a_feature() {
        let schema = FeatureSchema::mushroom();
        for name in &schema.categorical {
            assert!(schema.feature_index(name).is_some(), "{name}");
        }
    }

    #[test]
    fn test_custom_order_keeps_known_categoricals() {
        let schema = FeatureSchema::with_feature_order(vec![
            "season".to_string(),
            "stem-width".to_string(),
            "f3".to_string(),
        ]);
        assert_eq!(schema.categorical, vec!["season".to_string()]);
        assert_eq!(schema.feature_index("f3"), Some(2));
    }
}
