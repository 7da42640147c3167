//! Payload-to-labels pipeline shared by every request

use std::sync::Arc;

use serde_json::Value;

use crate::booster::XgbBooster;
use crate::config::SporecastConfig;
use crate::encoder::{CategoryEncoding, CodeTable, FeatureEncoder, NumericMatrix};
use crate::error::{ModelError, Result};
use crate::frame::Frame;
use crate::predictor::{Predictor, Scorer};
use crate::schema::FeatureSchema;

/// Frame building, encoding and prediction behind one call
///
/// Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone)]
pub struct Classifier {
    encoder: FeatureEncoder,
    predictor: Predictor,
}

impl Classifier {
    /// Pair an encoder with a scorer of matching width
    pub fn new(
        encoder: FeatureEncoder,
        scorer: Arc<dyn Scorer>,
    ) -> std::result::Result<Self, ModelError> {
        let expected = scorer.num_features();
        let actual = encoder.schema().num_features();
        if expected != actual {
            return Err(ModelError::FeatureCountMismatch { expected, actual });
        }
        Ok(Self {
            encoder,
            predictor: Predictor::new(scorer),
        })
    }

    /// Load the model (and code table, if configured) named by `config`
    pub fn from_config(config: &SporecastConfig) -> std::result::Result<Self, ModelError> {
        let booster = XgbBooster::from_path(&config.model_path)?;
        tracing::info!(
            path = %config.model_path.display(),
            trees = booster.num_trees(),
            features = booster.num_features(),
            objective = ?booster.objective(),
            "Loaded model"
        );

        let schema = if booster.feature_names().is_empty() {
            FeatureSchema::mushroom()
        } else {
            FeatureSchema::with_feature_order(booster.feature_names().to_vec())
        };

        let encoding = match &config.category_table_path {
            Some(path) => {
                let table = CodeTable::from_path(path)?;
                tracing::info!(
                    path = %path.display(),
                    features = table.len(),
                    "Loaded category code table"
                );
                CategoryEncoding::Fixed(table)
            }
            None => CategoryEncoding::PerBatch,
        };

        let encoder = FeatureEncoder::new(schema, encoding);
        let uncovered = encoder.uncovered_categoricals();
        if !uncovered.is_empty() {
            tracing::warn!(
                features = ?uncovered,
                "Categorical codes depend on each request's batch; codes may not match training"
            );
        }

        Self::new(encoder, Arc::new(booster))
    }

    pub fn encoder(&self) -> &FeatureEncoder {
        &self.encoder
    }

    /// Build and encode a frame without scoring it
    pub fn encode(&self, payload: &Value) -> Result<NumericMatrix> {
        let frame = Frame::from_json(payload)?;
        Ok(self.encoder.encode(&frame)?)
    }

    /// Class label per record, in record order
    pub fn classify(&self, payload: &Value) -> Result<Vec<u8>> {
        let matrix = self.encode(payload)?;
        Ok(self.predictor.predict(matrix.view())?)
    }

    /// Same as [`classify`](Self::classify) for a raw request body
    pub fn classify_slice(&self, body: &[u8]) -> Result<Vec<u8>> {
        let frame = Frame::from_slice(body)?;
        let matrix = self.encoder.encode(&frame)?;
        Ok(self.predictor.predict(matrix.view())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{PredictionError, SporecastError};
    use ndarray::ArrayView2;
    use serde_json::json;

    /// Positive when cap-shape code is at least 1
    struct CapShape;

    impl Scorer for CapShape {
        fn num_features(&self) -> usize {
            20
        }

        fn score(&self, matrix: ArrayView2<f32>) -> std::result::Result<Vec<f32>, PredictionError> {
            Ok(matrix
                .rows()
                .into_iter()
                .map(|row| if row[1] >= 1.0 { 0.9 } else { 0.1 })
                .collect())
        }
    }

    fn classifier() -> Classifier {
        Classifier::new(FeatureEncoder::default(), Arc::new(CapShape)).unwrap()
    }

    #[test]
    fn test_classify_records() {
        let labels = classifier()
            .classify(&json!([
                {"stem-width": null, "cap-shape": "b"},
                {"stem-width": 3, "cap-shape": "x"},
            ]))
            .unwrap();
        assert_eq!(labels, vec![0, 1]);
    }

    #[test]
    fn test_classify_slice() {
        let labels = classifier()
            .classify_slice(br#"{"cap-shape": ["x", "b", "f"]}"#)
            .unwrap();
        // b=0, f=1, x=2
        assert_eq!(labels, vec![1, 0, 1]);
    }

    #[test]
    fn test_empty_batch_is_prediction_error() {
        let err = classifier().classify(&json!([])).unwrap_err();
        assert!(matches!(err, SporecastError::Prediction(PredictionError::EmptyBatch)));
    }

    #[test]
    fn test_scalar_is_encoding_error() {
        let err = classifier().classify(&json!(3)).unwrap_err();
        assert!(matches!(err, SporecastError::Encoding(_)));
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn test_width_mismatch_rejected() {
        let schema = FeatureSchema::with_feature_order(vec!["cap-shape".to_string()]);
        let encoder = FeatureEncoder::new(schema, CategoryEncoding::PerBatch);
        let err = Classifier::new(encoder, Arc::new(CapShape)).unwrap_err();
        assert!(matches!(
            err,
            ModelError::FeatureCountMismatch {
                expected: 20,
                actual: 1
            }
        ));
    }
}
