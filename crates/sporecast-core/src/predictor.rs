//! Prediction dispatch: score an encoded batch and round to class labels

use std::sync::Arc;

use ndarray::ArrayView2;

use crate::error::PredictionError;

/// Anything that turns encoded rows into one score per row
///
/// Implementations must be safe to call concurrently from many requests.
pub trait Scorer: Send + Sync {
    /// Width of the rows the scorer accepts
    fn num_features(&self) -> usize;

    /// One score per row, in row order
    fn score(&self, matrix: ArrayView2<f32>) -> Result<Vec<f32>, PredictionError>;
}

/// Rounds scorer probabilities to 0/1 labels
#[derive(Clone)]
pub struct Predictor {
    scorer: Arc<dyn Scorer>,
}

impl std::fmt::Debug for Predictor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Predictor")
            .field("num_features", &self.scorer.num_features())
            .finish()
    }
}

impl Predictor {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }

    pub fn num_features(&self) -> usize {
        self.scorer.num_features()
    }

    /// Class label per row, ties rounded to even
    pub fn predict(&self, matrix: ArrayView2<f32>) -> Result<Vec<u8>, PredictionError> {
        if matrix.nrows() == 0 {
            return Err(PredictionError::EmptyBatch);
        }

        let scores = self.scorer.score(matrix)?;
        scores
            .into_iter()
            .enumerate()
            .map(|(row, score)| to_label(row, score))
            .collect()
    }
}

fn to_label(row: usize, score: f32) -> Result<u8, PredictionError> {
    if !(0.0..=1.0).contains(&score) {
        return Err(PredictionError::ScoreOutOfRange { row, score });
    }
    Ok(score.round_ties_even() as u8)
}
