//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use sporecast_core::SporecastError;

use crate::AppState;

/// Successful prediction
#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub predictions: Vec<u8>,
}

/// Body of every failed request
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Handler failure, rendered as `{"error": ...}`
#[derive(Debug)]
pub enum ApiError {
    /// The payload could not be encoded or scored
    Rejected(SporecastError),
    /// The body could not be read, usually because it is over the size limit
    Body(BytesRejection),
    /// The scoring task did not complete
    Internal(String),
}

impl From<SporecastError> for ApiError {
    fn from(err: SporecastError) -> Self {
        ApiError::Rejected(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::Rejected(err) if err.is_client_error() => {
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            ApiError::Rejected(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Body(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(ErrorResponse { error })).into_response()
    }
}

/// Classify a batch of records
///
/// The body is read as JSON whatever its content type, so clients that
/// omit the header get the same `{"error": ...}` shape on bad input.
/// Bodies over the configured limit are a 400 with that shape too.
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<PredictResponse>, ApiError> {
    let body = body
        .inspect_err(|e| tracing::debug!("Unreadable predict body: {}", e))
        .map_err(ApiError::Body)?;
    if state.log_payloads {
        tracing::debug!(payload = %String::from_utf8_lossy(&body), "Predict request");
    }

    let worker = Arc::clone(&state);
    let predictions = tokio::task::spawn_blocking(move || worker.classifier.classify_slice(&body))
        .await
        .map_err(|e| ApiError::Internal(format!("Prediction task failed: {}", e)))?
        .inspect_err(|e| tracing::debug!("Rejected predict request: {}", e))?;

    Ok(Json(PredictResponse { predictions }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sporecast_core::{EncodingError, ModelError};

    #[test]
    fn test_rejected_payload_is_bad_request() {
        let err = ApiError::from(SporecastError::from(EncodingError::NotTabular("a number")));
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_server_side_failure_is_internal() {
        let err = ApiError::from(SporecastError::from(ModelError::MultiClass(3)));
        assert_eq!(
            err.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
