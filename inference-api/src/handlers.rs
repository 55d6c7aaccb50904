use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Json,
};
use bytes::Bytes;
use inference_core::{InferenceError, PredictionRequest, PredictionResponse};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::AppState;

/// Error payload, `{"detail": "..."}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: String,
}

pub type ApiError = (StatusCode, Json<ErrorBody>);

fn api_error(status: StatusCode, detail: impl Into<String>) -> ApiError {
    (status, Json(ErrorBody { detail: detail.into() }))
}

impl From<InferenceError> for ErrorBody {
    fn from(err: InferenceError) -> Self {
        ErrorBody {
            detail: err.to_string(),
        }
    }
}

fn inference_error(err: InferenceError) -> ApiError {
    let status = match err {
        InferenceError::ModelNotLoaded => StatusCode::SERVICE_UNAVAILABLE,
        InferenceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(err.into()))
}

/// Static description of the service
pub async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "SageMaker Inference API",
        "version": "1.0",
        "endpoints": ["/ping", "/invocations"]
    }))
}

/// Health check: healthy only while a model is held
pub async fn ping(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.inference_service.is_ready() {
        return Err(inference_error(InferenceError::ModelNotLoaded));
    }

    Ok(Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

/// Decode the body by content type; JSON is assumed when none is sent
fn decode_request(headers: &HeaderMap, body: &[u8]) -> Result<PredictionRequest, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim().to_lowercase());

    match content_type.as_deref() {
        None | Some("application/json") => serde_json::from_slice(body).map_err(|e| {
            api_error(StatusCode::BAD_REQUEST, format!("Prediction error: invalid request body: {}", e))
        }),
        Some("text/csv") => {
            let text = std::str::from_utf8(body)
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Prediction error: body is not valid UTF-8"))?;
            parse_csv_row(text)
                .map(|features| PredictionRequest { features })
                .map_err(|e| api_error(StatusCode::BAD_REQUEST, format!("Prediction error: {}", e)))
        }
        Some(other) => Err(api_error(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            format!("Unsupported content type '{}'", other),
        )),
    }
}

/// One row of comma-separated numbers, the payload a SageMaker runtime client sends
pub fn parse_csv_row(text: &str) -> Result<Vec<f64>, String> {
    let mut rows = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let row = rows.next().ok_or_else(|| "empty CSV payload".to_string())?;
    if rows.next().is_some() {
        return Err("expected exactly one CSV row".to_string());
    }

    row.split(',')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("'{}' is not a number", field.trim()))
        })
        .collect()
}

/// SageMaker invocation endpoint
pub async fn invocations(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<PredictionResponse>, ApiError> {
    // No model means no prediction, whatever the body holds
    if !state.inference_service.is_ready() {
        return Err(inference_error(InferenceError::ModelNotLoaded));
    }

    let request = decode_request(&headers, &body)?;
    debug!("Received prediction request with {} features", request.features.len());

    match state.inference_service.predict(request).await {
        Ok(response) => Ok(Json(response)),
        Err(err) => {
            warn!("Prediction failed: {}", err);
            Err(inference_error(err))
        }
    }
}
