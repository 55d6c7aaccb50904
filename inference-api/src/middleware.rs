use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Log every request with a request id, echoing the id back to the caller.
/// An id supplied by the client is kept.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    tracing::info!("[{}] Request: {} {}", request_id, method, uri);
    let started = Instant::now();

    let mut response = next.run(request).await;

    tracing::info!(
        "[{}] Response: {} {} -> {} in {:?}",
        request_id,
        method,
        uri,
        response.status(),
        started.elapsed()
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}
