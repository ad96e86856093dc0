use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use tracing::{Instrument, info_span};
use uuid::Uuid;

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Honor an inbound x-request-id or mint one, make it available to handlers
/// through extensions, and reflect it back on the response.
pub async fn inject_request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    if !req.headers().contains_key("x-request-id") {
        if let Ok(val) = HeaderValue::from_str(&id) {
            req.headers_mut().insert("x-request-id", val);
        }
    }

    req.extensions_mut().insert(RequestId(id.clone()));

    // Span carries the id so provider-call logs correlate with the request
    let span = info_span!(
        "edit_request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let mut resp = next.run(req).instrument(span).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        resp.headers_mut().insert("x-request-id", val);
    }

    resp
}
