use crate::config::Config;
use crate::gemini_client::GeminiClient;
use crate::models::ErrorResponse;
use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RwLock<Config>>,
    pub token: Option<String>,
    pub gemini_client: Arc<GeminiClient>,
}

pub async fn require_authorization(
    State(app_state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, Response> {
    // Health checks stay open
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    // No token configured means the gateway runs open
    let Some(expected) = app_state.token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let provided: Option<String> = request
        .headers()
        .get("Authorization")
        .and_then(|hv| hv.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer ").map(|t| t.trim()))
        .or_else(|| {
            request
                .headers()
                .get("x-api-key")
                .and_then(|hv| hv.to_str().ok())
        })
        .map(|s| s.to_string());

    match provided {
        None => {
            info!("Missing Authorization header");
            Err(unauthorized("Authorization header is required"))
        }
        Some(token) if token != expected => {
            info!("Invalid token provided");
            Err(unauthorized("Invalid authentication token"))
        }
        Some(_) => {
            debug!("Token validation successful");
            Ok(next.run(request).await)
        }
    }
}

fn unauthorized(message: &str) -> Response {
    let body = ErrorResponse {
        error: message.to_string(),
        details: None,
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
