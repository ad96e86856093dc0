use crate::auth::AppState;
use crate::data_url;
use crate::error::EditError;
use crate::gemini::GeminiRequest;
use crate::models::{EditRequest, EditResponse};
use crate::normalizer;
use crate::request_id::RequestId;
use axum::{Extension, Json, extract::State};
use tracing::{debug, info};

/// Wrap the caller's instruction so the provider is told, explicitly, that
/// only a finished image is an acceptable reply.
fn enhance_prompt(prompt: &str) -> String {
    format!(
        "Edit this image according to the following instruction: {}. \
         Return ONLY the edited image as inline image data. Do not reply with \
         text, JSON, or a description of the result.",
        prompt
    )
}

#[axum_macros::debug_handler]
pub async fn edit_image(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(edit_request): Json<EditRequest>,
) -> Result<Json<EditResponse>, EditError> {
    if edit_request.image_data.trim().is_empty() || edit_request.prompt.trim().is_empty() {
        info!("Rejecting edit request with missing imageData or prompt");
        return Err(EditError::MissingParameter);
    }

    let (mime_type, payload) = data_url::split_image_payload(&edit_request.image_data);
    debug!(
        "Image classified as {} ({} base64 chars)",
        mime_type,
        payload.len()
    );

    let provider = { state.config.read().await.provider.clone() };
    let gemini_request = GeminiRequest::edit_turn(
        enhance_prompt(&edit_request.prompt),
        mime_type.to_string(),
        payload.to_string(),
    );

    let response = state
        .gemini_client
        .generate(&gemini_request, &provider, &request_id)
        .await?;
    let normalized = normalizer::normalize_response(&response)?;

    Ok(Json(EditResponse {
        success: true,
        edited_image: normalized.data_url,
        message: normalized.warning,
    }))
}
