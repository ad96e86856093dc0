use crate::config::ProviderConfig;
use crate::error::EditError;
use crate::gemini::{GeminiRequest, GeminiResponse};
use crate::request_id::RequestId;
use reqwest::header::HeaderValue;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct GeminiClient {
    http_client: Arc<reqwest::Client>,
}

impl GeminiClient {
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }

    fn build_target_url(provider: &ProviderConfig) -> String {
        let api_base = &provider.api_base;
        let path = format!("models/{}:generateContent", provider.model);
        if api_base.ends_with('/') {
            format!("{}{}", api_base, path)
        } else {
            format!("{}/{}", api_base, path)
        }
    }

    /// One bounded call, no retries. A timeout or transport error surfaces as
    /// `ProviderCallFailed`.
    pub async fn generate(
        &self,
        request: &GeminiRequest,
        provider: &ProviderConfig,
        request_id: &RequestId,
    ) -> Result<GeminiResponse, EditError> {
        let target_url = Self::build_target_url(provider);

        let mut target_request = self
            .http_client
            .post(&target_url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", provider.api_key.as_str())
            .timeout(Duration::from_secs(provider.timeout_secs));

        // Propagate request id upstream
        if let Ok(val) = HeaderValue::from_str(&request_id.0) {
            target_request = target_request.header("x-request-id", val);
        }

        info!("Forwarding edit request to: {}", target_url);
        let response = target_request.json(request).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("Provider call failed with status {}: {}", status, error_text);
            return Err(EditError::ProviderCallFailed {
                detail: format!("{}: {}", status, error_text),
            });
        }

        let parsed: GeminiResponse = response.json().await?;
        debug!(
            "raw provider response: {:?}",
            serde_json::to_string(&parsed)
        );
        Ok(parsed)
    }
}
