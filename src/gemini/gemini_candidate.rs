use crate::gemini::{GeminiContent, GeminiFinishReason};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiCandidate {
    #[serde(default)]
    pub content: Option<GeminiContent>,
    #[serde(rename = "finishReason")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<GeminiFinishReason>,
    pub index: Option<u32>,
}

impl GeminiCandidate {
    pub fn parts(&self) -> &[crate::gemini::GeminiPart] {
        self.content.as_ref().map(|c| c.parts.as_slice()).unwrap_or(&[])
    }
}
