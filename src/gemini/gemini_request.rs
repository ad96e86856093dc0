use crate::gemini::{GeminiContent, GeminiInlineData, GeminiPart};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiRequest {
    pub contents: Vec<GeminiContent>,
}

impl GeminiRequest {
    /// One user turn holding the edit instruction followed by the inline image.
    pub fn edit_turn(instruction: String, mime_type: String, image_base64: String) -> Self {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: Some("user".to_string()),
                parts: vec![
                    GeminiPart::Text { text: instruction },
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type,
                            data: image_base64,
                        },
                    },
                ],
            }],
        }
    }
}
