use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GeminiBlockReason {
    BlockReasonUnspecified,
    Safety,
    Other,
    Blocklist,
    ProhibitedContent,
    ImageSafety,
}

impl GeminiBlockReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeminiBlockReason::BlockReasonUnspecified => "BLOCK_REASON_UNSPECIFIED",
            GeminiBlockReason::Safety => "SAFETY",
            GeminiBlockReason::Other => "OTHER",
            GeminiBlockReason::Blocklist => "BLOCKLIST",
            GeminiBlockReason::ProhibitedContent => "PROHIBITED_CONTENT",
            GeminiBlockReason::ImageSafety => "IMAGE_SAFETY",
        }
    }
}
