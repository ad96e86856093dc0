use crate::data_url;
use crate::error::EditError;
use crate::gemini::{GeminiPart, GeminiResponse};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

/// Field names probed inside a fenced JSON block, in priority order.
const JSON_FIELD_PRIORITY: [&str; 4] = ["text", "image", "data", "base64"];

/// A candidate payload must exceed this many characters to be believed as an image.
const MIN_PAYLOAD_LEN: usize = 100;

/// How much of an offending text reply is surfaced for diagnostics.
const EXCERPT_LEN: usize = 100;

const WARNING_TEXT_FALLBACK: &str =
    "Image was recovered from a text reply; the provider did not return a structured image part";

#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pub data_url: String,
    pub warning: Option<String>,
}

/// Turn the provider's loosely shaped reply into a displayable data-URL.
///
/// Structured inline image data always wins over text mining, whatever the
/// part order. The text fallback runs an ordered chain of extraction
/// strategies and stops at the first one that yields a payload.
pub fn normalize_response(response: &GeminiResponse) -> Result<NormalizedImage, EditError> {
    if response.candidates.is_empty() {
        if let Some(reason) = response
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.as_ref())
        {
            warn!("Provider blocked the request: {}", reason.as_str());
            return Err(EditError::BlockedByProvider {
                reason: reason.as_str().to_string(),
            });
        }
        return Err(EditError::EmptyOutput);
    }

    let parts = response.candidates[0].parts();
    if parts.is_empty() {
        return Err(EditError::EmptyCandidate);
    }

    for part in parts {
        if let GeminiPart::InlineData { inline_data } = part {
            return Ok(NormalizedImage {
                data_url: data_url::compose(&inline_data.mime_type, &inline_data.data),
                warning: None,
            });
        }
    }

    for part in parts {
        if let GeminiPart::Text { text } = part {
            let trimmed = text.trim();
            debug!("No image part; mining {} chars of text", trimmed.len());
            return match extract_payload(trimmed) {
                Some(payload) if payload.len() > MIN_PAYLOAD_LEN => Ok(NormalizedImage {
                    data_url: data_url::compose(data_url::JPEG_MIME, &payload),
                    warning: Some(WARNING_TEXT_FALLBACK.to_string()),
                }),
                _ => Err(EditError::TextInsteadOfImage {
                    excerpt: trimmed.chars().take(EXCERPT_LEN).collect(),
                }),
            };
        }
    }

    Err(EditError::NoUsableOutput)
}

type Strategy = fn(&str) -> Option<String>;

/// Applied in order; the first hit wins.
const STRATEGIES: [Strategy; 3] = [from_fenced_json, from_whole_data_url, from_bare_base64];

fn extract_payload(text: &str) -> Option<String> {
    STRATEGIES.iter().find_map(|strategy| strategy(text))
}

fn fence_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:json)?\s*(\{.*?\})\s*```").expect("fence regex"))
}

/// Strategy a: a JSON object inside a code fence. Parse failures fall through
/// to the next strategy rather than aborting.
fn from_fenced_json(text: &str) -> Option<String> {
    let captures = fence_regex().captures(text)?;
    let parsed: serde_json::Value = match serde_json::from_str(captures.get(1)?.as_str()) {
        Ok(v) => v,
        Err(_) => return None,
    };
    let value = JSON_FIELD_PRIORITY
        .iter()
        .find_map(|field| parsed.get(field).and_then(|v| v.as_str()))?;
    if let Some(payload) = data_url::payload_of(value) {
        return Some(payload.to_string());
    }
    if is_plausible_base64(value) && value.len() > MIN_PAYLOAD_LEN {
        return Some(value.to_string());
    }
    None
}

/// Strategy b: the entire text is itself a data-URL.
fn from_whole_data_url(text: &str) -> Option<String> {
    data_url::payload_of(text).map(|p| p.to_string())
}

/// Strategy c: the entire text is a bare base64 blob of plausible size.
fn from_bare_base64(text: &str) -> Option<String> {
    if is_plausible_base64(text) && text.len() > MIN_PAYLOAD_LEN {
        Some(text.to_string())
    } else {
        None
    }
}

fn is_plausible_base64(s: &str) -> bool {
    !s.is_empty()
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::{
        GeminiBlockReason, GeminiCandidate, GeminiContent, GeminiInlineData, GeminiPart,
        GeminiPromptFeedback,
    };

    fn candidate_with(parts: Vec<GeminiPart>) -> GeminiCandidate {
        GeminiCandidate {
            content: Some(GeminiContent {
                role: Some("model".to_string()),
                parts,
            }),
            finish_reason: None,
            index: Some(0),
        }
    }

    fn response_with(parts: Vec<GeminiPart>) -> GeminiResponse {
        GeminiResponse {
            candidates: vec![candidate_with(parts)],
            prompt_feedback: None,
            model_version: None,
            response_id: None,
        }
    }

    fn image_part(mime: &str, data: &str) -> GeminiPart {
        GeminiPart::InlineData {
            inline_data: GeminiInlineData {
                mime_type: mime.to_string(),
                data: data.to_string(),
            },
        }
    }

    fn text_part(text: &str) -> GeminiPart {
        GeminiPart::Text { text: text.to_string() }
    }

    #[test]
    fn image_part_becomes_data_url() {
        let resp = response_with(vec![image_part("image/png", "iVBORw0KGgo")]);
        let out = normalize_response(&resp).unwrap();
        assert_eq!(out.data_url, "data:image/png;base64,iVBORw0KGgo");
        assert!(out.warning.is_none());
    }

    #[test]
    fn image_part_wins_even_when_text_comes_first() {
        let resp = response_with(vec![
            text_part("Here is your edited image:"),
            image_part("image/png", "iVBORw0KGgo"),
        ]);
        let out = normalize_response(&resp).unwrap();
        assert_eq!(out.data_url, "data:image/png;base64,iVBORw0KGgo");
        assert!(out.warning.is_none());
    }

    #[test]
    fn zero_candidates_with_block_reason() {
        let resp = GeminiResponse {
            candidates: vec![],
            prompt_feedback: Some(GeminiPromptFeedback {
                block_reason: Some(GeminiBlockReason::Safety),
            }),
            model_version: None,
            response_id: None,
        };
        match normalize_response(&resp) {
            Err(EditError::BlockedByProvider { reason }) => assert_eq!(reason, "SAFETY"),
            other => panic!("expected BlockedByProvider, got {:?}", other),
        }
    }

    #[test]
    fn zero_candidates_without_block_reason() {
        let resp = GeminiResponse {
            candidates: vec![],
            prompt_feedback: None,
            model_version: None,
            response_id: None,
        };
        assert!(matches!(normalize_response(&resp), Err(EditError::EmptyOutput)));
    }

    #[test]
    fn candidate_with_no_parts() {
        let resp = response_with(vec![]);
        assert!(matches!(normalize_response(&resp), Err(EditError::EmptyCandidate)));
    }

    #[test]
    fn bare_base64_text_of_150_chars_is_wrapped_as_jpeg() {
        let payload = "A".repeat(150);
        let resp = response_with(vec![text_part(&payload)]);
        let out = normalize_response(&resp).unwrap();
        assert_eq!(out.data_url, format!("data:image/jpeg;base64,{}", payload));
        assert!(out.warning.is_some());
    }

    #[test]
    fn fenced_json_image_field_is_extracted() {
        let payload = "B".repeat(101);
        let text = format!("Here you go:\n```json\n{{\"image\": \"{}\"}}\n```\n", payload);
        let resp = response_with(vec![text_part(&text)]);
        let out = normalize_response(&resp).unwrap();
        assert_eq!(out.data_url, format!("data:image/jpeg;base64,{}", payload));
        assert!(out.warning.is_some());
    }

    #[test]
    fn fenced_json_respects_field_priority() {
        let text_payload = "C".repeat(120);
        let image_payload = "D".repeat(120);
        let text = format!(
            "```json\n{{\"image\": \"{}\", \"text\": \"{}\"}}\n```",
            image_payload, text_payload
        );
        let resp = response_with(vec![text_part(&text)]);
        let out = normalize_response(&resp).unwrap();
        // "text" outranks "image" in the priority list
        assert!(out.data_url.ends_with(&text_payload));
    }

    #[test]
    fn fenced_json_data_url_value_is_split() {
        let payload = "E".repeat(130);
        let text = format!(
            "```json\n{{\"data\": \"data:image/png;base64,{}\"}}\n```",
            payload
        );
        let resp = response_with(vec![text_part(&text)]);
        let out = normalize_response(&resp).unwrap();
        // Fallback always wraps as JPEG regardless of the declared mime
        assert_eq!(out.data_url, format!("data:image/jpeg;base64,{}", payload));
    }

    #[test]
    fn malformed_fenced_json_falls_through_to_bare_base64() {
        let payload = "F".repeat(150);
        // No fence at all and not valid JSON: strategies a and b miss, c hits
        let resp = response_with(vec![text_part(&payload)]);
        assert!(normalize_response(&resp).is_ok());

        // A broken fence must not abort the chain either
        let broken = "```json\n{not json}\n```";
        let resp = response_with(vec![text_part(broken)]);
        assert!(matches!(
            normalize_response(&resp),
            Err(EditError::TextInsteadOfImage { .. })
        ));
    }

    #[test]
    fn whole_text_data_url_is_accepted() {
        let payload = "G".repeat(140);
        let text = format!("data:image/png;base64,{}", payload);
        let resp = response_with(vec![text_part(&text)]);
        let out = normalize_response(&resp).unwrap();
        assert_eq!(out.data_url, format!("data:image/jpeg;base64,{}", payload));
        assert!(out.warning.is_some());
    }

    #[test]
    fn short_prose_fails_with_excerpt() {
        let prose = "Sorry, I can't edit this image because the request is unclear.";
        let resp = response_with(vec![text_part(prose)]);
        match normalize_response(&resp) {
            Err(EditError::TextInsteadOfImage { excerpt }) => assert_eq!(excerpt, prose),
            other => panic!("expected TextInsteadOfImage, got {:?}", other),
        }
    }

    #[test]
    fn long_prose_excerpt_is_capped_at_100_chars() {
        let prose = format!("I refuse. {}", "reasons ".repeat(40));
        let resp = response_with(vec![text_part(&prose)]);
        match normalize_response(&resp) {
            Err(EditError::TextInsteadOfImage { excerpt }) => {
                assert_eq!(excerpt, prose.chars().take(100).collect::<String>());
                assert_eq!(excerpt.chars().count(), 100);
            }
            other => panic!("expected TextInsteadOfImage, got {:?}", other),
        }
    }

    #[test]
    fn payload_of_exactly_100_chars_is_rejected() {
        // The gate is strictly "more than 100"
        let payload = "H".repeat(100);
        let resp = response_with(vec![text_part(&payload)]);
        assert!(matches!(
            normalize_response(&resp),
            Err(EditError::TextInsteadOfImage { .. })
        ));
    }

    #[test]
    fn non_base64_text_is_never_mistaken_for_payload() {
        let prose = "word ".repeat(50); // long but contains spaces
        let resp = response_with(vec![text_part(&prose)]);
        assert!(matches!(
            normalize_response(&resp),
            Err(EditError::TextInsteadOfImage { .. })
        ));
    }

    #[test]
    fn base64_plausibility_check() {
        assert!(is_plausible_base64("abc+/=XYZ123"));
        assert!(!is_plausible_base64(""));
        assert!(!is_plausible_base64("has space"));
        assert!(!is_plausible_base64("not-base64!"));
    }
}
