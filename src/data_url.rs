pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";

/// Split caller-supplied image data into (declared mime type, bare base64 payload).
///
/// A comma-delimited prefix marks a data-URL; anything else is treated as
/// already-bare base64 and defaults to JPEG.
pub fn split_image_payload(input: &str) -> (&'static str, &str) {
    match input.split_once(',') {
        Some((prefix, payload)) => {
            let mime = if prefix.contains(PNG_MIME) { PNG_MIME } else { JPEG_MIME };
            (mime, payload)
        }
        None => (JPEG_MIME, input),
    }
}

pub fn compose(mime_type: &str, payload: &str) -> String {
    format!("data:{};base64,{}", mime_type, payload)
}

/// Payload after the comma when the whole string is a data-URL, else None.
pub fn payload_of(input: &str) -> Option<&str> {
    if input.starts_with("data:") {
        input.split_once(',').map(|(_, payload)| payload)
    } else {
        None
    }
}
