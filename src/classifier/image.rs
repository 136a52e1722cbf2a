use base64ct::{Base64, Encoding};
use bytes::Bytes;
use lazy_static::lazy_static;
use regex::Regex;

use super::ClassifyError;

const DEFAULT_MIME: &str = "image/jpeg";

/// A decoded image ready to hand to a classifier backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Bytes,
    pub content_type: String,
}

impl ImagePayload {
    pub fn new(bytes: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: content_type.into(),
        }
    }

    /// Decode a `data:<mime>;base64,<payload>` URL or a bare base64 string.
    pub fn from_transport(raw: &str) -> Result<Self, ClassifyError> {
        lazy_static! {
            static ref DATA_URL_HEADER: Regex =
                Regex::new(r"^data:(?P<mime>[\w.+-]+/[\w.+-]+)?(?:;[\w.+-]+=[^;,]*)*;base64$")
                    .unwrap();
        }

        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ClassifyError::InvalidInput("No image provided".into()));
        }

        let (declared_mime, encoded) = if raw.starts_with("data:") {
            let (header, body) = raw
                .split_once(',')
                .ok_or_else(|| ClassifyError::InvalidInput("data URL without payload".into()))?;
            let caps = DATA_URL_HEADER.captures(header).ok_or_else(|| {
                ClassifyError::InvalidInput("data URL must be base64-encoded".into())
            })?;
            (caps.name("mime").map(|m| m.as_str().to_lowercase()), body)
        } else {
            (None, raw)
        };

        let mut cleaned: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(ClassifyError::InvalidInput("No image provided".into()));
        }
        while cleaned.len() % 4 != 0 {
            cleaned.push('=');
        }

        let bytes = Base64::decode_vec(&cleaned)
            .map_err(|_| ClassifyError::InvalidInput("invalid base64".into()))?;
        if bytes.is_empty() {
            return Err(ClassifyError::InvalidInput("No image provided".into()));
        }

        let content_type = declared_mime
            .or_else(|| sniff_mime(&bytes).map(str::to_string))
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        Ok(Self::new(bytes, content_type))
    }

    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.content_type,
            Base64::encode_string(&self.bytes)
        )
    }
}

fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    match bytes {
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        [0x89, b'P', b'N', b'G', ..] => Some("image/png"),
        [b'G', b'I', b'F', b'8', ..] => Some("image/gif"),
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => Some("image/webp"),
        _ => None,
    }
}
