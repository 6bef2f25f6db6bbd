//! `data:<mime>;base64,<payload>` encoding for images passed through JSON.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataUriError {
    #[error("data URI is not base64-encoded")]
    NotBase64,

    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error("data URI payload is empty")]
    Empty,
}

/// Decoded data URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataUri {
    /// Declared media type, if the input carried a `data:` header.
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

pub fn encode(mime_type: &str, data: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(data))
}

/// Decode a data URI. A bare base64 string (no `data:` header) is accepted
/// as well.
pub fn decode(input: &str) -> Result<DataUri, DataUriError> {
    let input = input.trim();

    let (mime_type, payload) = match input.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest.split_once(',').ok_or(DataUriError::NotBase64)?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or(DataUriError::NotBase64)?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, payload)
        }
        None => (None, input),
    };

    // Line-wrapped base64 is common in hand-built payloads.
    let compact: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if compact.is_empty() {
        return Err(DataUriError::Empty);
    }

    Ok(DataUri {
        mime_type,
        data: STANDARD.decode(compact)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_builds_base64_uri() {
        assert_eq!(encode("image/png", b"hi"), "data:image/png;base64,aGk=");
    }

    #[test]
    fn decode_reads_header_and_payload() {
        let uri = decode("data:image/jpeg;base64,aGk=").unwrap();
        assert_eq!(uri.mime_type.as_deref(), Some("image/jpeg"));
        assert_eq!(uri.data, b"hi");
    }

    #[test]
    fn decode_accepts_bare_base64() {
        let uri = decode("aGk=").unwrap();
        assert_eq!(uri.mime_type, None);
        assert_eq!(uri.data, b"hi");
    }

    #[test]
    fn decode_ignores_line_breaks() {
        let uri = decode("data:image/png;base64,aG\nk=").unwrap();
        assert_eq!(uri.data, b"hi");
    }

    #[test]
    fn decode_rejects_non_base64_uri() {
        assert!(matches!(
            decode("data:text/plain,hello"),
            Err(DataUriError::NotBase64)
        ));
    }

    #[test]
    fn decode_rejects_garbage() {
        assert!(matches!(
            decode("data:image/png;base64,@@@not-base64@@@"),
            Err(DataUriError::Payload(_))
        ));
        assert!(matches!(
            decode("data:image/png;base64,"),
            Err(DataUriError::Empty)
        ));
    }
}
