//! Reversible text-safe string transform.
//!
//! Encoded output only ever contains `[A-Za-z0-9+/=]`, so it can be used as
//! a flat storage key and embedded in JSON without escaping.

use crate::error::{CodecError, CodecResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

/// Encodes a UTF-8 string into its text-safe form.
#[must_use]
pub fn encode(input: &str) -> String {
    encode_bytes(input.as_bytes())
}

/// Decodes a text-safe string back into the original UTF-8 string.
///
/// # Errors
///
/// Returns an error if the input is not valid base64 or does not decode to
/// valid UTF-8.
pub fn decode(input: &str) -> CodecResult<String> {
    let bytes = decode_bytes(input)?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Encodes arbitrary bytes into their text-safe form.
#[must_use]
pub fn encode_bytes(input: &[u8]) -> String {
    STANDARD.encode(input)
}

/// Decodes a text-safe string into raw bytes.
///
/// # Errors
///
/// Returns an error if the input is not valid base64.
pub fn decode_bytes(input: &str) -> CodecResult<Vec<u8>> {
    STANDARD
        .decode(input)
        .map_err(|e| CodecError::decoding_failed(e.to_string()))
}

/// Returns true if `c` can appear in encoded output.
#[must_use]
pub fn is_encoded_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '='
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_known_value() {
        assert_eq!(encode("foobar"), "Zm9vYmFy");
    }

    #[test]
    fn decode_known_value() {
        assert_eq!(decode("Zm9vYmFy").unwrap(), "foobar");
    }

    #[test]
    fn control_characters_survive() {
        let raw = "default!!Person\n42\tSong\u{8}imagine";
        let encoded = encode(raw);
        assert!(encoded.chars().all(is_encoded_char));
        assert_eq!(decode(&encoded).unwrap(), raw);
    }

    #[test]
    fn multibyte_text_survives() {
        let raw = "Rodäbel ☃";
        assert_eq!(decode(&encode(raw)).unwrap(), raw);
    }

    #[test]
    fn invalid_base64_is_rejected() {
        assert!(matches!(
            decode("not base64!"),
            Err(CodecError::DecodingFailed { .. })
        ));
    }

    #[test]
    fn non_utf8_payload_is_rejected() {
        let encoded = encode_bytes(&[0xff, 0xfe, 0xfd]);
        assert_eq!(decode(&encoded), Err(CodecError::InvalidUtf8));
        assert_eq!(decode_bytes(&encoded).unwrap(), vec![0xff, 0xfe, 0xfd]);
    }
}
