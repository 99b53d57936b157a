//! Content digest used for change detection.

use md5::{Digest, Md5};

/// Length of a digest in hex characters.
pub const DIGEST_HEX_LEN: usize = 32;

/// Computes the lowercase hex MD5 digest of a string's UTF-8 bytes.
///
/// This is a change-detection fingerprint shared with the sync server, not a
/// security primitive.
#[must_use]
pub fn digest(input: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_of_empty_string() {
        assert_eq!(digest(""), "d41d8cd98f00b204e9800998ecf8427e");
    }

    #[test]
    fn digest_of_known_value() {
        assert_eq!(digest("hello world"), "5eb63bbbe01eeed093cb22bb8f5acdc3");
    }

    #[test]
    fn digest_is_fixed_length_lowercase_hex() {
        let d = digest("Person\n42");
        assert_eq!(d.len(), DIGEST_HEX_LEN);
        assert!(d.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }
}
