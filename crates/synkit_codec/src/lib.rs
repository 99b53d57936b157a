//! # synkit Codec
//!
//! The two leaf primitives of synkit:
//!
//! - a reversible, text-safe string transform (standard base64 over UTF-8)
//!   used for encoded keys and byte-string property values
//! - a one-way content digest (lowercase hex MD5) used to detect whether an
//!   entity changed since the last sync
//!
//! ## Usage
//!
//! ```
//! use synkit_codec::{decode, digest, encode};
//!
//! let encoded = encode("foobar");
//! assert_eq!(encoded, "Zm9vYmFy");
//! assert_eq!(decode(&encoded).unwrap(), "foobar");
//! assert_eq!(digest("").len(), 32);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod digest;
mod error;
mod text;

pub use digest::{digest, DIGEST_HEX_LEN};
pub use error::{CodecError, CodecResult};
pub use text::{decode, decode_bytes, encode, encode_bytes, is_encoded_char};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn text_roundtrip(s in ".*") {
            prop_assert_eq!(decode(&encode(&s)).unwrap(), s);
        }

        #[test]
        fn bytes_roundtrip(b in proptest::collection::vec(any::<u8>(), 0..256)) {
            prop_assert_eq!(decode_bytes(&encode_bytes(&b)).unwrap(), b);
        }

        #[test]
        fn encoded_output_is_text_safe(s in ".*") {
            prop_assert!(encode(&s).chars().all(is_encoded_char));
        }
    }
}
