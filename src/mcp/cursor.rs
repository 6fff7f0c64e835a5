//! Pagination Cursor Codec
//!
//! Encodes a tool-listing resumption offset as an opaque base64url token.
//! Decoding is total: malformed input yields `None` and the caller restarts
//! from offset zero, so a stale or corrupted cursor can never fail a listing.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
struct CursorPayload {
    offset: usize,
}

/// Encode a catalog offset into an opaque cursor string
pub fn encode(offset: usize) -> String {
    // Serialization of a single usize field cannot fail.
    let payload = serde_json::to_vec(&CursorPayload { offset })
        .unwrap_or_else(|_| b"{\"offset\":0}".to_vec());
    URL_SAFE_NO_PAD.encode(payload)
}

/// Decode a cursor back into a catalog offset.
///
/// Returns `None` for anything not produced by [`encode`]: invalid base64,
/// non-JSON payloads, or payloads missing a numeric offset.
pub fn decode(cursor: &str) -> Option<usize> {
    let bytes = URL_SAFE_NO_PAD.decode(cursor).ok()?;
    let payload: CursorPayload = serde_json::from_slice(&bytes).ok()?;
    Some(payload.offset)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        for offset in [0usize, 1, 10, 31, 1000, usize::MAX / 2] {
            assert_eq!(decode(&encode(offset)), Some(offset));
        }
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert_eq!(decode("not base64!!!"), None);
        assert_eq!(decode("????"), None);
    }

    #[test]
    fn test_decode_non_json_payload() {
        let cursor = URL_SAFE_NO_PAD.encode(b"plain text");
        assert_eq!(decode(&cursor), None);
    }

    #[test]
    fn test_decode_non_numeric_offset() {
        let cursor = URL_SAFE_NO_PAD.encode(br#"{"offset":"ten"}"#);
        assert_eq!(decode(&cursor), None);

        let cursor = URL_SAFE_NO_PAD.encode(br#"{"offset":-3}"#);
        assert_eq!(decode(&cursor), None);
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode(""), None);
    }

    #[test]
    fn test_cursor_is_opaque() {
        // No raw digits leak into the token
        let cursor = encode(42);
        assert!(!cursor.contains("42"));
    }
}
