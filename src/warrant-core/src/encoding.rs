//! Base64url helpers shared by key documents and compact tokens.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Encode to base64url without padding.
pub(crate) fn base64url_encode(data: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(data)
}

/// Decode unpadded base64url.
pub(crate) fn base64url_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(input)
}

/// Decode a base64url field that must be exactly `N` bytes.
pub(crate) fn base64url_decode_array<const N: usize>(input: &str) -> Option<[u8; N]> {
    base64url_decode(input).ok()?.try_into().ok()
}
