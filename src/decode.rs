//! Byte input decoding: UTF-8 first, GBK as the fallback.

use std::borrow::Cow;

use encoding_rs::GBK;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Input bytes are neither valid UTF-8 nor valid GBK.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("input is neither UTF-8 nor GBK (invalid UTF-8 after {valid_up_to} bytes)")]
pub struct DecodeError {
    pub valid_up_to: usize,
}

/// Decode raw input. Valid UTF-8 is borrowed with a leading BOM removed;
/// otherwise the bytes must decode as GBK without replacement characters.
pub fn decode_input(bytes: &[u8]) -> Result<Cow<'_, str>, DecodeError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Ok(Cow::Borrowed(text)),
        Err(utf8_err) => {
            let (text, had_errors) = GBK.decode_without_bom_handling(bytes);
            if had_errors {
                Err(DecodeError {
                    valid_up_to: utf8_err.valid_up_to(),
                })
            } else {
                Ok(text)
            }
        }
    }
}
