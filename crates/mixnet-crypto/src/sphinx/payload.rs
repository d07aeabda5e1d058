//! Body framing for the innermost payload layer.
//!
//! ```text
//! tag(16) ‖ label_len(u16) ‖ label ‖ message_len(u16) ‖ message ‖ zero padding
//! ```
//!
//! The tag is a MAC over everything after it, keyed by the final hop's
//! payload MAC key.

use super::keys::MacKey;
use super::SphinxParams;
use crate::constant_time::{is_all_zero, verify_16};
use crate::hash::mac;
use crate::{CryptoError, MAC_SIZE};

/// Frame and authenticate `destination` and `message` into a full-size body.
pub(crate) fn encode_body(
    params: &SphinxParams,
    key: &MacKey,
    destination: &[u8],
    message: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let requested = destination.len() + message.len();
    if requested > params.max_content_len() {
        return Err(CryptoError::PayloadTooLarge {
            max: params.max_content_len(),
            actual: requested,
        });
    }

    let mut body = vec![0u8; params.payload_size()];
    let content = &mut body[MAC_SIZE..];

    let mut pos = 0;
    for field in [destination, message] {
        // Bounded by max_content_len, which is below u16::MAX.
        let len = field.len() as u16;
        content[pos..pos + 2].copy_from_slice(&len.to_be_bytes());
        pos += 2;
        content[pos..pos + field.len()].copy_from_slice(field);
        pos += field.len();
    }

    let tag = mac(key.as_bytes(), &[&body[MAC_SIZE..]]);
    body[..MAC_SIZE].copy_from_slice(&tag);
    Ok(body)
}

/// Verify the body tag and split out `(destination, message)`.
pub(crate) fn decode_body(key: &MacKey, body: &[u8]) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
    if body.len() < super::BODY_OVERHEAD {
        return Err(CryptoError::MalformedPayload("body shorter than framing"));
    }

    let mut tag = [0u8; MAC_SIZE];
    tag.copy_from_slice(&body[..MAC_SIZE]);
    let expected = mac(key.as_bytes(), &[&body[MAC_SIZE..]]);
    if !verify_16(&expected, &tag) {
        return Err(CryptoError::PayloadTagMismatch);
    }

    let content = &body[MAC_SIZE..];
    let mut pos = 0;
    let mut fields = Vec::with_capacity(2);
    for _ in 0..2 {
        if pos + 2 > content.len() {
            return Err(CryptoError::MalformedPayload("truncated length prefix"));
        }
        let len = usize::from(u16::from_be_bytes([content[pos], content[pos + 1]]));
        pos += 2;
        if pos + len > content.len() {
            return Err(CryptoError::MalformedPayload("field overruns body"));
        }
        fields.push(content[pos..pos + len].to_vec());
        pos += len;
    }

    if !is_all_zero(&content[pos..]) {
        return Err(CryptoError::MalformedPayload("non-zero padding"));
    }

    let message = fields.pop().unwrap_or_default();
    let destination = fields.pop().unwrap_or_default();
    Ok((destination, message))
}
