//! Payload encoding for the `data` field
//!
//! Payloads are opaque bytes. On the wire they are base64 text:
//!
//! ```text
//! base64( marker(1 byte) || body )
//!   marker 0x00: body is the raw payload
//!   marker 0x01: body is LZ4 with the uncompressed size prepended
//! ```
//!
//! The marker lets a reader decode documents written with either setting.

use crate::storage::error::{NodeStoreError, NodeStoreResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const MARKER_RAW: u8 = 0x00;
const MARKER_LZ4: u8 = 0x01;

/// Encode a payload for storage
pub fn encode_payload(payload: &[u8], compress: bool) -> String {
    let mut framed = Vec::with_capacity(payload.len() + 5);
    if compress {
        framed.push(MARKER_LZ4);
        framed.extend_from_slice(&lz4_flex::compress_prepend_size(payload));
    } else {
        framed.push(MARKER_RAW);
        framed.extend_from_slice(payload);
    }
    STANDARD.encode(framed)
}

/// Decode a stored payload back to the original bytes
pub fn decode_payload(encoded: &str) -> NodeStoreResult<Vec<u8>> {
    let framed = STANDARD
        .decode(encoded)
        .map_err(|e| NodeStoreError::CorruptResponse(format!("payload is not base64: {}", e)))?;

    match framed.split_first() {
        Some((&MARKER_RAW, body)) => Ok(body.to_vec()),
        Some((&MARKER_LZ4, body)) => lz4_flex::decompress_size_prepended(body).map_err(|e| {
            NodeStoreError::CorruptResponse(format!("LZ4 decompression failed: {}", e))
        }),
        Some((marker, _)) => Err(NodeStoreError::CorruptResponse(format!(
            "unknown payload marker {:#04x}",
            marker
        ))),
        None => Err(NodeStoreError::CorruptResponse(
            "empty payload field".to_string(),
        )),
    }
}
