//! Compact, URL-safe codec for opaque payloads.
//!
//! Payloads are zlib-compressed and then written with the URL-safe base64
//! alphabet (`A-Z a-z 0-9 - _`). Padding `=` is replaced by `~`, which is an
//! unreserved URL character and never appears elsewhere in the output, so an
//! encoded string can sit in a path segment or query value unescaped.
//!
//! Compression makes realistic text payloads (template bodies, certificate
//! text) shorter than their UTF-8 form. High-entropy input such as the
//! signature bytes inside a signed token does not compress, and for it the
//! encoded form is longer than the raw bytes.

use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};

use crate::error::CodecError;

/// Character substituted for base64 padding.
pub const PAD_CHAR: char = '~';

/// Upper bound on a decoded payload. Anything larger is treated as corrupt.
pub const MAX_DECODED_LEN: usize = 1024 * 1024;

/// Encode raw bytes into a compact, URL-safe string.
pub fn encode(raw: &[u8]) -> Result<String, CodecError> {
    let compressed = deflate(raw)?;
    Ok(URL_SAFE.encode(compressed).replace('=', "~"))
}

/// Encode a UTF-8 string.
pub fn encode_str(raw: &str) -> Result<String, CodecError> {
    encode(raw.as_bytes())
}

/// Decode a string produced by [`encode`].
pub fn decode(encoded: &str) -> Result<Vec<u8>, CodecError> {
    if encoded.is_empty() {
        return Err(CodecError::MalformedEncoding("empty input".into()));
    }
    check_alphabet(encoded)?;

    let compressed = URL_SAFE
        .decode(encoded.replace(PAD_CHAR, "="))
        .map_err(|e| CodecError::MalformedEncoding(e.to_string()))?;

    inflate(&compressed)
}

/// Decode a string produced by [`encode_str`].
pub fn decode_str(encoded: &str) -> Result<String, CodecError> {
    let raw = decode(encoded)?;
    String::from_utf8(raw).map_err(|e| CodecError::CorruptPayload(e.to_string()))
}

/// Whether `c` belongs to the codec output alphabet.
pub fn is_codec_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == PAD_CHAR
}

/// Compress `raw` into a complete zlib stream.
fn deflate(raw: &[u8]) -> Result<Vec<u8>, CodecError> {
    const CHUNK: usize = 4096;

    let mut deflater = Compress::new(Compression::default(), true);
    let mut compressed = Vec::with_capacity(raw.len() / 2 + 64);

    loop {
        if compressed.len() == compressed.capacity() {
            compressed.reserve(CHUNK);
        }

        let consumed = deflater.total_in() as usize;
        let status = deflater
            .compress_vec(&raw[consumed..], &mut compressed, FlushCompress::Finish)
            .map_err(|e| CodecError::Compression(e.to_string()))?;

        match status {
            Status::StreamEnd => return Ok(compressed),
            // Output buffer full; grow it and resume.
            Status::Ok | Status::BufError => {}
        }
    }
}

/// Inflate a complete zlib stream.
///
/// Truncated streams and trailing bytes are both corrupt: the stream must end
/// exactly where the input does.
fn inflate(compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
    const CHUNK: usize = 4096;

    let mut inflater = Decompress::new(true);
    let mut raw = Vec::with_capacity(CHUNK);

    loop {
        if raw.len() == raw.capacity() {
            raw.reserve(CHUNK);
        }

        let in_before = inflater.total_in();
        let out_before = inflater.total_out();
        let consumed = in_before as usize;

        let status = inflater
            .decompress_vec(&compressed[consumed..], &mut raw, FlushDecompress::Finish)
            .map_err(|e| CodecError::CorruptPayload(e.to_string()))?;

        if raw.len() > MAX_DECODED_LEN {
            return Err(CodecError::CorruptPayload(format!(
                "decoded payload exceeds {} bytes",
                MAX_DECODED_LEN
            )));
        }

        match status {
            Status::StreamEnd => break,
            Status::Ok | Status::BufError => {
                let stalled =
                    inflater.total_in() == in_before && inflater.total_out() == out_before;
                if stalled && raw.len() < raw.capacity() {
                    return Err(CodecError::CorruptPayload("truncated stream".into()));
                }
            }
        }
    }

    if (inflater.total_in() as usize) != compressed.len() {
        return Err(CodecError::CorruptPayload(
            "trailing bytes after end of stream".into(),
        ));
    }

    Ok(raw)
}

/// Reject characters outside the alphabet, and padding anywhere but the tail.
fn check_alphabet(encoded: &str) -> Result<(), CodecError> {
    if let Some((pos, c)) = encoded.char_indices().find(|(_, c)| !is_codec_char(*c)) {
        return Err(CodecError::MalformedEncoding(format!(
            "character {:?} at offset {} is outside the alphabet",
            c, pos
        )));
    }

    let body = encoded.trim_end_matches(PAD_CHAR);
    if body.contains(PAD_CHAR) {
        return Err(CodecError::MalformedEncoding(
            "padding character before end of input".into(),
        ));
    }

    Ok(())
}
