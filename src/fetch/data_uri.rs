//! `data:` URI decoding (RFC 2397) for inline logos and proxy payloads.

use base64::Engine;

use crate::error::LoadFailure;

const DATA_URI_PREFIX: &str = "data:";

/// Returns the payload bytes. The media type is not trusted; callers sniff
/// the bytes themselves.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, LoadFailure> {
    let rest = uri
        .strip_prefix(DATA_URI_PREFIX)
        .ok_or_else(|| invalid("URI does not start with 'data:'"))?;
    let (metadata, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("missing comma in data URI"))?;

    let is_base64 = metadata
        .split(';')
        .skip(1)
        .any(|p| p.trim().eq_ignore_ascii_case("base64"));

    if is_base64 {
        decode_base64(payload)
    } else {
        percent_decode(payload)
    }
}

/// Base64 payloads from proxies are sometimes line-wrapped.
fn decode_base64(payload: &str) -> Result<Vec<u8>, LoadFailure> {
    let cleaned: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    base64::engine::general_purpose::STANDARD
        .decode(&cleaned)
        .map_err(|e| invalid(&format!("invalid base64: {e}")))
}

fn percent_decode(input: &str) -> Result<Vec<u8>, LoadFailure> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] != b'%' {
            out.push(bytes[i]);
            i += 1;
            continue;
        }
        let hex = bytes
            .get(i + 1..i + 3)
            .ok_or_else(|| invalid("incomplete percent-escape"))?;
        let hi = (hex[0] as char).to_digit(16);
        let lo = (hex[1] as char).to_digit(16);
        match (hi, lo) {
            (Some(hi), Some(lo)) => out.push(((hi << 4) | lo) as u8),
            _ => return Err(invalid("invalid percent-escape")),
        }
        i += 3;
    }

    Ok(out)
}

fn invalid(reason: &str) -> LoadFailure {
    LoadFailure::InvalidDataUri(reason.to_string())
}
