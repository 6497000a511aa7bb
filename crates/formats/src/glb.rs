//! Binary glTF container helpers.
//!
//! Layout: a 12 byte header (`magic`, `version`, `total length`) followed by
//! chunks of `(length, type, data)`. Chunk data is padded to 4 bytes: JSON
//! with spaces, BIN with zeros.

pub const GLB_MAGIC: [u8; 4] = *b"glTF";
pub const GLB_VERSION: u32 = 2;
const CHUNK_JSON: u32 = 0x4E4F_534A;
const CHUNK_BIN: u32 = 0x004E_4942;

/// What a downloaded payload looks like before any real decoding.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadKind {
    Empty,
    Glb,
    /// Text glTF (`.gltf`).
    Json,
    /// Typically an error page or SPA fallback served under the model URL.
    Html,
    Unknown,
}

pub fn sniff(bytes: &[u8]) -> PayloadKind {
    if bytes.is_empty() {
        return PayloadKind::Empty;
    }
    if bytes.starts_with(&GLB_MAGIC) {
        return PayloadKind::Glb;
    }

    let text_start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .map(|i| bytes[i]);
    match text_start {
        Some(b'<') => PayloadKind::Html,
        Some(b'{') => PayloadKind::Json,
        None => PayloadKind::Empty,
        Some(_) => PayloadKind::Unknown,
    }
}

fn push_chunk(out: &mut Vec<u8>, kind: u32, data: &[u8], pad: u8) {
    let padded = data.len().div_ceil(4) * 4;
    out.extend_from_slice(&(padded as u32).to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(data);
    out.resize(out.len() + (padded - data.len()), pad);
}

/// Packs a glTF JSON document and optional binary buffer into a GLB container.
pub fn write_glb(json: &str, bin: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(12 + 16 + json.len() + bin.len() + 8);
    out.extend_from_slice(&GLB_MAGIC);
    out.extend_from_slice(&GLB_VERSION.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    push_chunk(&mut out, CHUNK_JSON, json.as_bytes(), b' ');
    if !bin.is_empty() {
        push_chunk(&mut out, CHUNK_BIN, bin, 0);
    }

    let total = out.len() as u32;
    out[8..12].copy_from_slice(&total.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::{PayloadKind, sniff, write_glb};

    #[test]
    fn sniffs_common_payloads() {
        assert_eq!(sniff(b""), PayloadKind::Empty);
        assert_eq!(sniff(b"   \n"), PayloadKind::Empty);
        assert_eq!(sniff(b"\n<!doctype html><html>"), PayloadKind::Html);
        assert_eq!(sniff(br#"{"asset":{}}"#), PayloadKind::Json);
        assert_eq!(sniff(&[0x89, b'P', b'N', b'G']), PayloadKind::Unknown);
        assert_eq!(sniff(&write_glb("{}", &[])), PayloadKind::Glb);
    }

    #[test]
    fn container_is_aligned_and_sized() {
        let glb = write_glb(r#"{"a":1}"#, &[1, 2, 3]);
        assert_eq!(glb.len() % 4, 0);
        let total = u32::from_le_bytes([glb[8], glb[9], glb[10], glb[11]]);
        assert_eq!(total as usize, glb.len());
        // JSON chunk length is padded from 7 to 8.
        assert_eq!(u32::from_le_bytes([glb[12], glb[13], glb[14], glb[15]]), 8);
    }
}
