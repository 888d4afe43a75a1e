//! Content-encoding negotiation between the transport and the renderer.
//!
//! Style-like resources are always handed over decoded. Tiles follow
//! [`TileEncoding`], which lets a scenario push raw compressed bytes into the tile decoder.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};

use crate::resource::request::{EncodingExpectation, ResourceError, ResourceKind};

/// Leading bytes of every gzip member.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Tile payload handling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileEncoding {
    /// Inflate gzip tile bodies before delivery.
    #[default]
    Decompress,
    /// Deliver tile bodies exactly as received.
    Passthrough,
}

/// Per-kind encoding policy applied by the provider.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodingPolicy {
    /// Tile handling; every other kind is always decoded.
    pub tiles: TileEncoding,
}

impl EncodingPolicy {
    /// Policy that inflates everything.
    pub fn decompress_all() -> Self {
        Self {
            tiles: TileEncoding::Decompress,
        }
    }

    /// Policy that leaves tile bodies compressed.
    pub fn raw_tiles() -> Self {
        Self {
            tiles: TileEncoding::Passthrough,
        }
    }

    /// Encoding expectation for a resource of `kind`.
    pub fn expectation_for(self, kind: ResourceKind) -> EncodingExpectation {
        match (kind, self.tiles) {
            (ResourceKind::Tile, TileEncoding::Passthrough) => EncodingExpectation::Raw,
            _ => EncodingExpectation::Decoded,
        }
    }
}

/// Return `true` when `bytes` begins with the gzip magic.
pub fn is_gzip(bytes: &[u8]) -> bool {
    bytes.len() >= GZIP_MAGIC.len() && bytes[..2] == GZIP_MAGIC
}

/// Return `true` when a `Content-Encoding` header value names gzip.
pub fn header_is_gzip(content_encoding: Option<&str>) -> bool {
    content_encoding.is_some_and(|v| {
        v.split(',')
            .any(|t| matches!(t.trim().to_ascii_lowercase().as_str(), "gzip" | "x-gzip"))
    })
}

/// Inflate a gzip stream.
pub fn gunzip(bytes: &[u8]) -> Result<Vec<u8>, ResourceError> {
    let mut out = Vec::with_capacity(bytes.len().saturating_mul(4));
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .map_err(|e| ResourceError::ContentEncoding(format!("gzip: {e}")))?;
    Ok(out)
}

/// Compress `bytes` into a gzip stream.
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    // Writing into a Vec cannot fail.
    let _ = enc.write_all(bytes);
    enc.finish().unwrap_or_default()
}

/// Apply `expectation` to a body that arrived with `content_encoding`.
///
/// Under [`EncodingExpectation::Decoded`], a body is inflated when the header says gzip or the
/// body carries the gzip magic (static servers often hand out precompressed files unlabelled).
pub fn apply_expectation(
    expectation: EncodingExpectation,
    content_encoding: Option<&str>,
    body: Vec<u8>,
) -> Result<Vec<u8>, ResourceError> {
    match expectation {
        EncodingExpectation::Raw => Ok(body),
        EncodingExpectation::Decoded => {
            if header_is_gzip(content_encoding) || is_gzip(&body) {
                gunzip(&body)
            } else {
                Ok(body)
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/resource/encoding.rs"]
mod tests;
