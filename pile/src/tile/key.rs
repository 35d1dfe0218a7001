//! Deterministic cache keys.
//!
//! The key embeds a content hash of the style text, so editing a style moves
//! every tile of its owner to fresh keys and the old entries are simply never
//! read again. No invalidation pass is needed.

use std::fmt::{self, Write as _};

use sha2::{Digest, Sha256};

use super::{OwnerKind, TileFormat, TileRequest};
use crate::coord::TileCoord;

/// Hex-encoded SHA-256 of a style text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StyleHash(String);

impl StyleHash {
    /// Hashes the style text alone.
    pub fn of(style: &str) -> Self {
        Self::digest([style.as_bytes()])
    }

    /// Hashes the style text together with an output variant such as an
    /// encoding quality, for owners whose bytes depend on both.
    pub fn with_variant(style: &str, variant: &str) -> Self {
        // NUL cannot appear in either part, so the concatenation is unambiguous
        Self::digest([style.as_bytes(), b"\0", variant.as_bytes()])
    }

    fn digest<'a>(parts: impl IntoIterator<Item = &'a [u8]>) -> Self {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        let digest = hasher.finalize();

        let mut hex = String::with_capacity(digest.len() * 2);
        for byte in digest {
            let _ = write!(hex, "{:02x}", byte);
        }
        Self(hex)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StyleHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical identity of one encoded tile.
///
/// Renders as `layer:{owner}:{style}:{z}:{x}:{y}:{format}` or
/// `cube:{owner}:{dataset}:{style}:{z}:{x}:{y}:{format}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: OwnerKind,
    pub owner_id: String,
    pub dataset_id: Option<String>,
    pub style_hash: StyleHash,
    pub coord: TileCoord,
    pub format: TileFormat,
}

impl CacheKey {
    pub fn for_request(request: &TileRequest, style_hash: StyleHash) -> Self {
        Self {
            kind: request.kind,
            owner_id: request.owner_id.clone(),
            dataset_id: request.dataset_id.clone(),
            style_hash,
            coord: request.coord,
            format: request.format,
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:", self.kind, self.owner_id)?;
        if let Some(dataset) = &self.dataset_id {
            write!(f, "{}:", dataset)?;
        }
        write!(
            f,
            "{}:{}:{}:{}:{}",
            self.style_hash, self.coord.z, self.coord.x, self.coord.y, self.format
        )
    }
}
