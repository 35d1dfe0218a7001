use bytes::Bytes;

use super::TileFormat;

/// Encoded tile bytes tagged with their format.
///
/// Cloning is cheap; every waiter on a render receives a handle to the same
/// buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileBlob {
    pub bytes: Bytes,
    pub format: TileFormat,
}

impl TileBlob {
    pub fn new(bytes: impl Into<Bytes>, format: TileFormat) -> Self {
        Self {
            bytes: bytes.into(),
            format,
        }
    }

    pub fn content_type(&self) -> &'static str {
        self.format.content_type()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}
