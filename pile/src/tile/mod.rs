//! Tile addressing types.
//!
//! A tile request is canonicalized into a [`CacheKey`] before anything else
//! happens to it; the key is what the cache store, the render coordinator and
//! the logs agree on.

mod blob;
mod format;
mod key;
mod request;

pub use blob::TileBlob;
pub use format::{TileFormat, UnknownFormat};
pub use key::{CacheKey, StyleHash};
pub use request::{OwnerKind, TileRequest};
