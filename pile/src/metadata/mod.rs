//! Layer and cube metadata.
//!
//! Records are owned by the management operations in [`LayerService`] and
//! [`CubeService`]. The tile path only reads them, together with the dataset
//! status reported by an [`IngestionStatusSource`].

mod cubes;
mod error;
mod ingestion;
mod layers;
mod model;
mod store;

pub use cubes::{CubeDraft, CubePatch, CubeService};
pub use error::{IngestionError, MetadataError};
pub use ingestion::{IngestionStatus, IngestionStatusSource, Readiness};
pub use layers::{
    LayerDraft, LayerPatch, LayerService, NOT_PROCESSED_MESSAGE, NOT_UPLOADED_MESSAGE,
    TABLE_PLACEHOLDER,
};
pub(crate) use layers::ingestion_error;
pub use model::*;
pub use store::{KvMetadataStore, MetadataStore};

/// Current wall-clock time in epoch milliseconds.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// A timestamp strictly after `previous`, normally the current time.
pub(crate) fn next_timestamp(previous: i64) -> i64 {
    now_ms().max(previous + 1)
}
