//! Layer and cube persistence.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{Cube, Layer, MetadataError};
use crate::cache::{BoxFuture, Cache, MemoryCacheProvider};

/// Storage for layer and cube records.
pub trait MetadataStore: Send + Sync {
    fn layer<'a>(&'a self, layer_id: &'a str) -> BoxFuture<'a, Result<Option<Layer>, MetadataError>>;

    fn put_layer<'a>(&'a self, layer: &'a Layer) -> BoxFuture<'a, Result<(), MetadataError>>;

    fn cube<'a>(&'a self, cube_id: &'a str) -> BoxFuture<'a, Result<Option<Cube>, MetadataError>>;

    fn put_cube<'a>(&'a self, cube: &'a Cube) -> BoxFuture<'a, Result<(), MetadataError>>;
}

/// Records as JSON values in a [`Cache`], under `meta:layer:{id}` and
/// `meta:cube:{id}`.
///
/// The backing cache must not evict: use a disk provider without a GC
/// interval, or a memory provider sized well above the record volume.
pub struct KvMetadataStore {
    cache: Arc<dyn Cache>,
}

impl KvMetadataStore {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        Self { cache }
    }

    /// Volatile store for tests and single-process setups.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCacheProvider::new(u64::MAX / 2, None)))
    }

    fn layer_key(layer_id: &str) -> String {
        format!("meta:layer:{}", layer_id)
    }

    fn cube_key(cube_id: &str) -> String {
        format!("meta:cube:{}", cube_id)
    }

    async fn read<T: DeserializeOwned>(&self, key: String) -> Result<Option<T>, MetadataError> {
        let Some(bytes) = self.cache.get(&key).await? else {
            return Ok(None);
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|e| MetadataError::Corrupt {
                key,
                reason: e.to_string(),
            })
    }

    async fn write<T: Serialize>(&self, key: String, record: &T) -> Result<(), MetadataError> {
        let bytes = serde_json::to_vec(record).map_err(|e| MetadataError::Encode(e.to_string()))?;
        self.cache.set(&key, bytes).await?;
        Ok(())
    }
}

impl MetadataStore for KvMetadataStore {
    fn layer<'a>(&'a self, layer_id: &'a str) -> BoxFuture<'a, Result<Option<Layer>, MetadataError>> {
        Box::pin(self.read(Self::layer_key(layer_id)))
    }

    fn put_layer<'a>(&'a self, layer: &'a Layer) -> BoxFuture<'a, Result<(), MetadataError>> {
        Box::pin(self.write(Self::layer_key(&layer.layer_id), layer))
    }

    fn cube<'a>(&'a self, cube_id: &'a str) -> BoxFuture<'a, Result<Option<Cube>, MetadataError>> {
        Box::pin(self.read(Self::cube_key(cube_id)))
    }

    fn put_cube<'a>(&'a self, cube: &'a Cube) -> BoxFuture<'a, Result<(), MetadataError>> {
        Box::pin(self.write(Self::cube_key(&cube.cube_id), cube))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coord::GeoBounds;
    use crate::metadata::DatasetRef;
    use serde_json::Map;

    fn cube(id: &str) -> Cube {
        Cube {
            cube_id: id.into(),
            style: "#layer {}".into(),
            quality: "png8".into(),
            datasets: vec![DatasetRef::new("file_a")],
            created_at: 1,
            timestamp: 1,
            created_by: None,
            options: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_cube_round_trip() {
        let store = KvMetadataStore::in_memory();
        store.put_cube(&cube("cube-1")).await.unwrap();

        let loaded = store.cube("cube-1").await.unwrap().unwrap();
        assert_eq!(loaded, cube("cube-1"));
        assert!(store.cube("cube-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_layer_extent_survives_exactly() {
        let extent = GeoBounds {
            min_lon: -122.51,
            min_lat: 37.70,
            max_lon: -122.35,
            max_lat: 37.83,
        }
        .to_envelope();
        let layer = Layer {
            layer_id: "layer-1".into(),
            file_id: "file_a".into(),
            database_name: "db".into(),
            table_name: "t".into(),
            sql: "select * from t".into(),
            cartocss: "#layer {}".into(),
            cartocss_version: "2.0.1".into(),
            geom_column: "the_geom_webmercator".into(),
            geom_type: "geometry".into(),
            raster_band: 0,
            srid: 3857,
            extent: Some(extent),
            created_at: 1,
            timestamp: 1,
        };

        let store = KvMetadataStore::in_memory();
        store.put_layer(&layer).await.unwrap();

        let loaded = store.layer("layer-1").await.unwrap().unwrap();
        assert_eq!(loaded.extent, Some(extent));
    }

    #[tokio::test]
    async fn test_layers_and_cubes_do_not_collide() {
        let store = KvMetadataStore::in_memory();
        store.put_cube(&cube("same")).await.unwrap();
        assert!(store.layer("same").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_error() {
        let cache: Arc<dyn Cache> = Arc::new(MemoryCacheProvider::new(1024, None));
        cache.set("meta:cube:bad", b"{not json".to_vec()).await.unwrap();

        let store = KvMetadataStore::new(cache);
        let err = store.cube("bad").await.unwrap_err();
        assert!(matches!(err, MetadataError::Corrupt { .. }));
    }
}
