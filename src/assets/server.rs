use std::sync::Arc;
use std::time::Duration;

use crate::animation::MotionClip;
use crate::assets::cache::AssetCache;
use crate::assets::io::{AssetReader, FileAssetReader};
use crate::assets::loaders;
use crate::assets::source::{AssetFormat, AssetRef};
use crate::errors::{Error, Result};
use crate::scene::MeshAsset;

/// Default upper bound on a single load (fetch plus decode).
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Loads and caches mesh assets and raw motion clips.
///
/// Cloning is cheap; clones share the reader and both caches. Identical
/// references resolve to the same `Arc` and concurrent requests for one
/// reference share a single fetch and decode.
pub struct AssetServer<R: AssetReader = FileAssetReader> {
    reader: Arc<R>,
    pub meshes: Arc<AssetCache<MeshAsset>>,
    pub clips: Arc<AssetCache<MotionClip>>,
    load_timeout: Duration,
}

impl<R: AssetReader> Clone for AssetServer<R> {
    fn clone(&self) -> Self {
        Self {
            reader: self.reader.clone(),
            meshes: self.meshes.clone(),
            clips: self.clips.clone(),
            load_timeout: self.load_timeout,
        }
    }
}

impl AssetServer<FileAssetReader> {
    /// Serves paths relative to `root`.
    pub fn new(root: impl AsRef<std::path::Path>) -> Self {
        Self::with_reader(FileAssetReader::new(root))
    }
}

impl<R: AssetReader> AssetServer<R> {
    #[must_use]
    pub fn with_reader(reader: R) -> Self {
        Self {
            reader: Arc::new(reader),
            meshes: Arc::new(AssetCache::new()),
            clips: Arc::new(AssetCache::new()),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    #[inline]
    #[must_use]
    pub fn load_timeout(&self) -> Duration {
        self.load_timeout
    }

    #[inline]
    #[must_use]
    pub fn reader(&self) -> &R {
        &self.reader
    }

    // ========================================================================
    // Loading
    // ========================================================================

    /// Loads (or returns the cached) mesh behind `reference`.
    pub async fn load_mesh(&self, reference: &AssetRef) -> Result<Arc<MeshAsset>> {
        self.meshes
            .get_or_load(reference.id(), || {
                self.bounded(reference, |bytes, hint, label| {
                    loaders::decode_mesh(&bytes, hint, &label)
                })
            })
            .await
    }

    /// Loads (or returns the cached) raw clip behind `reference`.
    pub async fn load_clip(&self, reference: &AssetRef) -> Result<Arc<MotionClip>> {
        self.clips
            .get_or_load(reference.id(), || {
                self.bounded(reference, |bytes, hint, label| {
                    loaders::decode_clip(&bytes, hint, &label)
                })
            })
            .await
    }

    /// Drops the cached clip for `reference`. Returns whether one was cached.
    pub fn invalidate_clip(&self, reference: &AssetRef) -> bool {
        let evicted = self.clips.evict(&reference.id());
        if evicted {
            log::debug!("Evicted clip '{reference}' from cache");
        }
        evicted
    }

    /// Drops the cached mesh for `reference`. Returns whether one was cached.
    pub fn invalidate_mesh(&self, reference: &AssetRef) -> bool {
        self.meshes.evict(&reference.id())
    }

    #[must_use]
    pub fn cached_mesh(&self, reference: &AssetRef) -> Option<Arc<MeshAsset>> {
        self.meshes.get(&reference.id())
    }

    #[must_use]
    pub fn cached_clip(&self, reference: &AssetRef) -> Option<Arc<MotionClip>> {
        self.clips.get(&reference.id())
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    /// Fetch then decode on the blocking pool, all under the load timeout.
    async fn bounded<T, F>(&self, reference: &AssetRef, decode: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<[u8]>, Option<AssetFormat>, String) -> Result<T> + Send + 'static,
    {
        let label = reference.label().to_string();
        let work = async {
            let bytes = self.fetch(reference).await?;
            let hint = reference.format_hint();
            let task_label = label.clone();
            tokio::task::spawn_blocking(move || decode(bytes, hint, task_label))
                .await
                .map_err(|e| {
                    if e.is_panic() {
                        Error::decode(&label, "decoder panicked")
                    } else {
                        Error::from(e)
                    }
                })?
        };

        match tokio::time::timeout(self.load_timeout, work).await {
            Ok(result) => {
                match &result {
                    Ok(_) => log::info!("Loaded '{label}'"),
                    Err(e) => log::warn!("Failed to load '{label}': {e}"),
                }
                result
            }
            Err(_) => {
                log::warn!("Loading '{label}' timed out after {:?}", self.load_timeout);
                Err(Error::AssetLoadTimeout {
                    reference: label,
                    timeout: self.load_timeout,
                })
            }
        }
    }

    async fn fetch(&self, reference: &AssetRef) -> Result<Arc<[u8]>> {
        match reference {
            AssetRef::Path(path) => {
                log::debug!("Fetching '{path}'");
                let bytes = self.reader.read_bytes(path).await?;
                Ok(bytes.into())
            }
            AssetRef::Inline(inline) => Ok(inline.bytes.clone()),
        }
    }
}
