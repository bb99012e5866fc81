use std::future::Future;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tokio::sync::OnceCell;
use uuid::Uuid;

use crate::errors::Result;

type Slot<T> = Arc<OnceCell<Arc<T>>>;

/// Thread-safe, id-keyed cache of decoded assets.
///
/// Each id owns a slot that is filled at most once. Concurrent loads of the
/// same id share the slot, so the decoder runs once and every caller gets
/// the same `Arc`. A failed load leaves the slot empty; the next request
/// retries.
pub struct AssetCache<T> {
    slots: RwLock<FxHashMap<Uuid, Slot<T>>>,
}

impl<T> Default for AssetCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> AssetCache<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: RwLock::default(),
        }
    }

    fn slot(&self, id: Uuid) -> Slot<T> {
        if let Some(slot) = self.slots.read().get(&id) {
            return slot.clone();
        }
        self.slots.write().entry(id).or_default().clone()
    }

    /// Returns the cached value for `id`, running `load` if it is absent.
    ///
    /// The lock is never held across `load`.
    pub async fn get_or_load<F, Fut>(&self, id: Uuid, load: F) -> Result<Arc<T>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let slot = self.slot(id);
        let value = slot
            .get_or_try_init(|| async { load().await.map(Arc::new) })
            .await?;
        Ok(value.clone())
    }

    /// Completed value for `id`, if any.
    pub fn get(&self, id: &Uuid) -> Option<Arc<T>> {
        self.slots.read().get(id)?.get().cloned()
    }

    #[must_use]
    pub fn contains(&self, id: &Uuid) -> bool {
        self.get(id).is_some()
    }

    /// Forgets `id`. Holders of the `Arc` keep their copy; a load still in
    /// flight completes for its waiters but is not visible to later calls.
    pub fn evict(&self, id: &Uuid) -> bool {
        self.slots.write().remove(id).is_some()
    }

    /// Number of completed entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.read().values().filter(|s| s.initialized()).count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
