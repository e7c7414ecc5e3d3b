//! Per-revision cache for virtual sources.
//!
//! Each pad owns one `VirtualCache`, so a new revision starts empty and
//! revisions never see each other's entries.

use dashmap::DashMap;
use std::any::Any;
use std::sync::Arc;

use crate::debug;

type CacheKey = (String, String);
type CacheValue = Arc<dyn Any + Send + Sync>;

/// Get-or-create cache keyed by `(root path, virtual path)`.
#[derive(Default)]
pub struct VirtualCache {
    entries: DashMap<CacheKey, CacheValue>,
}

impl VirtualCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the cached value, if one of type `T` exists.
    pub fn get<T>(&self, root: &str, virtual_path: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let key = (root.to_owned(), virtual_path.to_owned());
        let value = self.entries.get(&key)?.value().clone();
        value.downcast().ok()
    }

    /// Fetch the cached value or build one with `create`.
    ///
    /// `create` runs without holding a shard lock and may return `None` to
    /// signal "not found", in which case nothing is cached. When two callers
    /// race, both may run `create` but only the first insert is kept and
    /// returned to both.
    pub fn get_or_create<T, F>(&self, root: &str, virtual_path: &str, create: F) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
        F: FnOnce() -> Option<T>,
    {
        if let Some(hit) = self.get(root, virtual_path) {
            return Some(hit);
        }

        let created: CacheValue = Arc::new(create()?);
        let key = (root.to_owned(), virtual_path.to_owned());
        let value = self.entries.entry(key).or_insert(created).value().clone();
        debug!("cache"; "created {}", virtual_path);
        value.downcast().ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for VirtualCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualCache")
            .field("entries", &self.entries.len())
            .finish()
    }
}
