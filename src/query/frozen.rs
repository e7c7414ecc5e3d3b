//! Replay-only query view handed back to templates.

use std::sync::Arc;

use crate::host::{Pad, Record};

/// A query whose result ids were fixed when it was frozen.
///
/// Iteration looks each id up under `path` in the pad. Nothing here
/// filters, orders or slices: those operations ran once, when the ids were
/// captured, and are never repeated against the live tree.
#[derive(Clone)]
pub struct FrozenQuery<P: Pad> {
    path: String,
    pad: P,
    alt: Option<String>,
    ids: Arc<[String]>,
}

impl<P: Pad> FrozenQuery<P> {
    pub fn new(path: impl Into<String>, pad: P, ids: Arc<[String]>, alt: Option<String>) -> Self {
        Self {
            path: path.into(),
            pad,
            alt,
            ids,
        }
    }

    /// Path of the record whose children were queried.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn pad(&self) -> &P {
        &self.pad
    }

    pub fn alt(&self) -> Option<&str> {
        self.alt.as_deref()
    }

    /// The frozen ids, in result order.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of records that still resolve.
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Records for the frozen ids. Ids whose record has vanished are skipped.
    pub fn iter(&self) -> impl Iterator<Item = P::Record> + '_ {
        self.ids.iter().filter_map(|id| self.lookup(id))
    }

    pub fn first(&self) -> Option<P::Record> {
        self.iter().next()
    }

    /// Look up one child, but only if its id is in the frozen set.
    pub fn get(&self, id: &str) -> Option<P::Record> {
        if self.ids.iter().any(|known| known == id) {
            self.lookup(id)
        } else {
            None
        }
    }

    pub fn all(&self) -> Vec<P::Record> {
        self.iter().collect()
    }

    fn lookup(&self, id: &str) -> Option<P::Record> {
        self.pad.get(&child_path(&self.path, id), self.alt())
    }
}

impl<P: Pad> std::fmt::Debug for FrozenQuery<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrozenQuery")
            .field("path", &self.path)
            .field("alt", &self.alt)
            .field("ids", &self.ids)
            .finish()
    }
}

/// Join a record path and a child id.
pub(crate) fn child_path(parent: &str, id: &str) -> String {
    format!("{}/{}", parent.trim_end_matches('/'), id)
}

/// Paths of the records a frozen query yields, for display and tests.
pub fn record_paths<P: Pad>(query: &FrozenQuery<P>) -> Vec<String> {
    query.iter().map(|r| r.path().to_string()).collect()
}
