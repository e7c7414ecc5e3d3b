//! Frozen query results: the virtual source a page depends on instead of
//! the live query.
//!
//! A `QueryResults` captures the ordered ids a query matched the first time
//! anyone asked, and exposes a checksum over them. The host's freshness
//! check only sees that checksum, so unrelated edits to records the query
//! merely scanned do not invalidate dependent pages.

mod checksum;

pub use checksum::{ContentHash, compute_checksum};

use std::sync::{Arc, OnceLock};

use crate::debug;
use crate::host::{Pad, Query, VirtualSource};
use crate::query::QueryId;

/// Memoized result ids of one query within one pad.
pub struct QueryResults<P: Pad> {
    record: P::Record,
    query: P::Query,
    id: QueryId,
    path: String,
    matched_ids: OnceLock<Arc<[String]>>,
}

impl<P: Pad> QueryResults<P> {
    /// Wrap a pad-bound query.
    ///
    /// Returns `None` if the query is not bound to a pad. Reading the pad
    /// root does not register a dependency: it only anchors the cache key.
    pub fn new(query: P::Query, id: QueryId, prefix: &str) -> Option<Self> {
        let pad = query.pad()?;
        let record = pad.without_dependencies(|| pad.root());
        let path = virtual_source_path(prefix, &id);
        Some(Self {
            record,
            query,
            id,
            path,
            matched_ids: OnceLock::new(),
        })
    }

    /// The record this virtual source hangs off (the pad root).
    pub fn record(&self) -> &P::Record {
        &self.record
    }

    pub fn query(&self) -> &P::Query {
        &self.query
    }

    pub fn id(&self) -> &QueryId {
        &self.id
    }

    /// Ids matched by the query, evaluated once with dependency recording
    /// suspended.
    pub fn matched_ids(&self) -> &Arc<[String]> {
        self.matched_ids.get_or_init(|| {
            let ids = match self.query.pad() {
                Some(pad) => pad.without_dependencies(|| self.query.result_ids()),
                None => Vec::new(),
            };
            debug!("cache"; "froze {} ids for {}", ids.len(), self.query.path());
            ids.into()
        })
    }
}

impl<P: Pad> VirtualSource for QueryResults<P> {
    fn path(&self) -> &str {
        &self.path
    }

    fn checksum(&self) -> ContentHash {
        compute_checksum(&self.matched_ids()[..])
    }
}

impl<P: Pad> std::fmt::Debug for QueryResults<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryResults")
            .field("path", &self.path)
            .field("matched_ids", &self.matched_ids.get())
            .finish()
    }
}

/// Absolute virtual path of a frozen query: `/@<prefix>/<id>`.
pub fn virtual_source_path(prefix: &str, id: &QueryId) -> String {
    format!("/@{prefix}/{id}")
}

/// Cache key of a frozen query, relative to the root: `<prefix>/<id>`.
pub fn cache_key(prefix: &str, id: &str) -> String {
    format!("{prefix}/{id}")
}
