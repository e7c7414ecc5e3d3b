//! Virtual path resolution for frozen query results.
//!
//! The host calls the resolver for `/@<prefix>/<rest>` with the record the
//! path is anchored at and the `/`-separated pieces of `<rest>`. The only
//! shape that resolves is the pad root with exactly one piece holding a
//! decodable query identity.

use std::sync::Arc;

use crate::host::{Pad, Record};
use crate::query::{QueryId, deserialize_query};
use crate::results::{QueryResults, cache_key};

/// Resolve `pieces` under `record` to the cached frozen results.
///
/// Repeated calls with the same identity on the same pad return the same
/// `Arc`. Any other request shape is "not found".
pub fn resolve_virtual_path<R: Record>(
    record: &R,
    pieces: &[&str],
    prefix: &str,
) -> Option<Arc<QueryResults<R::Pad>>> {
    let [piece] = pieces else {
        return None;
    };
    let pad = record.pad();
    let root = pad.root();
    if *record != root {
        return None;
    }

    let key = cache_key(prefix, piece);
    pad.virtual_cache().get_or_create(root.path(), &key, || {
        let query = deserialize_query::<<R::Pad as Pad>::Query>(pad, piece)?;
        QueryResults::new(query, QueryId::from_raw(*piece), prefix)
    })
}
