//! The `limit_dependencies` template filter.

use std::fmt::Debug;
use std::sync::Arc;

use crate::debug;
use crate::error::Result;
use crate::host::{Pad, Query, Record, TemplateValue, VirtualSource};
use crate::query::{FrozenQuery, serialize_query};
use crate::results::{QueryResults, cache_key};

/// Freeze a live query.
///
/// Non-query input yields the host's undefined value, so one bad template
/// expression does not fail the build. For a query, the frozen results are
/// fetched from (or created in) the pad's cache, registered with the active
/// build context and handed back as a [`FrozenQuery`].
///
/// Results are cached per pad, so changes to what the query would match go
/// unnoticed until the host starts a new pad.
pub fn limit_dependencies<P, V>(value: &V, prefix: &str) -> Result<V>
where
    P: Pad,
    V: TemplateValue<P> + Debug,
{
    let Some(query) = value.as_query() else {
        return Ok(V::undefined(format!(
            "limit_dependencies expected a query, not {value:?}"
        )));
    };
    let Some(pad) = query.pad() else {
        return Ok(V::undefined(format!(
            "limit_dependencies got a query for `{}` that is not bound to a pad",
            query.path()
        )));
    };

    let id = serialize_query(query)?;
    let root = pad.without_dependencies(|| pad.root());
    let key = cache_key(prefix, id.as_str());
    let Some(results) = pad.virtual_cache().get_or_create(root.path(), &key, || {
        QueryResults::<P>::new(query.clone(), id.clone(), prefix)
    }) else {
        return Ok(V::undefined(format!(
            "limit_dependencies could not freeze the query for `{}`",
            query.path()
        )));
    };

    if !pad.record_virtual_dependency(&*results) {
        debug!("filter"; "no active build context for {}", results.path());
    }

    let ids = Arc::clone(results.matched_ids());
    Ok(V::frozen(FrozenQuery::new(
        query.path(),
        pad.clone(),
        ids,
        query.alt().map(str::to_owned),
    )))
}
