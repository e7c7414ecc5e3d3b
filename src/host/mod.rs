//! Seams into the host site generator.
//!
//! The host owns the content tree, the query engine, dependency tracking and
//! the incremental builder. This crate only talks to them through the traits
//! below, so any generator that implements them can load the plugin.
//!
//! ```text
//! Environment ──registers──▶ filter + virtual path resolver
//!      │
//!     Pad (one data-tree revision)
//!      ├── root() / get()      records
//!      ├── virtual_cache()     per-revision get-or-create cache
//!      └── dependency hooks    suspend recording, record virtual sources
//! ```

pub mod cache;

pub use cache::VirtualCache;

use serde::{Serialize, de::DeserializeOwned};
use std::sync::Arc;

use crate::error::Result;
use crate::query::FrozenQuery;
use crate::results::ContentHash;

/// A versioned view of all content records (one build attempt).
pub trait Pad: Clone + Send + Sync + 'static {
    type Record: Record<Pad = Self>;
    type Query: Query<Pad = Self>;

    /// The root record of the tree. Reading it may register a dependency.
    fn root(&self) -> Self::Record;

    /// Look up a record by path and alternative.
    fn get(&self, path: &str, alt: Option<&str>) -> Option<Self::Record>;

    /// Cache for virtual sources derived from this revision.
    fn virtual_cache(&self) -> &VirtualCache;

    /// Run `f` with dependency recording suspended for the active build context.
    fn without_dependencies<R>(&self, f: impl FnOnce() -> R) -> R;

    /// Register `source` with the active build context.
    ///
    /// Returns `false` when no build context is active.
    fn record_virtual_dependency(&self, source: &dyn VirtualSource) -> bool;
}

/// A content item in the tree.
pub trait Record: PartialEq + Send + Sync + 'static {
    type Pad: Pad<Record = Self>;

    fn pad(&self) -> &Self::Pad;

    /// Absolute path (`/` for the root).
    fn path(&self) -> &str;

    /// Identifier relative to the parent record.
    fn id(&self) -> &str;
}

/// A query descriptor: children of a record, filtered, ordered and sliced.
///
/// The pad back-reference is not part of the serialized form; the rest of
/// the descriptor must round-trip through serde.
pub trait Query: Clone + Serialize + DeserializeOwned + Send + Sync + 'static {
    type Pad: Pad<Query = Self>;

    /// Type tag stored alongside the encoded descriptor.
    const KIND: &'static str;

    fn pad(&self) -> Option<&Self::Pad>;

    fn set_pad(&mut self, pad: Option<Self::Pad>);

    /// Path of the record whose children are queried.
    fn path(&self) -> &str;

    fn alt(&self) -> Option<&str>;

    /// Evaluate the query against its pad, returning matched ids in order.
    fn result_ids(&self) -> Vec<String>;
}

/// Something the host's freshness check can depend on.
pub trait VirtualSource: Send + Sync {
    /// Virtual path (`/@<prefix>/<rest>`).
    fn path(&self) -> &str;

    fn checksum(&self) -> ContentHash;
}

/// The host's template value type.
pub trait TemplateValue<P: Pad>: Sized {
    /// The query inside this value, if it is one.
    fn as_query(&self) -> Option<&P::Query>;

    /// The host's undefined marker, carrying a hint for error messages.
    fn undefined(hint: String) -> Self;

    /// Wrap a replay-only query view.
    fn frozen(query: FrozenQuery<P>) -> Self;
}

pub type BoxedFilter<V> = Box<dyn Fn(&V) -> Result<V> + Send + Sync>;

pub type BoxedResolver<R> =
    Box<dyn Fn(&R, &[&str]) -> Option<Arc<dyn VirtualSource>> + Send + Sync>;

/// Plugin registration surface of the host environment.
pub trait Environment {
    type Pad: Pad;
    type Value: TemplateValue<Self::Pad>;

    fn register_filter(&mut self, name: &str, filter: BoxedFilter<Self::Value>);

    fn register_virtual_path_resolver(
        &mut self,
        prefix: &str,
        resolver: BoxedResolver<<Self::Pad as Pad>::Record>,
    );
}
