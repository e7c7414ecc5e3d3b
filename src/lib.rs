//! limit-dependencies - freeze query results so page rebuilds depend on what
//! a query matched, not on everything it scanned.
//!
//! # Module Structure
//!
//! ```text
//! src/
//! ├── config/     # PluginConfig from configs/limit-dependencies.toml
//! ├── host/       # Traits the site generator implements, VirtualCache
//! ├── query/      # Query identities and the replay-only FrozenQuery
//! ├── results/    # QueryResults virtual source and its checksum
//! ├── filter.rs   # `limit_dependencies` template filter
//! ├── resolve.rs  # `/@limit-dependencies/<id>` resolver
//! ├── plugin.rs   # Registration with the host environment
//! ├── error.rs    # Crate error type
//! └── logger.rs   # log!/debug! macros
//! ```
//!
//! # Flow
//!
//! ```text
//! template: query | limit_dependencies
//!     │
//!     ├── serialize_query ───────────▶ QueryId
//!     ├── pad.virtual_cache() ───────▶ QueryResults (ids frozen once)
//!     ├── record_virtual_dependency ─▶ build context sees one checksum
//!     └── FrozenQuery ───────────────▶ template iterates the frozen ids
//! ```

pub mod config;
pub mod error;
pub mod filter;
pub mod host;
pub mod logger;
pub mod plugin;
pub mod query;
pub mod resolve;
pub mod results;

#[cfg(test)]
mod testing;

pub use config::PluginConfig;
pub use error::{Error, Result};
pub use filter::limit_dependencies;
pub use plugin::LimitDependencies;
pub use query::{FrozenQuery, QueryId, deserialize_query, serialize_query};
pub use resolve::resolve_virtual_path;
pub use results::{ContentHash, QueryResults};
