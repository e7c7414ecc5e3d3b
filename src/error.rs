//! Crate-level error type.
//!
//! Expected misses (unresolvable identities, non-query filter input) are not
//! errors: they surface as `None` or as the host's undefined value. Only
//! failures outside this crate's control end up here.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors that propagate to the host.
#[derive(Debug, Error)]
pub enum Error {
    /// The host's query type refused to serialize.
    #[error("failed to encode query identity")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
