//! Query identities: a query descriptor encoded as a URL-safe string.
//!
//! The descriptor is cloned with its pad cleared, wrapped in a small
//! versioned envelope, encoded as JSON and then as URL-safe base64. Decoding
//! reverses the steps and reattaches a pad.
//!
//! Identities are not canonical. Two equivalent descriptors may encode to
//! different strings, but every identity decodes to an equivalent
//! descriptor. Compare decoded queries, never identity strings.

use base64::{Engine, engine::general_purpose::URL_SAFE};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::debug;
use crate::error::Result;
use crate::host::Query;

/// Bumped whenever the envelope layout changes. Older identities then decode
/// to "not found" instead of to a misread query.
pub const QUERY_FORMAT_VERSION: u32 = 1;

/// Printable, URL-safe identity of a query descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryId(String);

impl QueryId {
    /// Wrap an already-encoded identity string without checking it.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for QueryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, Q> {
    v: u32,
    kind: &'a str,
    query: &'a Q,
}

#[derive(Deserialize)]
struct Envelope {
    v: u32,
    kind: String,
    query: serde_json::Value,
}

/// Why an identity string could not be turned back into a query.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("identity is not ASCII")]
    NotAscii,

    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("malformed envelope: {0}")]
    Envelope(#[source] serde_json::Error),

    #[error("format version {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("encoded value is a `{found}`, not a `{expected}`")]
    NotAQuery {
        found: String,
        expected: &'static str,
    },

    #[error("malformed query: {0}")]
    Query(#[source] serde_json::Error),
}

/// Encode a query into its identity.
///
/// Fails only if the query type's own `Serialize` impl fails.
pub fn serialize_query<Q: Query>(query: &Q) -> Result<QueryId> {
    let mut detached = query.clone();
    detached.set_pad(None);

    let json = serde_json::to_vec(&EnvelopeRef {
        v: QUERY_FORMAT_VERSION,
        kind: Q::KIND,
        query: &detached,
    })?;
    Ok(QueryId(URL_SAFE.encode(json)))
}

/// Decode an identity, reporting why it failed.
pub fn try_deserialize_query<Q: Query>(pad: &Q::Pad, serialized: &str) -> Result<Q, DecodeError> {
    if !serialized.is_ascii() {
        return Err(DecodeError::NotAscii);
    }
    let bytes = URL_SAFE.decode(serialized)?;
    let envelope: Envelope = serde_json::from_slice(&bytes).map_err(DecodeError::Envelope)?;

    if envelope.v != QUERY_FORMAT_VERSION {
        return Err(DecodeError::VersionMismatch {
            found: envelope.v,
            expected: QUERY_FORMAT_VERSION,
        });
    }
    if envelope.kind != Q::KIND {
        return Err(DecodeError::NotAQuery {
            found: envelope.kind,
            expected: Q::KIND,
        });
    }

    let mut query: Q = serde_json::from_value(envelope.query).map_err(DecodeError::Query)?;
    query.set_pad(Some(pad.clone()));
    Ok(query)
}

/// Decode an identity, treating every failure as "no such query".
pub fn deserialize_query<Q: Query>(pad: &Q::Pad, serialized: &str) -> Option<Q> {
    match try_deserialize_query(pad, serialized) {
        Ok(query) => Some(query),
        Err(err) => {
            debug!("query"; "ignoring identity {:?}: {}", truncate(serialized), err);
            None
        }
    }
}

fn truncate(s: &str) -> &str {
    match s.char_indices().nth(48) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
