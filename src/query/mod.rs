//! Query identities and the replay-only view returned to templates.

mod frozen;
mod serialize;

pub use frozen::{FrozenQuery, record_paths};
pub use serialize::{
    DecodeError, QUERY_FORMAT_VERSION, QueryId, deserialize_query, serialize_query,
    try_deserialize_query,
};
