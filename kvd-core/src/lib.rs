//! Pure in-memory data structures for the kvd keyspace: the tagged
//! [`Value`] union, the incrementally-rehashing [`Dict`], the slab-backed
//! [`List`], and the [`Keyspace`] that ties `data` and `expire` together.
//!
//! This crate does no I/O; it is grounded on `original_source/obj/` and
//! the `redisDB`/keyspace plumbing in `original_source/redis.go`.

pub mod clock;
pub mod dict;
pub mod error;
pub mod hash;
pub mod keyspace;
pub mod list;
pub mod value;

pub use dict::{Dict, Entry};
pub use error::DictError;
pub use keyspace::Keyspace;
pub use list::{List, NodeId, ReplyQueue};
pub use value::Value;
