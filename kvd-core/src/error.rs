//! Error types for the core crate, grounded on the thiserror-enum idiom the
//! teacher uses at every subsystem boundary (e.g. `psql-srv`'s
//! `DecodeError`/`EncodeError`).

use thiserror::Error;

/// Errors surfaced by [`crate::dict::Dict`].
///
/// Mirrors `original_source/obj/dict.go`'s `ErrExpand`/`ErrExist`/
/// `ErrNotExist` sentinel errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DictError {
    /// `expand` was called while already rehashing, or the primary table is
    /// already at least as large as the requested size.
    #[error("dict is already rehashing or already large enough")]
    Expand,
    /// `add` was called for a key that already has an entry.
    #[error("key already exists")]
    Exists,
    /// `delete`/`find`-adjacent operation found no entry for the key.
    #[error("key does not exist")]
    NotExist,
}
