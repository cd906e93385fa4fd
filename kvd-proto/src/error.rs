//! Parse errors, grounded on the thiserror-enum idiom used throughout the
//! teacher's codec boundaries (`psql-srv/src/codec/error.rs`).

use thiserror::Error;

/// Failures from [`crate::parser::Parser::step`]. Every variant closes the
/// client per `spec.md` §7's "Protocol framing error" disposition.
#[derive(Debug, Error)]
pub enum ParseError {
    /// An inline line exceeded `MAX_INLINE` bytes without a terminating
    /// `\n`.
    #[error("too big inline cmd")]
    TooBigInline,
    /// A bulk argument declared a length greater than `MAX_BULK`.
    #[error("too big bulk cmd")]
    TooBigBulk,
    /// A bulk argument header line didn't start with `$`.
    #[error("expected '$' bulk length header")]
    BadBulkHeader,
    /// A bulk payload wasn't followed by `\r\n`.
    #[error("bad bulk terminator")]
    BadTerminator,
    /// A `*N` or `$N` header's length field didn't parse as an integer.
    #[error("bad integer in header: {0}")]
    BadInteger(#[from] std::num::ParseIntError),
}
