//! Wire parsing and reply encoding for kvd's request protocol: inline and
//! bulk framings in, tagged `STRING` reply values out. No I/O; grounded on
//! `original_source/redis.go`'s parse/reply plumbing.

pub mod error;
pub mod parser;
pub mod reply;

pub use error::ParseError;
pub use parser::{Parser, Progress, MAX_BULK, MAX_INLINE};
