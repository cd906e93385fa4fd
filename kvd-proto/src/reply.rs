//! Reply encoding: turns command outcomes into the tagged `STRING` values
//! queued on a client's reply queue.
//!
//! Grounded on `original_source/redis.go`'s `SendReplyToClient` and the
//! `+OK`/`$-1`/`$<len>`/`-ERR:` literals scattered through `getCommand` /
//! `setCommand` / `expireCommand`. Per `spec.md` §9's response-formatting
//! open question, bulk replies use the standard `$<len>\r\n<payload>\r\n`
//! framing (length and payload separated by `\r\n`), not the original's
//! `$<len><payload>\r\n`.

use bytes::{BufMut, BytesMut};
use kvd_core::Value;

/// `+OK\r\n`
pub fn ok() -> Value {
    Value::str(&b"+OK\r\n"[..])
}

/// `$-1\r\n`, the nil bulk reply for an absent or expired key.
pub fn nil() -> Value {
    Value::str(&b"$-1\r\n"[..])
}

/// `$<len>\r\n<payload>\r\n`
pub fn bulk(payload: &[u8]) -> Value {
    let mut buf = BytesMut::with_capacity(payload.len() + 16);
    buf.put_slice(b"$");
    buf.put_slice(payload.len().to_string().as_bytes());
    buf.put_slice(b"\r\n");
    buf.put_slice(payload);
    buf.put_slice(b"\r\n");
    Value::str(buf.freeze())
}

/// `-ERR: <msg>\r\n`
pub fn error(msg: &str) -> Value {
    let mut buf = BytesMut::with_capacity(msg.len() + 9);
    buf.put_slice(b"-ERR: ");
    buf.put_slice(msg.as_bytes());
    buf.put_slice(b"\r\n");
    Value::str(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_str(v: &Value) -> &str {
        std::str::from_utf8(v.as_str_bytes().unwrap()).unwrap()
    }

    #[test]
    fn ok_is_literal() {
        assert_eq!(as_str(&ok()), "+OK\r\n");
    }

    #[test]
    fn nil_is_literal() {
        assert_eq!(as_str(&nil()), "$-1\r\n");
    }

    #[test]
    fn bulk_uses_standard_len_crlf_payload_framing() {
        assert_eq!(as_str(&bulk(b"bar")), "$3\r\nbar\r\n");
    }

    #[test]
    fn error_wraps_message() {
        assert_eq!(as_str(&error("unknow command")), "-ERR: unknow command\r\n");
    }
}
