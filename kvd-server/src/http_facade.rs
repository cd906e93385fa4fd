//! The auxiliary HTTP admin facade, running on the same loop as the
//! client-protocol listener (`spec.md` §9's option (b), promoted to a full
//! module per `SPEC_FULL.md` §4.6).
//!
//! Grounded on `original_source/http/http.go`'s three routes and on
//! `other_examples/6f758b08_warpy-ai-script__examples-http_server_httparse.rs.rs`
//! for the "accumulate into a buffer, parse with `httparse`" connection
//! shape.

use std::net::TcpStream;
use std::os::unix::io::{AsRawFd, RawFd};

use kvd_core::{Keyspace, Value};

const MAX_HEADERS: usize = 16;
const MAX_REQUEST: usize = 16384;

/// One accepted HTTP facade connection.
pub struct HttpConn {
    pub stream: TcpStream,
    buf: Vec<u8>,
}

impl HttpConn {
    pub fn new(stream: TcpStream) -> Self {
        HttpConn {
            stream,
            buf: Vec::with_capacity(1024),
        }
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn buf_mut(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    /// Try to parse one complete request out of the accumulated buffer and
    /// build its response. Returns `None` if more bytes are needed (or the
    /// buffer exceeds `MAX_REQUEST`, in which case the caller should close
    /// the connection).
    pub fn try_handle(&mut self, keyspace: &mut Keyspace, now_ms: i64) -> Option<Vec<u8>> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let status = req.parse(&self.buf).ok()?;
        let httparse::Status::Complete(header_len) = status else {
            if self.buf.len() > MAX_REQUEST {
                return Some(response(400, "request too large"));
            }
            return None;
        };

        let content_length = req
            .headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case("content-length"))
            .and_then(|h| std::str::from_utf8(h.value).ok())
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_end = header_len + content_length;
        if self.buf.len() < body_end {
            return None;
        }

        let path = req.path.unwrap_or("").to_string();
        let body = self.buf[header_len..body_end].to_vec();
        self.buf.drain(..body_end);

        Some(route(&path, &body, keyspace, now_ms))
    }
}

fn route(path: &str, body: &[u8], keyspace: &mut Keyspace, now_ms: i64) -> Vec<u8> {
    let body = String::from_utf8_lossy(body);
    match path {
        "/key/get" => {
            let key = Value::str(body.trim().to_string());
            match keyspace.get(&key, now_ms) {
                None => response(200, "-1"),
                Some(Value::Str(bytes)) => {
                    response(200, &String::from_utf8_lossy(bytes))
                }
                Some(_) => response(200, "wrong type"),
            }
        }
        "/key/set" => match body.splitn(2, '|').collect::<Vec<_>>()[..] {
            [key, value] => {
                keyspace.set(Value::str(key.to_string()), Value::str(value.to_string()));
                response(200, "OK")
            }
            _ => response(400, "expected <key>|<value>"),
        },
        "/key/expire" => match body.splitn(2, '|').collect::<Vec<_>>()[..] {
            [key, seconds] => match seconds.trim().parse::<i64>() {
                Ok(seconds) => {
                    let key = Value::str(key.to_string());
                    if keyspace.get(&key, now_ms).is_none() {
                        return response(200, "-1");
                    }
                    keyspace.set_expire_at(key, now_ms + seconds * 1000);
                    response(200, "OK")
                }
                Err(_) => response(200, "-1"),
            },
            _ => response(400, "expected <key>|<seconds>"),
        },
        _ => response(404, "not found"),
    }
}

fn response(status: u16, body: &str) -> Vec<u8> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        _ => "Error",
    };
    format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len(),
    )
    .into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips_over_http() {
        let mut ks = Keyspace::new();
        let reply = route("/key/set", b"foo|bar", &mut ks, 0);
        assert!(String::from_utf8_lossy(&reply).contains("OK"));
        let reply = route("/key/get", b"foo", &mut ks, 0);
        assert!(String::from_utf8_lossy(&reply).ends_with("bar"));
    }

    #[test]
    fn get_missing_key_is_negative_one() {
        let mut ks = Keyspace::new();
        let reply = route("/key/get", b"missing", &mut ks, 0);
        assert!(String::from_utf8_lossy(&reply).ends_with("-1"));
    }

    #[test]
    fn unknown_route_is_404() {
        let mut ks = Keyspace::new();
        let reply = route("/nope", b"", &mut ks, 0);
        assert!(String::from_utf8_lossy(&reply).starts_with("HTTP/1.1 404"));
    }

    #[test]
    fn expire_on_missing_key_is_negative_one_and_sets_nothing() {
        let mut ks = Keyspace::new();
        let reply = route("/key/expire", b"missing|60", &mut ks, 0);
        assert!(String::from_utf8_lossy(&reply).ends_with("-1"));
        assert!(!ks.expire.contains_key(&Value::str("missing")));
    }

    #[test]
    fn expire_on_existing_key_sets_expiry() {
        let mut ks = Keyspace::new();
        route("/key/set", b"foo|bar", &mut ks, 0);
        let reply = route("/key/expire", b"foo|60", &mut ks, 0);
        assert!(String::from_utf8_lossy(&reply).ends_with("OK"));
        assert!(ks.expire.contains_key(&Value::str("foo")));
    }
}
