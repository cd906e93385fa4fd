//! Per-connection state: the growing query buffer, the streaming parser,
//! and the pending reply queue.
//!
//! Grounded on `original_source/redis.go`'s `RedisClient` struct
//! (`QueryBuf`/`QueryBufPos`/`Reply`/`SentLen`) and `spec.md` §3's "Client
//! session" data model entry.

use std::net::TcpStream;
use std::os::unix::io::{AsRawFd, RawFd};

use kvd_core::{ReplyQueue, Value};
use kvd_proto::{Parser, MAX_BULK};

const INITIAL_QUERY_BUF: usize = 16384;

/// A growing byte buffer that always keeps at least `MAX_BULK` bytes of
/// spare tail capacity, per `spec.md` §5's resource bounds.
#[derive(Debug)]
pub struct QueryBuffer {
    buf: Vec<u8>,
    used: usize,
}

impl Default for QueryBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryBuffer {
    pub fn new() -> Self {
        QueryBuffer {
            buf: vec![0u8; INITIAL_QUERY_BUF],
            used: 0,
        }
    }

    /// The filled prefix: bytes read from the socket but not yet consumed
    /// by the parser.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.used]
    }

    /// A writable tail, growing the buffer first if its free tail has
    /// fallen below `MAX_BULK`.
    pub fn spare_mut(&mut self) -> &mut [u8] {
        if self.buf.len() - self.used < MAX_BULK {
            let grown = self.buf.len() + MAX_BULK;
            self.buf.resize(grown, 0);
        }
        &mut self.buf[self.used..]
    }

    /// Record that `n` freshly read bytes now occupy the front of the
    /// spare tail.
    pub fn commit(&mut self, n: usize) {
        self.used += n;
    }

    /// Drop `n` bytes the parser has fully consumed from the front,
    /// shifting any trailing bytes of the next request down to index 0.
    pub fn drain(&mut self, n: usize) {
        debug_assert!(n <= self.used);
        self.buf.copy_within(n..self.used, 0);
        self.used -= n;
    }
}

/// One connected client.
pub struct Client {
    pub stream: TcpStream,
    pub query: QueryBuffer,
    pub parser: Parser,
    pub replies: ReplyQueue,
    /// Bytes of the head reply node already written to the socket.
    pub sent_len: usize,
}

impl Client {
    pub fn new(stream: TcpStream) -> Self {
        Client {
            stream,
            query: QueryBuffer::new(),
            parser: Parser::new(),
            replies: ReplyQueue::new(),
            sent_len: 0,
        }
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    /// Enqueue a reply value. Returns whether the queue was empty before
    /// this call (i.e. whether the caller needs to register WRITE
    /// interest).
    pub fn queue_reply(&mut self, value: Value) -> bool {
        let was_empty = self.replies.is_empty();
        self.replies.append(value);
        was_empty
    }
}
