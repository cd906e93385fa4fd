//! Typed handler context, replacing the original's opaque `interface{}`
//! "extra" parameter (`spec.md` §9's "Handler context" redesign flag).

use std::os::unix::io::RawFd;

/// Both client connections and HTTP facade connections are identified by
/// their file descriptor, matching the original's fd-keyed client table.
pub type ClientId = RawFd;
pub type ConnId = RawFd;

/// What a ready file descriptor or fired timer should be dispatched to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerKind {
    /// The main listen socket is readable: accept a new client.
    Accept,
    /// A client socket is readable: feed bytes into its parser.
    ClientRead(ClientId),
    /// A client socket is writable: drain its reply queue.
    ClientWrite(ClientId),
    /// The active-expiration cron timer fired.
    Cron,
    /// The HTTP facade's listen socket is readable: accept a connection.
    HttpAccept,
    /// An HTTP facade connection is readable: feed bytes into its parser.
    HttpConn(ConnId),
}
