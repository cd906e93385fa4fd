//! Server wiring: owns the event loop, the client table, the keyspace, and
//! (optionally) the HTTP facade. No process-wide mutable singleton
//! (`spec.md` §9): every handler is dispatched as `&mut self`.
//!
//! Grounded on `original_source/redis.go`'s `main`/`initServer`/
//! `AcceptHandler`/`SendReplyToClient`/`ProcessQueryBuf`.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::os::unix::io::{AsRawFd, RawFd};

use kvd_core::clock::now_ms;
use kvd_core::{Keyspace, Value};
use kvd_proto::Progress;

use crate::client::Client;
use crate::config::ServerConfig;
use crate::dispatch::{self, Outcome};
use crate::event_loop::{Direction, EventLoop, TimerKind};
use crate::handler::HandlerKind;
use crate::http_facade::HttpConn;

/// The server: one listen socket, an optional HTTP facade listen socket,
/// a client table keyed by fd, the keyspace, and the reactor.
pub struct Server {
    event_loop: EventLoop,
    listener: TcpListener,
    http_listener: Option<TcpListener>,
    clients: HashMap<RawFd, Client>,
    http_conns: HashMap<RawFd, HttpConn>,
    keyspace: Keyspace,
}

impl Server {
    /// Bind the listen socket(s) and register the accept/cron handlers.
    /// Only startup failures (bind, epoll creation) are fatal, per
    /// `spec.md` §7.
    pub fn bind(config: &ServerConfig) -> io::Result<Self> {
        let addr: SocketAddr = ([0, 0, 0, 0], config.port).into();
        let listener = TcpListener::bind(addr)?;
        listener.set_nonblocking(true)?;

        let http_listener = match config.http_addr {
            Some(addr) => {
                let l = TcpListener::bind(addr)?;
                l.set_nonblocking(true)?;
                Some(l)
            }
            None => None,
        };

        let mut event_loop = EventLoop::new()?;
        event_loop.add_file_event(listener.as_raw_fd(), Direction::Read, HandlerKind::Accept)?;
        if let Some(http) = &http_listener {
            event_loop.add_file_event(http.as_raw_fd(), Direction::Read, HandlerKind::HttpAccept)?;
        }
        event_loop.add_time_event(
            TimerKind::Periodic,
            config.cron_interval_ms as i64,
            HandlerKind::Cron,
        );

        Ok(Server {
            event_loop,
            listener,
            http_listener,
            clients: HashMap::new(),
            http_conns: HashMap::new(),
            keyspace: Keyspace::new(),
        })
    }

    /// Run until [`EventLoop::request_stop`] is called (only reachable
    /// today via a future admin hook; the process otherwise runs until
    /// killed).
    pub fn run(&mut self) -> io::Result<()> {
        while !self.event_loop.should_stop() {
            let ready = self.event_loop.poll_once()?;
            for kind in ready {
                self.dispatch_one(kind);
            }
        }
        Ok(())
    }

    fn dispatch_one(&mut self, kind: HandlerKind) {
        match kind {
            HandlerKind::Accept => self.accept_client(),
            HandlerKind::ClientRead(fd) => self.client_readable(fd),
            HandlerKind::ClientWrite(fd) => self.client_writable(fd),
            HandlerKind::Cron => crate::cron::tick(&mut self.keyspace, now_ms()),
            HandlerKind::HttpAccept => self.accept_http(),
            HandlerKind::HttpConn(fd) => self.http_readable(fd),
        }
    }

    fn accept_client(&mut self) {
        loop {
            match self.listener.accept() {
                Ok((stream, _addr)) => {
                    if stream.set_nonblocking(true).is_err() {
                        continue;
                    }
                    let fd = stream.as_raw_fd();
                    self.clients.insert(fd, Client::new(stream));
                    if self
                        .event_loop
                        .add_file_event(fd, Direction::Read, HandlerKind::ClientRead(fd))
                        .is_err()
                    {
                        self.clients.remove(&fd);
                        continue;
                    }
                    metrics::counter!("kvd_connections_accepted_total").increment(1);
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                    break;
                }
            }
        }
    }

    fn client_readable(&mut self, fd: RawFd) {
        let Some(client) = self.clients.get_mut(&fd) else {
            return;
        };
        let n = match client.stream.read(client.query.spare_mut()) {
            Ok(0) => {
                self.close_client(fd);
                return;
            }
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(_) => {
                self.close_client(fd);
                return;
            }
        };
        self.clients.get_mut(&fd).unwrap().query.commit(n);

        loop {
            let Some(client) = self.clients.get_mut(&fd) else { return };
            let step = client.parser.step(client.query.filled());
            match step {
                Ok(Progress::Suspended { consumed }) => {
                    client.query.drain(consumed);
                    break;
                }
                Ok(Progress::Ready { args, consumed }) => {
                    client.query.drain(consumed);
                    client.parser.reset();
                    if args.is_empty() {
                        // `*0\r\n` no-op (`spec.md` §9).
                        continue;
                    }
                    match dispatch::dispatch(&mut self.keyspace, now_ms(), &args) {
                        Outcome::Reply(reply) => self.enqueue_reply(fd, reply),
                        Outcome::Quit => {
                            self.close_client(fd);
                            return;
                        }
                    }
                }
                Err(err) => {
                    tracing::debug!(%err, "closing client on parse error");
                    self.close_client(fd);
                    return;
                }
            }
        }
    }

    fn enqueue_reply(&mut self, fd: RawFd, reply: Value) {
        let Some(client) = self.clients.get_mut(&fd) else {
            return;
        };
        let was_empty = client.queue_reply(reply);
        if was_empty {
            let _ = self
                .event_loop
                .add_file_event(fd, Direction::Write, HandlerKind::ClientWrite(fd));
        }
    }

    fn client_writable(&mut self, fd: RawFd) {
        loop {
            let Some(client) = self.clients.get_mut(&fd) else { return };
            let Some(head_id) = client.replies.head() else {
                let _ = self.event_loop.remove_file_event(fd, Direction::Write);
                return;
            };
            let head = client
                .replies
                .get(head_id)
                .expect("head() id is always live");
            let bytes = head.as_str_bytes().expect("reply queue only holds STRING values");
            let remaining = &bytes[client.sent_len..];
            match client.stream.write(remaining) {
                Ok(0) => {
                    self.close_client(fd);
                    return;
                }
                Ok(n) if n == remaining.len() => {
                    client.sent_len = 0;
                    client.replies.pop_front();
                    if client.replies.is_empty() {
                        let _ = self
                            .event_loop
                            .remove_file_event(fd, Direction::Write);
                        return;
                    }
                }
                Ok(n) => {
                    client.sent_len += n;
                    return;
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
                Err(_) => {
                    self.close_client(fd);
                    return;
                }
            }
        }
    }

    fn close_client(&mut self, fd: RawFd) {
        let _ = self.event_loop.remove_file_event(fd, Direction::Read);
        let _ = self.event_loop.remove_file_event(fd, Direction::Write);
        self.clients.remove(&fd);
    }

    fn accept_http(&mut self) {
        let Some(listener) = &self.http_listener else {
            return;
        };
        loop {
            match listener.accept() {
                Ok((stream, _addr)) => {
                    if stream.set_nonblocking(true).is_err() {
                        continue;
                    }
                    let fd = stream.as_raw_fd();
                    self.http_conns.insert(fd, HttpConn::new(stream));
                    let _ = self.event_loop.add_file_event(
                        fd,
                        Direction::Read,
                        HandlerKind::HttpConn(fd),
                    );
                }
                Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    tracing::warn!(error = %e, "http accept failed");
                    break;
                }
            }
        }
    }

    fn http_readable(&mut self, fd: RawFd) {
        let Some(conn) = self.http_conns.get_mut(&fd) else {
            return;
        };
        let mut chunk = [0u8; 4096];
        let n = match conn.stream.read(&mut chunk) {
            Ok(0) => {
                self.close_http(fd);
                return;
            }
            Ok(n) => n,
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(_) => {
                self.close_http(fd);
                return;
            }
        };
        conn.buf_mut().extend_from_slice(&chunk[..n]);

        let response = conn.try_handle(&mut self.keyspace, now_ms());
        if let Some(response) = response {
            let conn = self.http_conns.get_mut(&fd).unwrap();
            let _ = conn.stream.write_all(&response);
            self.close_http(fd);
        }
    }

    fn close_http(&mut self, fd: RawFd) {
        let _ = self.event_loop.remove_file_event(fd, Direction::Read);
        self.http_conns.remove(&fd);
    }

    /// Local address the client-protocol listener is bound to, for tests.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}
