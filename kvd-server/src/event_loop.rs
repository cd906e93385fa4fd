//! A single-threaded readiness reactor over raw `epoll`.
//!
//! Grounded on `original_source/ae/ae_loop.go`, `ae_file_event.go`, and
//! `ae_time_event.go`, translated from Go's `golang.org/x/sys/unix` epoll
//! bindings to `libc`'s raw syscalls, in the style of the epoll plumbing in
//! `other_examples/6f758b08_warpy-ai-script__examples-http_server_httparse.rs.rs`.
//!
//! This type only owns registrations and the multiplexer fd; it does not
//! own the application state a ready handler needs to act on. One
//! iteration's worth of readiness is surfaced as an ordered
//! [`Vec<HandlerKind>`] via [`EventLoop::poll_once`] (timers first, in list
//! order; then files, in epoll's arrival order), and the caller (`Server`)
//! drives the loop and dispatches each entry against its own state. This
//! keeps the reactor itself free of any borrow on the server it serves.

use std::collections::HashMap;
use std::io;
use std::os::unix::io::RawFd;

use kvd_core::clock::now_ms;

use crate::handler::HandlerKind;

const MAX_EVENTS: usize = 128;
const MAX_WAIT_MS: i64 = 1000;
const MIN_WAIT_MS: i64 = 10;

/// Which readiness direction a registration is interested in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Read,
    Write,
}

/// Whether a timer fires once or repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Periodic,
    Oneshot,
}

#[derive(Default)]
struct Interest {
    read: Option<HandlerKind>,
    write: Option<HandlerKind>,
}

impl Interest {
    fn mask(&self) -> u32 {
        let mut m = 0u32;
        if self.read.is_some() {
            m |= libc::EPOLLIN as u32;
        }
        if self.write.is_some() {
            m |= libc::EPOLLOUT as u32;
        }
        m
    }

    fn is_empty(&self) -> bool {
        self.read.is_none() && self.write.is_none()
    }
}

struct Timer {
    id: u64,
    kind: TimerKind,
    interval_ms: i64,
    deadline_ms: i64,
    context: HandlerKind,
}

/// The reactor: an epoll fd, per-fd interest tables, and a timer list.
pub struct EventLoop {
    epfd: RawFd,
    interests: HashMap<RawFd, Interest>,
    /// A plain `Vec` rather than a linked list or min-heap: `spec.md` §9
    /// allows O(N) `remove(id)` for small N, which is what this system's
    /// timer count (client cron plus a couple of facade timers) actually
    /// is.
    timers: Vec<Timer>,
    next_timer_id: u64,
    stop: bool,
}

impl Drop for EventLoop {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.epfd);
        }
    }
}

impl EventLoop {
    /// Create the epoll instance backing this loop.
    pub fn new() -> io::Result<Self> {
        let epfd = unsafe { libc::epoll_create1(0) };
        if epfd < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(EventLoop {
            epfd,
            interests: HashMap::new(),
            timers: Vec::new(),
            next_timer_id: 1,
            stop: false,
        })
    }

    /// Request that [`Server::run`](crate::server::Server::run) exit after
    /// the current iteration.
    pub fn request_stop(&mut self) {
        self.stop = true;
    }

    pub fn should_stop(&self) -> bool {
        self.stop
    }

    /// Register interest in `direction` readiness on `fd`. Idempotent: if
    /// `direction` is already registered the call is a no-op.
    pub fn add_file_event(
        &mut self,
        fd: RawFd,
        direction: Direction,
        context: HandlerKind,
    ) -> io::Result<()> {
        let had_any = self.interests.contains_key(&fd);
        let entry = self.interests.entry(fd).or_default();
        let already_set = match direction {
            Direction::Read => entry.read.is_some(),
            Direction::Write => entry.write.is_some(),
        };
        if already_set {
            return Ok(());
        }
        match direction {
            Direction::Read => entry.read = Some(context),
            Direction::Write => entry.write = Some(context),
        }
        let mask = self.interests[&fd].mask();
        let op = if had_any {
            libc::EPOLL_CTL_MOD
        } else {
            libc::EPOLL_CTL_ADD
        };
        self.ctl(fd, op, mask)
    }

    /// Clear interest in `direction` on `fd`. If no interest remains, `fd`
    /// is removed from the multiplexer entirely.
    pub fn remove_file_event(&mut self, fd: RawFd, direction: Direction) -> io::Result<()> {
        let Some(entry) = self.interests.get_mut(&fd) else {
            return Ok(());
        };
        match direction {
            Direction::Read => entry.read = None,
            Direction::Write => entry.write = None,
        }
        if entry.is_empty() {
            self.interests.remove(&fd);
            self.ctl(fd, libc::EPOLL_CTL_DEL, 0)
        } else {
            let mask = self.interests[&fd].mask();
            self.ctl(fd, libc::EPOLL_CTL_MOD, mask)
        }
    }

    fn ctl(&self, fd: RawFd, op: libc::c_int, events: u32) -> io::Result<()> {
        let mut ev = libc::epoll_event { events, u64: fd as u64 };
        let rc = unsafe { libc::epoll_ctl(self.epfd, op, fd, &mut ev) };
        if rc < 0 && op != libc::EPOLL_CTL_DEL {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Schedule a timer whose first fire is at `now + interval_ms`. Returns
    /// a unique positive id usable with [`EventLoop::remove_time_event`].
    pub fn add_time_event(
        &mut self,
        kind: TimerKind,
        interval_ms: i64,
        context: HandlerKind,
    ) -> u64 {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.timers.push(Timer {
            id,
            kind,
            interval_ms,
            deadline_ms: now_ms() + interval_ms,
            context,
        });
        id
    }

    /// Cancel a pending timer by id. No-op if it already fired (oneshot)
    /// or was already cancelled.
    pub fn remove_time_event(&mut self, id: u64) {
        self.timers.retain(|t| t.id != id);
    }

    fn next_deadline(&self) -> Option<i64> {
        self.timers.iter().map(|t| t.deadline_ms).min()
    }

    /// Run one iteration: wait for readiness or a timer deadline, then
    /// return the ordered batch of handlers to invoke (timers in list
    /// order, then files in epoll's arrival order). Periodic timers are
    /// rescheduled here; oneshot timers are removed.
    pub fn poll_once(&mut self) -> io::Result<Vec<HandlerKind>> {
        let now = now_ms();
        let timeout_ms = match self.next_deadline() {
            Some(deadline) => {
                let to_timer = deadline - now;
                let to_timer = to_timer.min(MAX_WAIT_MS);
                if to_timer <= 0 {
                    MIN_WAIT_MS
                } else {
                    to_timer
                }
            }
            None => MAX_WAIT_MS,
        };

        let mut events: [libc::epoll_event; MAX_EVENTS] = unsafe { std::mem::zeroed() };
        let n = unsafe {
            libc::epoll_wait(
                self.epfd,
                events.as_mut_ptr(),
                MAX_EVENTS as libc::c_int,
                timeout_ms as libc::c_int,
            )
        };
        if n < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(Vec::new());
            }
            tracing::warn!(error = %err, "epoll_wait failed");
            return Ok(Vec::new());
        }

        let mut batch = Vec::new();

        let now = now_ms();
        let mut i = 0;
        while i < self.timers.len() {
            if self.timers[i].deadline_ms <= now {
                let timer = &self.timers[i];
                batch.push(timer.context.clone());
                match timer.kind {
                    TimerKind::Oneshot => {
                        self.timers.remove(i);
                        continue;
                    }
                    TimerKind::Periodic => {
                        let interval = self.timers[i].interval_ms;
                        self.timers[i].deadline_ms = now + interval;
                    }
                }
            }
            i += 1;
        }

        for ev in events.iter().take(n as usize) {
            let fd = ev.u64 as RawFd;
            let Some(entry) = self.interests.get(&fd) else {
                continue;
            };
            if ev.events & (libc::EPOLLIN as u32) != 0 {
                if let Some(ctx) = &entry.read {
                    batch.push(ctx.clone());
                }
            }
            if ev.events & (libc::EPOLLOUT as u32) != 0 {
                if let Some(ctx) = &entry.write {
                    batch.push(ctx.clone());
                }
            }
        }

        Ok(batch)
    }
}
