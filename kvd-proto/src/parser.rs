//! Streaming parser for the inline and bulk request framings.
//!
//! Grounded on `original_source/redis.go`'s `ProcessQueryBuf` /
//! `handleInlineBuf` / `handleBulkBuf`. The parser is a pure function of a
//! byte slice: it owns no socket and no buffer of its own, so it is
//! unit-testable against arbitrarily chunked input (`spec.md` Testable
//! Property 7). Callers own the query buffer; after each [`Parser::step`]
//! call they drain exactly `consumed` bytes and, on [`Progress::Ready`],
//! dispatch the argument vector and call [`Parser::reset`].

use kvd_core::Value;

use crate::error::ParseError;

/// A single inline line, or a single bulk payload value, must not exceed
/// this many bytes.
pub const MAX_INLINE: usize = 4096;
/// A single bulk-declared length must not exceed this many bytes.
pub const MAX_BULK: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing {
    Unknown,
    Inline,
    Bulk,
}

/// Outcome of one [`Parser::step`] call.
#[derive(Debug)]
pub enum Progress {
    /// No complete command yet; `consumed` bytes were fully parsed header
    /// tokens and may be safely dropped from the caller's buffer, but no
    /// more data is available to continue. The caller must wait for more
    /// bytes before calling `step` again.
    Suspended { consumed: usize },
    /// A complete command was decoded. Empty `args` means a bulk `*0\r\n`
    /// no-op (`spec.md` §9): the caller should simply reset and continue,
    /// without dispatching.
    Ready { args: Vec<Value>, consumed: usize },
}

/// Per-client streaming parse state. One instance per connection, reset
/// after every decoded command (`spec.md` §4.3's framing/bulk-counter
/// reset, which leaves the query buffer's trailing bytes untouched).
#[derive(Debug, Default)]
pub struct Parser {
    framing: Framing,
    /// `None` until the `*N` header is parsed.
    remaining: Option<u64>,
    /// `None` until the current argument's `$N` header is parsed.
    cur_len: Option<u64>,
    args: Vec<Value>,
}

impl Default for Framing {
    fn default() -> Self {
        Framing::Unknown
    }
}

impl Parser {
    /// A freshly reset parser, ready to classify the next command.
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear all per-command state, ready to classify the next command
    /// from whatever bytes remain in the caller's buffer.
    pub fn reset(&mut self) {
        self.framing = Framing::Unknown;
        self.remaining = None;
        self.cur_len = None;
        self.args.clear();
    }

    /// Attempt to advance parsing using `buf`, which holds only bytes not
    /// yet consumed by a prior `step` call.
    pub fn step(&mut self, buf: &[u8]) -> Result<Progress, ParseError> {
        if self.framing == Framing::Unknown {
            let Some(&first) = buf.first() else {
                return Ok(Progress::Suspended { consumed: 0 });
            };
            self.framing = if first == b'*' {
                Framing::Bulk
            } else {
                Framing::Inline
            };
        }
        match self.framing {
            Framing::Inline => self.step_inline(buf),
            Framing::Bulk => self.step_bulk(buf),
            Framing::Unknown => unreachable!("classified above"),
        }
    }

    fn step_inline(&mut self, buf: &[u8]) -> Result<Progress, ParseError> {
        let Some(nl) = buf.iter().position(|&b| b == b'\n') else {
            if buf.len() > MAX_INLINE {
                return Err(ParseError::TooBigInline);
            }
            return Ok(Progress::Suspended { consumed: 0 });
        };
        let line = &buf[..nl];
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let args = line
            .split(|&b| b == b' ' || b == b'\t')
            .filter(|tok| !tok.is_empty())
            .map(|tok| Value::str(tok.to_vec()))
            .collect();
        Ok(Progress::Ready {
            args,
            consumed: nl + 1,
        })
    }

    fn step_bulk(&mut self, buf: &[u8]) -> Result<Progress, ParseError> {
        let mut pos = 0usize;

        if self.remaining.is_none() {
            let Some((line, line_len)) = take_line(&buf[pos..]) else {
                return Ok(Progress::Suspended { consumed: pos });
            };
            // `line` includes the leading `*`.
            let n: u64 = std::str::from_utf8(&line[1..])
                .unwrap_or_default()
                .parse()
                .map_err(ParseError::BadInteger)?;
            pos += line_len;
            if n == 0 {
                return Ok(Progress::Ready {
                    args: Vec::new(),
                    consumed: pos,
                });
            }
            self.remaining = Some(n);
        }

        while self.remaining.unwrap_or(0) > 0 {
            if self.cur_len.is_none() {
                let Some((line, line_len)) = take_line(&buf[pos..]) else {
                    return Ok(Progress::Suspended { consumed: pos });
                };
                if line.first() != Some(&b'$') {
                    return Err(ParseError::BadBulkHeader);
                }
                let len: u64 = std::str::from_utf8(&line[1..])
                    .unwrap_or_default()
                    .parse()
                    .map_err(ParseError::BadInteger)?;
                if len as usize > MAX_BULK {
                    return Err(ParseError::TooBigBulk);
                }
                pos += line_len;
                self.cur_len = Some(len);
            }
            let len = self.cur_len.unwrap() as usize;
            let needed = len + 2;
            if buf.len() - pos < needed {
                return Ok(Progress::Suspended { consumed: pos });
            }
            let payload = &buf[pos..pos + len];
            let terminator = &buf[pos + len..pos + needed];
            if terminator != b"\r\n" {
                return Err(ParseError::BadTerminator);
            }
            self.args.push(Value::str(payload.to_vec()));
            pos += needed;
            self.cur_len = None;
            self.remaining = Some(self.remaining.unwrap() - 1);
        }

        Ok(Progress::Ready {
            args: std::mem::take(&mut self.args),
            consumed: pos,
        })
    }
}

/// Find the next `\n`-terminated line in `buf`, returning the line
/// (trailing `\r` stripped) and the number of bytes through and including
/// the `\n`.
fn take_line(buf: &[u8]) -> Option<(&[u8], usize)> {
    let nl = buf.iter().position(|&b| b == b'\n')?;
    let line = &buf[..nl];
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, nl + 1))
}
