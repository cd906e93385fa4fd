//! Command dispatch: name/arity lookup and execution against the keyspace.
//!
//! Grounded on `original_source/redis.go`'s `cmdTable`, `lookupCommand`,
//! `getCommand`/`setCommand`/`expireCommand`, and `ProcessCommand`'s arity
//! check.

use kvd_core::{Keyspace, Value};
use kvd_proto::reply;

use crate::error::DispatchError;

/// What the event loop should do after a command has been dispatched.
pub enum Outcome {
    /// Enqueue this reply on the client's reply queue.
    Reply(Value),
    /// The literal `quit` command: close the client without a reply.
    Quit,
}

/// Execute one decoded command against `keyspace`. `args[0]` is the
/// command name; `args[1..]` are its operands. Every error path reaches
/// the client as a textual `-ERR: <msg>\r\n` reply rather than closing the
/// connection, per `spec.md` §7.
pub fn dispatch(keyspace: &mut Keyspace, now_ms: i64, args: &[Value]) -> Outcome {
    let Some(name) = args.first().and_then(Value::as_str_bytes) else {
        return Outcome::Reply(error_reply(DispatchError::UnknownCommand));
    };

    if name.as_ref() == b"quit" {
        return Outcome::Quit;
    }

    let result = match name.as_ref() {
        b"get" => cmd_get(keyspace, now_ms, args),
        b"set" => cmd_set(keyspace, args),
        b"expire" => cmd_expire(keyspace, now_ms, args),
        _ => Err(DispatchError::UnknownCommand),
    };

    match result {
        Ok(reply) => Outcome::Reply(reply),
        Err(err) => Outcome::Reply(error_reply(err)),
    }
}

fn error_reply(err: DispatchError) -> Value {
    metrics::counter!("kvd_commands_errors_total", "kind" => err.metric_label()).increment(1);
    reply::error(&err.to_string())
}

fn cmd_get(keyspace: &mut Keyspace, now_ms: i64, args: &[Value]) -> Result<Value, DispatchError> {
    if args.len() != 2 {
        return Err(DispatchError::WrongArity);
    }
    metrics::counter!("kvd_commands_total", "command" => "get").increment(1);
    match keyspace.get(&args[1], now_ms) {
        None => Ok(reply::nil()),
        Some(Value::Str(bytes)) => Ok(reply::bulk(bytes)),
        Some(_) => Err(DispatchError::WrongType),
    }
}

fn cmd_set(keyspace: &mut Keyspace, args: &[Value]) -> Result<Value, DispatchError> {
    if args.len() != 3 {
        return Err(DispatchError::WrongArity);
    }
    metrics::counter!("kvd_commands_total", "command" => "set").increment(1);
    keyspace.set(args[1].to_owned_str(), args[2].to_owned_str());
    Ok(reply::ok())
}

fn cmd_expire(keyspace: &mut Keyspace, now_ms: i64, args: &[Value]) -> Result<Value, DispatchError> {
    if args.len() != 3 {
        return Err(DispatchError::WrongArity);
    }
    metrics::counter!("kvd_commands_total", "command" => "expire").increment(1);
    let seconds = args[2].as_int().ok_or(DispatchError::WrongType)?;
    keyspace.set_expire_at(args[1].to_owned_str(), now_ms + seconds * 1000);
    Ok(reply::ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(v: &str) -> Value {
        Value::str(v.to_string())
    }

    fn as_str(v: &Value) -> &str {
        std::str::from_utf8(v.as_str_bytes().unwrap()).unwrap()
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut ks = Keyspace::new();
        match dispatch(&mut ks, 0, &[s("set"), s("foo"), s("bar")]) {
            Outcome::Reply(v) => assert_eq!(as_str(&v), "+OK\r\n"),
            Outcome::Quit => panic!("expected Reply"),
        }
        match dispatch(&mut ks, 0, &[s("get"), s("foo")]) {
            Outcome::Reply(v) => assert_eq!(as_str(&v), "$3\r\nbar\r\n"),
            Outcome::Quit => panic!("expected Reply"),
        }
    }

    #[test]
    fn get_missing_key_is_nil() {
        let mut ks = Keyspace::new();
        match dispatch(&mut ks, 0, &[s("get"), s("missing")]) {
            Outcome::Reply(v) => assert_eq!(as_str(&v), "$-1\r\n"),
            Outcome::Quit => panic!("expected Reply"),
        }
    }

    #[test]
    fn expire_zero_then_get_is_nil() {
        let mut ks = Keyspace::new();
        dispatch(&mut ks, 0, &[s("set"), s("k"), s("v")]);
        dispatch(&mut ks, 0, &[s("expire"), s("k"), s("0")]);
        match dispatch(&mut ks, 1000, &[s("get"), s("k")]) {
            Outcome::Reply(v) => assert_eq!(as_str(&v), "$-1\r\n"),
            Outcome::Quit => panic!("expected Reply"),
        }
    }

    #[test]
    fn unknown_command_is_error() {
        let mut ks = Keyspace::new();
        match dispatch(&mut ks, 0, &[s("notacmd")]) {
            Outcome::Reply(v) => assert_eq!(as_str(&v), "-ERR: unknow command\r\n"),
            Outcome::Quit => panic!("expected Reply"),
        }
    }

    #[test]
    fn wrong_arity_is_error() {
        let mut ks = Keyspace::new();
        match dispatch(&mut ks, 0, &[s("set"), s("only")]) {
            Outcome::Reply(v) => assert_eq!(as_str(&v), "-ERR: wrong number of args\r\n"),
            Outcome::Quit => panic!("expected Reply"),
        }
    }

    #[test]
    fn quit_closes_without_reply() {
        let mut ks = Keyspace::new();
        assert!(matches!(dispatch(&mut ks, 0, &[s("quit")]), Outcome::Quit));
    }
}
