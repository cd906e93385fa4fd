//! The tagged value type backing every key and every value in the keyspace.

use bytes::Bytes;

use crate::list::List;

/// A discriminated value carrying one of the three supported payload
/// shapes. Replaces the original's untyped payload field plus runtime type
/// assertions (`RedisObj.Val interface{}` in `original_source/obj/obj.go`)
/// with an explicit, exhaustively-matched sum type.
#[derive(Debug)]
pub enum Value {
    /// An immutable byte string. Integers are stored in their decimal string
    /// form, matching the original's `CreateFromInt` helper.
    Str(Bytes),
    /// A list value. Not reachable from the wire protocol in this system
    /// (no `LPUSH`/`RPUSH` command is specified) but kept as a first-class
    /// variant because the data model names it and the reply queue reuses
    /// the same [`List`] type.
    List(List<Value>),
    /// A dict value. Not reachable from the wire protocol either; kept for
    /// the same reason as `List`.
    Dict(Box<crate::dict::Dict>),
}

impl Value {
    /// Construct a string value from anything that converts into `Bytes`.
    pub fn str(bytes: impl Into<Bytes>) -> Self {
        Value::Str(bytes.into())
    }

    /// Construct a string value holding the decimal form of an integer,
    /// mirroring the original's `CreateFromInt`.
    pub fn from_int(n: i64) -> Self {
        Value::Str(Bytes::from(n.to_string()))
    }

    /// The value's type tag, for error messages and dispatch.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
        }
    }

    /// Borrow the string payload, or `None` if this isn't a `Str`.
    pub fn as_str_bytes(&self) -> Option<&Bytes> {
        match self {
            Value::Str(b) => Some(b),
            _ => None,
        }
    }

    /// Parse the string payload as a base-10 `i64`, or `None` if this isn't
    /// a `Str` or isn't parseable. Mirrors the original's lenient `IntVal`
    /// (which ignores parse errors and returns 0); callers here are
    /// expected to treat `None` as a protocol error instead.
    pub fn as_int(&self) -> Option<i64> {
        let b = self.as_str_bytes()?;
        std::str::from_utf8(b).ok()?.parse().ok()
    }

    /// Copy the string payload into a fresh, owned `Value::Str`. `Value`
    /// itself isn't `Clone` (a `List`/`Dict` variant would need a deep copy
    /// of the whole structure), but `Bytes`'s cheap refcounted clone makes
    /// this worth exposing for the common case of holding a borrowed dict
    /// key/value or wire argument that needs to outlive the borrow.
    ///
    /// Panics if called on a `List`/`Dict` variant; every current caller
    /// only ever holds dict keys/values or wire command arguments, which
    /// are always `Str`.
    pub fn to_owned_str(&self) -> Value {
        Value::Str(self.as_str_bytes().expect("value is not a Str").clone())
    }
}

/// Equality is defined only for `Str` values: the hash table never keys on
/// `List`/`Dict` values, per `spec.md` §3.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Value {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn str_equality_ignores_other_variants() {
        let a = Value::str("k");
        let b = Value::str("k");
        assert_eq!(a, b);
        assert_ne!(Value::str("k"), Value::str("v"));
    }

    #[test]
    fn from_int_round_trips_through_as_int() {
        let v = Value::from_int(-42);
        assert_eq!(v.as_int(), Some(-42));
    }

    #[test]
    fn type_name_reports_non_string_variants() {
        assert_eq!(Value::List(List::new()).type_name(), "list");
    }
}
