//! Script values crossing the interpreter boundary.

use crate::octet::Octet;

/// A value as handed over by the embedding interpreter.
///
/// Only the shapes the crypto core consumes or produces are modelled; script
/// strings are raw bytes and convert losslessly to and from [`Octet`]s.
#[derive(Debug)]
pub enum Value {
    /// Absent argument or empty result
    Nil,
    /// Script boolean
    Boolean(bool),
    /// Script integer
    Integer(i64),
    /// Script string (arbitrary bytes)
    Str(Vec<u8>),
    /// Byte buffer
    Octet(Octet),
}

impl Value {
    /// Name of the value's kind, as reported in type errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Nil => "nil",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Str(_) => "string",
            Self::Octet(_) => "octet",
        }
    }

    /// True for [`Value::Nil`].
    pub fn is_nil(&self) -> bool {
        matches!(self, Self::Nil)
    }

    /// Integer payload, if any.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Boolean payload, if any.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Octet payload, if any.
    pub fn as_octet(&self) -> Option<&Octet> {
        match self {
            Self::Octet(octet) => Some(octet),
            _ => None,
        }
    }
}

impl From<Octet> for Value {
    fn from(octet: Octet) -> Self {
        Self::Octet(octet)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Str(s.as_bytes().to_vec())
    }
}

impl From<&[u8]> for Value {
    fn from(bytes: &[u8]) -> Self {
        Self::Str(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(Value::Nil.type_name(), "nil");
        assert_eq!(Value::from(true).type_name(), "boolean");
        assert_eq!(Value::from(7i64).type_name(), "integer");
        assert_eq!(Value::from("abc").type_name(), "string");
    }

    #[test]
    fn accessors_only_match_their_kind() {
        assert_eq!(Value::from(7i64).as_integer(), Some(7));
        assert_eq!(Value::from(false).as_integer(), None);
        assert_eq!(Value::from(false).as_boolean(), Some(false));
        assert!(Value::Nil.is_nil());
        assert!(Value::from("x").as_octet().is_none());
    }
}
