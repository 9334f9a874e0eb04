// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::rc::Rc;

use crate::{
    ecmascript::{execution::Agent, types::ObjectKind},
    heap::{FunctionIndex, ObjectIndex},
};

/// An ECMAScript value.
///
/// `Undefined` and `Null` are the process-wide sentinels: they carry no
/// payload, so every occurrence is the same value and comparing them is a
/// discriminant check.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    /// Numbers that are integral and fit in an i32. Arithmetic normalises
    /// into this variant whenever it can, see [`Value::from_f64`].
    Integer(i32),
    Number(f64),
    String(Rc<str>),
    Object(ObjectIndex),
    Function(FunctionIndex),
    /// The empty reference. Only emitted as a placeholder on paths that
    /// never complete normally, so programs never observe it.
    Empty,
}

impl Value {
    pub fn from_f64(value: f64) -> Self {
        let truncated = value as i32;
        if truncated as f64 == value && !(value == 0.0 && value.is_sign_negative()) {
            Self::Integer(truncated)
        } else {
            Self::Number(value)
        }
    }

    pub fn from_str(value: &str) -> Self {
        Self::String(Rc::from(value))
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn is_nullish(&self) -> bool {
        matches!(self, Self::Undefined | Self::Null)
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Self::Undefined | Self::Null | Self::Empty => false,
            Self::Boolean(b) => *b,
            Self::Integer(i) => *i != 0,
            Self::Number(n) => !(n.is_nan() || *n == 0.0),
            Self::String(s) => !s.is_empty(),
            Self::Object(_) | Self::Function(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        match self {
            Self::Undefined | Self::Empty => f64::NAN,
            Self::Null => 0.0,
            Self::Boolean(b) => f64::from(u8::from(*b)),
            Self::Integer(i) => f64::from(*i),
            Self::Number(n) => *n,
            Self::String(s) => string_to_number(s),
            Self::Object(_) | Self::Function(_) => f64::NAN,
        }
    }

    pub fn to_js_string(&self, agent: &Agent) -> Rc<str> {
        match self {
            Self::Undefined => Rc::from("undefined"),
            Self::Null => Rc::from("null"),
            Self::Boolean(true) => Rc::from("true"),
            Self::Boolean(false) => Rc::from("false"),
            Self::Integer(i) => Rc::from(i.to_string()),
            Self::Number(n) => Rc::from(ryu_js::Buffer::new().format(*n)),
            Self::String(s) => s.clone(),
            Self::Object(object) => {
                let Some(data) = agent.heap.objects.get(*object) else {
                    return Rc::from("[object Object]");
                };
                match data.kind {
                    ObjectKind::Error(_) => {
                        let name = data.get("name").to_js_string(agent);
                        let message = data.get("message").to_js_string(agent);
                        if message.is_empty() {
                            name
                        } else {
                            Rc::from(format!("{name}: {message}"))
                        }
                    }
                    ObjectKind::Arguments => Rc::from("[object Arguments]"),
                    ObjectKind::Ordinary => Rc::from("[object Object]"),
                }
            }
            Self::Function(function) => {
                let name = agent
                    .heap
                    .functions
                    .get(*function)
                    .map_or("", |data| data.name());
                Rc::from(format!("function {name}() {{ [code] }}"))
            }
            Self::Empty => Rc::from(""),
        }
    }

    pub fn type_of(&self) -> &'static str {
        match self {
            Self::Undefined | Self::Empty => "undefined",
            Self::Null | Self::Object(_) => "object",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) | Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Function(_) => "function",
        }
    }

    fn is_number(&self) -> bool {
        matches!(self, Self::Integer(_) | Self::Number(_))
    }

    /// ### [7.2.15 IsStrictlyEqual ( x, y )](https://tc39.es/ecma262/#sec-isstrictlyequal)
    pub fn is_strictly_equal(&self, other: &Self) -> bool {
        if self.is_number() && other.is_number() {
            return self.to_number() == other.to_number();
        }
        match (self, other) {
            (Self::Boolean(a), Self::Boolean(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            (Self::Function(a), Self::Function(b)) => a == b,
            (Self::Undefined, Self::Undefined)
            | (Self::Null, Self::Null)
            | (Self::Empty, Self::Empty) => true,
            _ => false,
        }
    }

    /// ### [7.2.14 IsLooselyEqual ( x, y )](https://tc39.es/ecma262/#sec-islooselyequal)
    ///
    /// Objects are never converted to primitives.
    pub fn is_loosely_equal(&self, other: &Self) -> bool {
        match (self, other) {
            (a, b) if a.is_nullish() && b.is_nullish() => true,
            (a, b) if a.is_nullish() || b.is_nullish() => false,
            (Self::Object(_) | Self::Function(_), _) | (_, Self::Object(_) | Self::Function(_)) => {
                self.is_strictly_equal(other)
            }
            (Self::String(a), Self::String(b)) => a == b,
            _ => self.to_number() == other.to_number(),
        }
    }
}

/// ### [7.1.4.1.1 StringToNumber ( str )](https://tc39.es/ecma262/#sec-stringtonumber)
///
/// Decimal literals and `Infinity` only.
fn string_to_number(source: &str) -> f64 {
    let trimmed = source.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => f64::INFINITY,
        "-Infinity" => f64::NEG_INFINITY,
        _ if trimmed.contains(|c: char| c.is_ascii_alphabetic() && c != 'e' && c != 'E') => {
            f64::NAN
        }
        _ => trimmed.parse().unwrap_or(f64::NAN),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn integral_numbers_normalise() {
        assert_eq!(Value::from_f64(3.0), Value::Integer(3));
        assert_eq!(Value::from_f64(0.5), Value::Number(0.5));
        assert!(matches!(Value::from_f64(-0.0), Value::Number(n) if n.is_sign_negative()));
        assert!(matches!(Value::from_f64(4e10), Value::Number(_)));
    }

    #[test]
    fn strict_equality_across_number_representations() {
        assert!(Value::Integer(1).is_strictly_equal(&Value::Number(1.0)));
        assert!(!Value::Number(f64::NAN).is_strictly_equal(&Value::Number(f64::NAN)));
        assert!(Value::Undefined.is_strictly_equal(&Value::Undefined));
        assert!(!Value::Undefined.is_strictly_equal(&Value::Null));
    }

    #[test]
    fn loose_equality() {
        assert!(Value::Undefined.is_loosely_equal(&Value::Null));
        assert!(Value::from_str("2").is_loosely_equal(&Value::Integer(2)));
        assert!(!Value::Null.is_loosely_equal(&Value::Integer(0)));
    }

    #[test]
    fn string_conversion_to_number() {
        assert_eq!(Value::from_str(" 12 ").to_number(), 12.0);
        assert_eq!(Value::from_str("").to_number(), 0.0);
        assert!(Value::from_str("abc").to_number().is_nan());
        assert_eq!(Value::from_str("1e3").to_number(), 1000.0);
    }
}
