// value.rs — Typed literals carried by parameters and state declarations
//
// A `Value` is what the front end hands over for every parameter: a scalar,
// a duration, a raw C expression, a string literal, or a reference to a
// property of another component (`temp.value`). References are the only
// values that need the session to render; everything else renders itself.
//
// Preconditions: none.
// Postconditions: `as_string` yields valid C literal text.
// Failure modes: none (conversions return `Option`).
// Side effects: `code_for_generator` may mark components used through the
//               supplied `CodeContext`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Unit suffix of a duration literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Ms,
    S,
    Min,
    H,
}

impl TimeUnit {
    pub fn millis(self) -> u64 {
        match self {
            TimeUnit::Ms => 1,
            TimeUnit::S => 1_000,
            TimeUnit::Min => 60_000,
            TimeUnit::H => 3_600_000,
        }
    }
}

/// A duration literal such as `2s` or `500ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLiteral {
    pub amount: u64,
    pub unit: TimeUnit,
}

/// A literal value. Serialized untagged: JSON scalars map to the scalar
/// variants, `{"amount", "unit"}` to a duration, `{"code"}` to raw C code
/// and `{"component", "field"}` to a component property reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Time(TimeLiteral),
    Code { code: String },
    Ref { component: String, field: String },
    Str(String),
}

/// Resolves component property references while generating code.
pub trait CodeContext {
    /// Return C code for `component.field`, or a safe fallback after
    /// reporting a diagnostic.
    fn replace_code(&mut self, component: &str, field: &str) -> String;
}

impl Value {
    pub fn code(code: impl Into<String>) -> Self {
        Value::Code { code: code.into() }
    }

    pub fn reference(component: impl Into<String>, field: impl Into<String>) -> Self {
        Value::Ref {
            component: component.into(),
            field: field.into(),
        }
    }

    pub fn millis(amount: u64) -> Self {
        Value::Time(TimeLiteral {
            amount,
            unit: TimeUnit::Ms,
        })
    }

    pub fn seconds(amount: u64) -> Self {
        Value::Time(TimeLiteral {
            amount,
            unit: TimeUnit::S,
        })
    }

    /// C literal text for this value.
    pub fn as_string(&self) -> String {
        match self {
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => format!("{:?}", x),
            Value::Time(t) => t.amount.saturating_mul(t.unit.millis()).to_string(),
            Value::Code { code } => code.clone(),
            Value::Ref { component, field } => format!("{}.{}", component, field),
            Value::Str(s) => c_string_literal(s),
        }
    }

    /// C type used when this value initializes a variable.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) | Value::Code { .. } | Value::Ref { .. } => "int32_t",
            Value::Float(_) => "float",
            Value::Time(_) => "uint32_t",
            Value::Str(_) => "const char *",
        }
    }

    /// C code for this value in the generator context. References are
    /// resolved through `ctx`; everything else is its literal text.
    pub fn code_for_generator(&self, ctx: &mut impl CodeContext) -> String {
        match self {
            Value::Ref { component, field } => ctx.replace_code(component, field),
            other => other.as_string(),
        }
    }

    /// Bare text of names and code, without string quoting.
    pub fn as_name(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.as_string(),
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Interpret the value as a duration. Bare numbers are milliseconds.
    pub fn to_milliseconds(&self) -> Option<u64> {
        match self {
            Value::Int(n) if *n >= 0 => Some(*n as u64),
            Value::Float(x) if *x >= 0.0 => Some(x.round() as u64),
            Value::Time(t) => t.amount.checked_mul(t.unit.millis()),
            _ => None,
        }
    }

    /// A duration literal too large to express in milliseconds.
    pub fn is_overflowing_duration(&self) -> bool {
        matches!(self, Value::Time(t) if t.amount.checked_mul(t.unit.millis()).is_none())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Time(t) => t.amount != 0,
            Value::Code { code } => !code.is_empty(),
            Value::Ref { .. } => true,
            Value::Str(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

fn c_string_literal(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Parse an integer literal in C notation (`42`, `-7`, `0x1f`).
pub fn parse_int_literal(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}
