//! Runtime values.
//!
//! A single variant today. Chunk and VM only move values around through the
//! constant pool and stack slots, so new variants (bool, string, object ref)
//! can be added here without touching the bytecode contract.

use core::fmt;

/// A value living in the constant pool or on the VM stack.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum Value {
    /// IEEE-754 double.
    Number(f64),
}

impl Value {
    /// Numeric payload.
    #[must_use]
    pub const fn as_number(self) -> f64 {
        match self {
            Value::Number(n) => n,
        }
    }

    /// Name of the variant, for diagnostics.
    pub const fn type_name(self) -> &'static str {
        match self {
            Value::Number(_) => "number",
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self { Value::Number(v) }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self { Value::Number(f64::from(v)) }
}

impl Default for Value {
    fn default() -> Self { Value::Number(0.0) }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // `{}` on f64 already prints `7` for 7.0 and `inf`/`NaN` for the IEEE edge cases
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_numbers() {
        assert_eq!(Value::Number(7.0).to_string(), "7");
        assert_eq!(Value::Number(-0.5).to_string(), "-0.5");
        assert_eq!(Value::Number(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::Number(f64::NAN).to_string(), "NaN");
    }

    #[test]
    fn conversions() {
        assert_eq!(Value::from(42), Value::Number(42.0));
        assert_eq!(Value::from(1.5).as_number(), 1.5);
        assert_eq!(Value::default().type_name(), "number");
    }
}
