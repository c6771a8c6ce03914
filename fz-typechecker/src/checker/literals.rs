//! Typing of numeric literal constants.
//!
//! A literal has no type of its own. It takes the numeric type expected
//! where it is used, provided its value fits, and otherwise defaults to
//! `i32` (`i64` when too large) or `f64`.

use crate::error::TypecheckError;
use crate::session::{Builtin, CompilationSession};
use crate::typed_ast::ConstValue;
use crate::types::TypeId;
use fz_ast::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NumericKind {
    I32,
    I64,
    U8,
    F32,
    F64,
}

impl NumericKind {
    const ALL: [NumericKind; 5] = [
        NumericKind::I32,
        NumericKind::I64,
        NumericKind::U8,
        NumericKind::F32,
        NumericKind::F64,
    ];

    pub fn builtin(self) -> Builtin {
        match self {
            NumericKind::I32 => Builtin::I32,
            NumericKind::I64 => Builtin::I64,
            NumericKind::U8 => Builtin::U8,
            NumericKind::F32 => Builtin::F32,
            NumericKind::F64 => Builtin::F64,
        }
    }

    pub fn is_float(self) -> bool {
        matches!(self, NumericKind::F32 | NumericKind::F64)
    }

    fn int_range(self) -> (i128, i128) {
        match self {
            NumericKind::I32 => (i32::MIN.into(), i32::MAX.into()),
            NumericKind::I64 => (i64::MIN.into(), i64::MAX.into()),
            NumericKind::U8 => (0, u8::MAX.into()),
            // exactly representable integers
            NumericKind::F32 => (-(1 << 24), 1 << 24),
            NumericKind::F64 => (-(1 << 53), 1 << 53),
        }
    }
}

/// Integer literal text: decimal, `0x`, `0o` or `0b`, `_` separators allowed
pub(crate) fn parse_int(text: &str) -> Option<i128> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.as_str()),
    };
    let value = if let Some(hex) = digits.strip_prefix("0x") {
        i128::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = digits.strip_prefix("0o") {
        i128::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = digits.strip_prefix("0b") {
        i128::from_str_radix(bin, 2).ok()?
    } else {
        digits.parse::<i128>().ok()?
    };
    Some(if negative { -value } else { value })
}

fn parse_float(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Can the literal `value` be represented in `kind`?
pub(crate) fn literal_fits(value: &ConstValue, kind: NumericKind) -> bool {
    match value {
        ConstValue::Int(text) => match parse_int(text) {
            Some(v) => {
                let (lo, hi) = kind.int_range();
                lo <= v && v <= hi
            }
            None => false,
        },
        ConstValue::Float(text) => match (kind, parse_float(text)) {
            (NumericKind::F32, Some(v)) => v.abs() <= f64::from(f32::MAX),
            (NumericKind::F64, Some(_)) => true,
            _ => false,
        },
        _ => false,
    }
}

/// Type a literal takes when nothing is expected of it
pub(crate) fn default_literal_kind(value: &ConstValue) -> Option<NumericKind> {
    match value {
        ConstValue::Float(_) => Some(NumericKind::F64),
        ConstValue::Int(_) => [NumericKind::I32, NumericKind::I64]
            .into_iter()
            .find(|k| literal_fits(value, *k)),
        _ => None,
    }
}

fn literal_text(value: &ConstValue) -> &str {
    match value {
        ConstValue::Int(text) | ConstValue::Float(text) => text,
        _ => "",
    }
}

impl CompilationSession {
    pub(crate) fn numeric_kind(&self, t: TypeId) -> Option<NumericKind> {
        NumericKind::ALL
            .into_iter()
            .find(|k| self.is_builtin_type(t, k.builtin()))
    }

    /// Type of a numeric literal used where `expected` is expected
    pub(crate) fn literal_type(&mut self, value: &ConstValue, expected: Option<TypeId>, span: Span) -> TypeId {
        if let Some(expected) = expected {
            if let Some(kind) = self.numeric_kind(expected) {
                let float_into_int = matches!(value, ConstValue::Float(_)) && !kind.is_float();
                if literal_fits(value, kind) {
                    return self.builtin_type(kind.builtin());
                }
                if !float_into_int {
                    self.report(TypecheckError::LiteralOutOfRange {
                        literal: literal_text(value).to_string(),
                        ty: self.type_name(expected),
                        span: span.into(),
                    });
                    return TypeId::ERROR;
                }
            }
        }
        match default_literal_kind(value) {
            Some(kind) => self.builtin_type(kind.builtin()),
            None => {
                self.report(TypecheckError::LiteralOutOfRange {
                    literal: literal_text(value).to_string(),
                    ty: Builtin::I64.name().to_string(),
                    span: span.into(),
                });
                TypeId::ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn int(text: &str) -> ConstValue {
        ConstValue::Int(text.to_string())
    }

    #[test]
    fn test_parse_int_forms() {
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("0xff"), Some(255));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("-12"), Some(-12));
        assert_eq!(parse_int("12a"), None);
    }

    #[test]
    fn test_literal_ranges() {
        assert!(literal_fits(&int("255"), NumericKind::U8));
        assert!(!literal_fits(&int("256"), NumericKind::U8));
        assert!(!literal_fits(&int("-1"), NumericKind::U8));
        assert!(literal_fits(&int("2147483647"), NumericKind::I32));
        assert!(!literal_fits(&int("2147483648"), NumericKind::I32));
        assert!(literal_fits(&int("3"), NumericKind::F64));
        assert!(!literal_fits(&ConstValue::Float("1.5".into()), NumericKind::I64));
        assert!(!literal_fits(&ConstValue::Float("1e300".into()), NumericKind::F32));
    }

    #[test]
    fn test_default_kinds() {
        assert_eq!(default_literal_kind(&int("7")), Some(NumericKind::I32));
        assert_eq!(default_literal_kind(&int("9000000000")), Some(NumericKind::I64));
        assert_eq!(default_literal_kind(&int("99999999999999999999")), None);
        assert_eq!(
            default_literal_kind(&ConstValue::Float("0.5".into())),
            Some(NumericKind::F64)
        );
    }
}
