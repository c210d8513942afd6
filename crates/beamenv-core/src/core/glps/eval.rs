//! Arithmetic on GLPS values.
//!
//! Scalars combine as usual. Vectors combine element-wise with scalars and with
//! vectors of the same length. Strings only appear as literals. Every result is
//! checked for finiteness.

use super::error::GlpsError;
use super::token::Position;
use crate::core::config::Value;
use phf::phf_map;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }

    fn noun(self) -> &'static str {
        match self {
            BinaryOp::Add => "addition",
            BinaryOp::Sub => "subtraction",
            BinaryOp::Mul => "multiplication",
            BinaryOp::Div => "division",
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Builtin {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sqrt,
    Exp,
    Ln,
    Deg2Rad,
    Rad2Deg,
}

static BUILTINS: phf::Map<&'static str, Builtin> = phf_map! {
    "sin" => Builtin::Sin,
    "cos" => Builtin::Cos,
    "tan" => Builtin::Tan,
    "asin" => Builtin::Asin,
    "acos" => Builtin::Acos,
    "atan" => Builtin::Atan,
    "sqrt" => Builtin::Sqrt,
    "exp" => Builtin::Exp,
    "ln" => Builtin::Ln,
    "deg2rad" => Builtin::Deg2Rad,
    "rad2deg" => Builtin::Rad2Deg,
};

impl Builtin {
    fn apply(self, x: f64) -> f64 {
        match self {
            Builtin::Sin => x.sin(),
            Builtin::Cos => x.cos(),
            Builtin::Tan => x.tan(),
            Builtin::Asin => x.asin(),
            Builtin::Acos => x.acos(),
            Builtin::Atan => x.atan(),
            Builtin::Sqrt => x.sqrt(),
            Builtin::Exp => x.exp(),
            Builtin::Ln => x.ln(),
            Builtin::Deg2Rad => x.to_radians(),
            Builtin::Rad2Deg => x.to_degrees(),
        }
    }
}

pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains_key(name)
}

fn finite(value: f64, what: &str, pos: Position) -> Result<f64, GlpsError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GlpsError::calc_error(
            pos,
            format!("{} results in non-finite value", what),
        ))
    }
}

fn map_finite(
    values: impl Iterator<Item = f64>,
    what: &str,
    pos: Position,
) -> Result<Value, GlpsError> {
    values
        .map(|v| finite(v, what, pos))
        .collect::<Result<Vec<_>, _>>()
        .map(Value::Vector)
}

pub fn binary(op: BinaryOp, lhs: Value, rhs: Value, pos: Position) -> Result<Value, GlpsError> {
    let what = op.noun();
    match (lhs, rhs) {
        (Value::Scalar(a), Value::Scalar(b)) => finite(op.apply(a, b), what, pos).map(Value::Scalar),
        (Value::Vector(a), Value::Scalar(b)) => map_finite(a.into_iter().map(|x| op.apply(x, b)), what, pos),
        (Value::Scalar(a), Value::Vector(b)) => map_finite(b.into_iter().map(|x| op.apply(a, x)), what, pos),
        (Value::Vector(a), Value::Vector(b)) => {
            if a.len() != b.len() {
                return Err(GlpsError::type_error(
                    pos,
                    format!(
                        "Operator '{}' needs vectors of equal length, not {} and {}",
                        op.symbol(),
                        a.len(),
                        b.len()
                    ),
                ));
            }
            map_finite(a.into_iter().zip(b).map(|(x, y)| op.apply(x, y)), what, pos)
        }
        (lhs, rhs) => Err(GlpsError::type_error(
            pos,
            format!(
                "Operator '{}' not defined for types {} and {}",
                op.symbol(),
                lhs.type_name(),
                rhs.type_name()
            ),
        )),
    }
}

pub fn negate(value: Value, pos: Position) -> Result<Value, GlpsError> {
    match value {
        Value::Scalar(v) => Ok(Value::Scalar(-v)),
        Value::Vector(v) => Ok(Value::Vector(v.into_iter().map(|x| -x).collect())),
        other => Err(GlpsError::type_error(
            pos,
            format!("Unary '-' not defined for type {}", other.type_name()),
        )),
    }
}

pub fn call(name: &str, arg: Value, pos: Position) -> Result<Value, GlpsError> {
    let Some(builtin) = BUILTINS.get(name).copied() else {
        return Err(GlpsError::UndefinedReference {
            pos,
            name: name.to_string(),
        });
    };
    match arg {
        Value::Scalar(x) => finite(builtin.apply(x), name, pos).map(Value::Scalar),
        other => Err(GlpsError::type_error(
            pos,
            format!(
                "Function '{}' needs a scalar argument, not type {}",
                name,
                other.type_name()
            ),
        )),
    }
}

/// Checks one entry of a vector literal.
pub fn vector_element(value: Value, pos: Position) -> Result<f64, GlpsError> {
    match value {
        Value::Scalar(v) => Ok(v),
        other => Err(GlpsError::type_error(
            pos,
            format!(
                "Vector element types must be scalar not type {}",
                other.type_name()
            ),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::glps::error::GlpsErrorKind;

    fn pos() -> Position {
        Position::new(1, 1)
    }

    #[test]
    fn scalar_arithmetic() {
        let v = binary(BinaryOp::Sub, Value::Scalar(40.0), Value::Scalar(-2.0), pos()).unwrap();
        assert_eq!(v, Value::Scalar(42.0));
    }

    #[test]
    fn division_by_zero_is_a_calc_error() {
        let err = binary(BinaryOp::Div, Value::Scalar(4.0), Value::Scalar(0.0), pos()).unwrap_err();
        assert_eq!(err.kind(), GlpsErrorKind::CalcError);
        assert!(err.to_string().contains("division results in non-finite value"));
    }

    #[test]
    fn multiplication_overflow_is_a_calc_error() {
        let err = binary(BinaryOp::Mul, Value::Scalar(1e308), Value::Scalar(10.0), pos()).unwrap_err();
        assert_eq!(err.kind(), GlpsErrorKind::CalcError);
    }

    #[test]
    fn vectors_broadcast_against_scalars() {
        let v = binary(BinaryOp::Mul, Value::Vector(vec![1.0, 2.0]), Value::Scalar(3.0), pos()).unwrap();
        assert_eq!(v, Value::Vector(vec![3.0, 6.0]));
        let v = binary(BinaryOp::Sub, Value::Scalar(1.0), Value::Vector(vec![1.0, 2.0]), pos()).unwrap();
        assert_eq!(v, Value::Vector(vec![0.0, -1.0]));
    }

    #[test]
    fn vectors_of_unequal_length_do_not_combine() {
        let err = binary(
            BinaryOp::Add,
            Value::Vector(vec![1.0]),
            Value::Vector(vec![1.0, 2.0]),
            pos(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), GlpsErrorKind::TypeError);
    }

    #[test]
    fn strings_reject_arithmetic() {
        let err = binary(BinaryOp::Add, Value::from("a"), Value::Scalar(1.0), pos()).unwrap_err();
        assert_eq!(err.kind(), GlpsErrorKind::TypeError);
        assert!(negate(Value::from("a"), pos()).is_err());
    }

    #[test]
    fn builtins_evaluate_and_check_domains() {
        let v = call("deg2rad", Value::Scalar(180.0), pos()).unwrap();
        let rad = v.as_scalar().unwrap();
        assert!((rad - std::f64::consts::PI).abs() < 1e-15);
        let err = call("sqrt", Value::Scalar(-1.0), pos()).unwrap_err();
        assert_eq!(err.kind(), GlpsErrorKind::CalcError);
        assert!(is_builtin("cos"));
        assert!(!is_builtin("drift"));
    }

    #[test]
    fn vector_elements_must_be_scalar() {
        let err = vector_element(Value::from("bar"), pos()).unwrap_err();
        assert!(
            err.to_string()
                .contains("Vector element types must be scalar not type string")
        );
    }
}
