use lasso::Rodeo;

use crate::binding::{BindingSlice, NodeId};
use crate::compare::Operand;
use crate::error::ELError;
use crate::fact::ELFact;
use crate::value::{ELValue, Rational};
use crate::var::{Bound, ELVar, VarScope};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArithOp {
    Minus,
    Plus,
    Mul,
    Div,
    Pow,
    Mod,
    /// Ignores both operands, yields a fresh uniform value in [0,1) drawn
    /// from the runtime's seeded stream.
    Rand,
    /// Natural log of the target value; the right-hand side is ignored.
    Log,
    /// e^target; IR-level only, no surface token.
    Exp,
}

impl ArithOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArithOp::Minus => "-",
            ArithOp::Plus => "+",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Pow => "^",
            ArithOp::Mod => "%",
            ArithOp::Rand => "rnd",
            ArithOp::Log => "lg",
            ArithOp::Exp => "exp",
        }
    }
}

/// What an arithmetic action points at: a fact path, a binding site, or a
/// node already pinned by id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ArithTarget {
    Fact(Box<ELFact>),
    Var(ELVar),
    Node(NodeId),
}

/// An in-place update: `target op rhs`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ELArithFact {
    pub target: ArithTarget,
    pub op: ArithOp,
    pub rhs: Operand,
}

impl ELArithFact {
    pub fn new(target: ArithTarget, op: ArithOp, rhs: Operand) -> ELArithFact {
        ELArithFact { target, op, rhs }
    }

    pub fn has_forall(&self) -> bool {
        let target_forall = match &self.target {
            ArithTarget::Var(v) => v.scope == VarScope::Forall,
            ArithTarget::Fact(f) => f.has_forall(),
            ArithTarget::Node(_) => false,
        };
        let rhs_forall = matches!(&self.rhs, Operand::Var(v) if v.scope == VarScope::Forall);
        target_forall || rhs_forall
    }

    /// Pin path-variable targets to node ids and literalize the right-hand
    /// side under a slice. Non-path variable targets stay symbolic: they
    /// update the slice, not the trie.
    pub fn bind(
        &self,
        slice: &BindingSlice,
        all_slice: Option<&BindingSlice>,
    ) -> Result<ELArithFact, ELError> {
        let target = match &self.target {
            ArithTarget::Var(v) if v.is_path => match v.resolve(slice, all_slice)? {
                Bound::Node(id) => ArithTarget::Node(id),
                Bound::Value(_) => {
                    return Err(ELError::consistency("path variable resolved to a value"));
                }
            },
            ArithTarget::Fact(f) => ArithTarget::Fact(Box::new(f.bind(slice, all_slice)?)),
            other => other.clone(),
        };
        let rhs = match &self.rhs {
            Operand::Var(v) if slice.contains(v.name) || v.scope == VarScope::Forall => {
                Operand::Val(self.rhs.resolve(slice, all_slice)?)
            }
            other => other.clone(),
        };
        Ok(ELArithFact {
            target,
            op: self.op,
            rhs,
        })
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        let target = match &self.target {
            ArithTarget::Fact(f) => f.render(rodeo),
            ArithTarget::Var(v) => v.render(rodeo),
            ArithTarget::Node(id) => format!("<node {}>", id.0),
        };
        format!("{} {} {}", target, self.op.as_str(), self.rhs.render(rodeo))
    }
}

fn float_op(op: ArithOp, a: f64, b: f64) -> Result<f64, ELError> {
    Ok(match op {
        ArithOp::Plus => a + b,
        ArithOp::Minus => a - b,
        ArithOp::Mul => a * b,
        ArithOp::Div => {
            if b == 0.0 {
                return Err(ELError::consistency("division by zero"));
            }
            a / b
        }
        ArithOp::Pow => a.powf(b),
        ArithOp::Mod => {
            if b == 0.0 {
                return Err(ELError::consistency("division by zero"));
            }
            a - b * (a / b).floor()
        }
        _ => return Err(ELError::consistency("not a binary float operator")),
    })
}

fn int_op(op: ArithOp, a: i64, b: i64) -> Result<ELValue, ELError> {
    let overflow = || ELError::consistency("integer overflow");
    Ok(match op {
        ArithOp::Plus => ELValue::Int(a.checked_add(b).ok_or_else(overflow)?),
        ArithOp::Minus => ELValue::Int(a.checked_sub(b).ok_or_else(overflow)?),
        ArithOp::Mul => ELValue::Int(a.checked_mul(b).ok_or_else(overflow)?),
        ArithOp::Div => {
            if b == 0 {
                return Err(ELError::consistency("division by zero"));
            }
            if a % b == 0 {
                ELValue::Int(a / b)
            } else {
                ELValue::rat(a, b)?
            }
        }
        ArithOp::Mod => {
            if b == 0 {
                return Err(ELError::consistency("division by zero"));
            }
            ELValue::Int(a.rem_euclid(b))
        }
        ArithOp::Pow => {
            if b >= 0 {
                let e = u32::try_from(b).map_err(|_| ELError::consistency("exponent out of range"))?;
                ELValue::Int(a.checked_pow(e).ok_or_else(overflow)?)
            } else {
                let e = u32::try_from(-b).map_err(|_| ELError::consistency("exponent out of range"))?;
                ELValue::rat(1, a.checked_pow(e).ok_or_else(overflow)?)?
            }
        }
        _ => return Err(ELError::consistency("not a binary integer operator")),
    })
}

fn as_rational(v: &ELValue) -> Result<Rational, ELError> {
    match v {
        ELValue::Int(i) => Rational::new(*i, 1),
        ELValue::Rat(r) => Ok(*r),
        _ => Err(ELError::consistency("arithmetic over a non-numeric value")),
    }
}

/// Deterministic arithmetic with the standard promotions: any float
/// participant makes the result a float, any rational participant makes it
/// rational, integer division with a remainder becomes a rational. `Rand`
/// is not handled here; it needs the runtime's random stream.
pub fn eval_binary(op: ArithOp, a: &ELValue, b: &ELValue) -> Result<ELValue, ELError> {
    match op {
        ArithOp::Rand => Err(ELError::consistency("rand needs the runtime stream")),
        ArithOp::Log => {
            let x = a
                .as_f64()
                .ok_or_else(|| ELError::consistency("log over a non-numeric value"))?;
            Ok(ELValue::Float(x.ln()))
        }
        ArithOp::Exp => {
            let x = a
                .as_f64()
                .ok_or_else(|| ELError::consistency("exp over a non-numeric value"))?;
            Ok(ELValue::Float(x.exp()))
        }
        _ => {
            if !a.is_numeric() || !b.is_numeric() {
                return Err(ELError::consistency("arithmetic over a non-numeric value"));
            }
            match (a, b) {
                (ELValue::Float(_), _) | (_, ELValue::Float(_)) => {
                    let x = float_op(op, a.as_f64().unwrap(), b.as_f64().unwrap())?;
                    Ok(ELValue::Float(x))
                }
                (ELValue::Rat(_), _) | (_, ELValue::Rat(_)) => {
                    let ra = as_rational(a)?;
                    let rb = as_rational(b)?;
                    let out = match op {
                        ArithOp::Plus => ra.add(&rb)?,
                        ArithOp::Minus => ra.sub(&rb)?,
                        ArithOp::Mul => ra.mul(&rb)?,
                        ArithOp::Div => ra.div(&rb)?,
                        ArithOp::Mod => ra.rem(&rb)?,
                        ArithOp::Pow => match b {
                            ELValue::Int(e) => ra.pow(*e)?,
                            _ => {
                                let x =
                                    float_op(ArithOp::Pow, a.as_f64().unwrap(), b.as_f64().unwrap())?;
                                return Ok(ELValue::Float(x));
                            }
                        },
                        _ => unreachable!(),
                    };
                    Ok(ELValue::from_rational(out))
                }
                (ELValue::Int(x), ELValue::Int(y)) => int_op(op, *x, *y),
                _ => unreachable!(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ops_stay_integers() {
        assert_eq!(
            eval_binary(ArithOp::Plus, &ELValue::Int(10), &ELValue::Int(5)).unwrap(),
            ELValue::Int(15)
        );
        assert_eq!(
            eval_binary(ArithOp::Pow, &ELValue::Int(2), &ELValue::Int(10)).unwrap(),
            ELValue::Int(1024)
        );
        assert_eq!(
            eval_binary(ArithOp::Mod, &ELValue::Int(7), &ELValue::Int(3)).unwrap(),
            ELValue::Int(1)
        );
    }

    #[test]
    fn inexact_division_promotes_to_rational() {
        assert_eq!(
            eval_binary(ArithOp::Div, &ELValue::Int(1), &ELValue::Int(5)).unwrap(),
            ELValue::rat(1, 5).unwrap()
        );
        assert_eq!(
            eval_binary(ArithOp::Div, &ELValue::Int(10), &ELValue::Int(5)).unwrap(),
            ELValue::Int(2)
        );
    }

    #[test]
    fn rational_participant_makes_rational() {
        let fifth = ELValue::rat(1, 5).unwrap();
        assert_eq!(
            eval_binary(ArithOp::Plus, &fifth, &ELValue::Int(1)).unwrap(),
            ELValue::rat(6, 5).unwrap()
        );
        // 1/5 + 4/5 collapses back to an integer
        let four_fifths = ELValue::rat(4, 5).unwrap();
        assert_eq!(
            eval_binary(ArithOp::Plus, &fifth, &four_fifths).unwrap(),
            ELValue::Int(1)
        );
    }

    #[test]
    fn float_participant_makes_float() {
        let out = eval_binary(ArithOp::Mul, &ELValue::Float(1.5), &ELValue::Int(2)).unwrap();
        assert_eq!(out, ELValue::Float(3.0));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(eval_binary(ArithOp::Div, &ELValue::Int(1), &ELValue::Int(0)).is_err());
        assert!(eval_binary(ArithOp::Mod, &ELValue::Int(1), &ELValue::Int(0)).is_err());
    }

    #[test]
    fn log_ignores_rhs() {
        let out = eval_binary(ArithOp::Log, &ELValue::Float(1.0), &ELValue::Int(99)).unwrap();
        assert_eq!(out, ELValue::Float(0.0));
    }

    #[test]
    fn rand_is_not_deterministic_here() {
        assert!(eval_binary(ArithOp::Rand, &ELValue::Int(1), &ELValue::Int(2)).is_err());
    }
}
