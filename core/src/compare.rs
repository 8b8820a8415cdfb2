use lasso::Rodeo;

use crate::binding::BindingSlice;
use crate::error::ELError;
use crate::value::ELValue;
use crate::var::{Bound, ELVar};

/// A comparison or arithmetic operand: either a literal or a binding site.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    Val(ELValue),
    Var(ELVar),
}

impl Operand {
    pub fn resolve(
        &self,
        slice: &BindingSlice,
        all_slice: Option<&BindingSlice>,
    ) -> Result<ELValue, ELError> {
        match self {
            Operand::Val(v) => Ok(v.clone()),
            Operand::Var(var) => match var.resolve(slice, all_slice)? {
                Bound::Value(v) => Ok(v),
                Bound::Node(_) => Err(ELError::consistency(
                    "path binding used where a value is required",
                )),
            },
        }
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        match self {
            Operand::Val(v) => v.render(rodeo),
            Operand::Var(v) => v.render(rodeo),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompOp {
    Greater,
    Lesser,
    GreaterEqual,
    LesserEqual,
    Equal,
    NotEqual,
    Contains,
    NotContains,
    Near,
}

impl CompOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompOp::Greater => ">",
            CompOp::Lesser => "<",
            CompOp::GreaterEqual => ">=",
            CompOp::LesserEqual => "<=",
            CompOp::Equal => "==",
            CompOp::NotEqual => "!=",
            CompOp::Contains => "@",
            CompOp::NotContains => "!@",
            CompOp::Near => "~=",
        }
    }
}

/// A filter over binding slices: `$x < $y`, `$x ~=(10) $y`, `$x @ $list`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ELComparison {
    pub lhs: ELVar,
    pub op: CompOp,
    pub rhs: Operand,
    /// Tolerance, only meaningful for `~=`.
    pub near: Option<Operand>,
}

impl ELComparison {
    pub fn new(lhs: ELVar, op: CompOp, rhs: Operand) -> ELComparison {
        ELComparison {
            lhs,
            op,
            rhs,
            near: None,
        }
    }

    pub fn near(lhs: ELVar, rhs: Operand, tolerance: Operand) -> ELComparison {
        ELComparison {
            lhs,
            op: CompOp::Near,
            rhs,
            near: Some(tolerance),
        }
    }

    /// Evaluate under one slice. Comparing an unbound name is a consistency
    /// error, not a quiet failure.
    pub fn passes(
        &self,
        slice: &BindingSlice,
        all_slice: Option<&BindingSlice>,
        rodeo: &Rodeo,
    ) -> Result<bool, ELError> {
        let lhs = match self.lhs.resolve(slice, all_slice)? {
            Bound::Value(v) => v,
            Bound::Node(_) => {
                return Err(ELError::consistency("comparison over a path binding"));
            }
        };
        let rhs = self.rhs.resolve(slice, all_slice)?;

        use CompOp::*;
        match self.op {
            Equal => Ok(lhs == rhs || lhs.num_cmp(&rhs) == Some(std::cmp::Ordering::Equal)),
            NotEqual => {
                Ok(lhs != rhs && lhs.num_cmp(&rhs) != Some(std::cmp::Ordering::Equal))
            }
            Greater | Lesser | GreaterEqual | LesserEqual => {
                let ord = lhs
                    .num_cmp(&rhs)
                    .ok_or_else(|| ELError::consistency("ordering over non-numeric values"))?;
                Ok(match self.op {
                    Greater => ord.is_gt(),
                    Lesser => ord.is_lt(),
                    GreaterEqual => ord.is_ge(),
                    LesserEqual => ord.is_le(),
                    _ => unreachable!(),
                })
            }
            Contains | NotContains => {
                let held = match (&lhs, &rhs) {
                    (item, ELValue::List(items)) => items.contains(item),
                    (ELValue::Str(a), ELValue::Str(b)) => {
                        rodeo.resolve(b).contains(rodeo.resolve(a))
                    }
                    _ => {
                        return Err(ELError::consistency(
                            "membership requires a list or string right-hand side",
                        ));
                    }
                };
                Ok(if self.op == Contains { held } else { !held })
            }
            Near => {
                let tol = self
                    .near
                    .as_ref()
                    .ok_or_else(|| ELError::consistency("near comparison without a tolerance"))?
                    .resolve(slice, all_slice)?;
                let (a, b, t) = match (lhs.as_f64(), rhs.as_f64(), tol.as_f64()) {
                    (Some(a), Some(b), Some(t)) => (a, b, t),
                    _ => {
                        return Err(ELError::consistency("near comparison over non-numerics"));
                    }
                };
                Ok(a - t <= b && b <= a + t)
            }
        }
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        match &self.near {
            Some(tol) => format!(
                "{} ~=({}) {}",
                self.lhs.render(rodeo),
                tol.render(rodeo),
                self.rhs.render(rodeo)
            ),
            None => format!(
                "{} {} {}",
                self.lhs.render(rodeo),
                self.op.as_str(),
                self.rhs.render(rodeo)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::NodeId;
    use lasso::Rodeo;

    fn slice_with(rodeo: &mut Rodeo, pairs: &[(&str, ELValue)]) -> BindingSlice {
        let mut slice = BindingSlice::new();
        for (i, (name, value)) in pairs.iter().enumerate() {
            slice.insert(rodeo.get_or_intern(name), NodeId(i as u32), value.clone());
        }
        slice
    }

    #[test]
    fn ordering_filters() {
        let mut rodeo = Rodeo::new();
        let slice = slice_with(&mut rodeo, &[("x", ELValue::Int(10)), ("y", ELValue::Int(20))]);
        let x = ELVar::exis(rodeo.get_or_intern("x"));
        let y = ELVar::exis(rodeo.get_or_intern("y"));
        let cmp = ELComparison::new(x.clone(), CompOp::Lesser, Operand::Var(y.clone()));
        assert!(cmp.passes(&slice, None, &rodeo).unwrap());
        let cmp = ELComparison::new(y, CompOp::Lesser, Operand::Var(x));
        assert!(!cmp.passes(&slice, None, &rodeo).unwrap());
    }

    #[test]
    fn near_with_tolerance() {
        let mut rodeo = Rodeo::new();
        let slice = slice_with(&mut rodeo, &[("x", ELValue::Int(30)), ("y", ELValue::Int(35))]);
        let x = ELVar::exis(rodeo.get_or_intern("x"));
        let y = ELVar::exis(rodeo.get_or_intern("y"));
        let cmp = ELComparison::near(
            x.clone(),
            Operand::Var(y.clone()),
            Operand::Val(ELValue::Int(10)),
        );
        assert!(cmp.passes(&slice, None, &rodeo).unwrap());
        let tight = ELComparison::near(x, Operand::Var(y), Operand::Val(ELValue::Int(2)));
        assert!(!tight.passes(&slice, None, &rodeo).unwrap());
    }

    #[test]
    fn membership_over_lists() {
        let mut rodeo = Rodeo::new();
        let slice = slice_with(
            &mut rodeo,
            &[(
                "xs",
                ELValue::List(vec![ELValue::Int(1), ELValue::Int(2)]),
            ),
            ("x", ELValue::Int(2))],
        );
        let x = ELVar::exis(rodeo.get_or_intern("x"));
        let xs = ELVar::exis(rodeo.get_or_intern("xs"));
        let cmp = ELComparison::new(x.clone(), CompOp::Contains, Operand::Var(xs.clone()));
        assert!(cmp.passes(&slice, None, &rodeo).unwrap());
        let cmp = ELComparison::new(x, CompOp::NotContains, Operand::Var(xs));
        assert!(!cmp.passes(&slice, None, &rodeo).unwrap());
    }

    #[test]
    fn unbound_name_is_an_error() {
        let mut rodeo = Rodeo::new();
        let slice = BindingSlice::new();
        let x = ELVar::exis(rodeo.get_or_intern("x"));
        let cmp = ELComparison::new(x, CompOp::Equal, Operand::Val(ELValue::Int(1)));
        assert!(cmp.passes(&slice, None, &rodeo).is_err());
    }

    #[test]
    fn cross_variant_equality() {
        let mut rodeo = Rodeo::new();
        let slice = slice_with(&mut rodeo, &[("x", ELValue::rat(4, 2).unwrap())]);
        let x = ELVar::exis(rodeo.get_or_intern("x"));
        let cmp = ELComparison::new(x, CompOp::Equal, Operand::Val(ELValue::Int(2)));
        assert!(cmp.passes(&slice, None, &rodeo).unwrap());
    }
}
