use lasso::{Rodeo, Spur};

use crate::binding::{BindingSlice, NodeId};
use crate::error::ELError;
use crate::value::ELValue;

/// Scope applicability of a variable: `$x` binds one concrete value,
/// `@x` broadcasts across every surviving slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarScope {
    Exis,
    Forall,
}

/// Optional index into a list-valued leaf: `$x(3)` or `$x($y)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Accessor {
    Index(i64),
    Var(Box<ELVar>),
}

/// A binding site. `is_path` variables (`$..x`) bind the node identity
/// rather than the leaf value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ELVar {
    pub name: Spur,
    pub scope: VarScope,
    pub is_path: bool,
    pub access: Option<Accessor>,
}

/// What a variable resolves to under a slice.
#[derive(Debug, Clone, PartialEq)]
pub enum Bound {
    Value(ELValue),
    Node(NodeId),
}

impl ELVar {
    pub fn exis(name: Spur) -> ELVar {
        ELVar {
            name,
            scope: VarScope::Exis,
            is_path: false,
            access: None,
        }
    }

    pub fn forall(name: Spur) -> ELVar {
        ELVar {
            name,
            scope: VarScope::Forall,
            is_path: false,
            access: None,
        }
    }

    pub fn path(mut self) -> ELVar {
        self.is_path = true;
        self
    }

    pub fn with_access(mut self, access: Accessor) -> ELVar {
        self.access = Some(access);
        self
    }

    /// Resolve against a slice, using `all_slice` for FORALL-scoped names.
    pub fn resolve(
        &self,
        slice: &BindingSlice,
        all_slice: Option<&BindingSlice>,
    ) -> Result<Bound, ELError> {
        let focus = match self.scope {
            VarScope::Forall => all_slice
                .ok_or_else(|| ELError::consistency("forall variable outside a broadcast"))?,
            VarScope::Exis => slice,
        };
        let entry = focus
            .get(self.name)
            .ok_or_else(|| ELError::consistency("unbound variable"))?;
        if self.is_path {
            return Ok(Bound::Node(entry.node));
        }
        match &self.access {
            None => Ok(Bound::Value(entry.value.clone())),
            Some(access) => {
                let index = match access {
                    Accessor::Index(i) => *i,
                    Accessor::Var(v) => match v.resolve(slice, all_slice)? {
                        Bound::Value(ELValue::Int(i)) => i,
                        _ => {
                            return Err(ELError::consistency(
                                "accessor variable is not an integer",
                            ));
                        }
                    },
                };
                let ELValue::List(items) = &entry.value else {
                    return Err(ELError::consistency("accessor over a non-list value"));
                };
                let idx = usize::try_from(index)
                    .ok()
                    .filter(|i| *i < items.len())
                    .ok_or_else(|| ELError::consistency("accessor index out of range"))?;
                Ok(Bound::Value(items[idx].clone()))
            }
        }
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        let mut out = String::new();
        out.push(match self.scope {
            VarScope::Exis => '$',
            VarScope::Forall => '@',
        });
        if self.is_path {
            out.push_str("..");
        }
        out.push_str(rodeo.resolve(&self.name));
        match &self.access {
            Some(Accessor::Index(i)) => out.push_str(&format!("({i})")),
            Some(Accessor::Var(v)) => out.push_str(&format!("({})", v.render(rodeo))),
            None => {}
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lasso::Rodeo;

    #[test]
    fn resolves_value_and_node() {
        let mut rodeo = Rodeo::new();
        let x = rodeo.get_or_intern("x");
        let mut slice = BindingSlice::new();
        slice.insert(x, NodeId(7), ELValue::Int(42));

        let var = ELVar::exis(x);
        assert_eq!(
            var.resolve(&slice, None).unwrap(),
            Bound::Value(ELValue::Int(42))
        );
        let pvar = ELVar::exis(x).path();
        assert_eq!(pvar.resolve(&slice, None).unwrap(), Bound::Node(NodeId(7)));
    }

    #[test]
    fn accessor_indexes_into_lists() {
        let mut rodeo = Rodeo::new();
        let x = rodeo.get_or_intern("x");
        let i = rodeo.get_or_intern("i");
        let mut slice = BindingSlice::new();
        slice.insert(
            x,
            NodeId(0),
            ELValue::List(vec![ELValue::Int(10), ELValue::Int(20)]),
        );
        slice.insert(i, NodeId(1), ELValue::Int(1));

        let direct = ELVar::exis(x).with_access(Accessor::Index(0));
        assert_eq!(
            direct.resolve(&slice, None).unwrap(),
            Bound::Value(ELValue::Int(10))
        );
        let indirect = ELVar::exis(x).with_access(Accessor::Var(Box::new(ELVar::exis(i))));
        assert_eq!(
            indirect.resolve(&slice, None).unwrap(),
            Bound::Value(ELValue::Int(20))
        );
        let oob = ELVar::exis(x).with_access(Accessor::Index(5));
        assert!(oob.resolve(&slice, None).is_err());
    }

    #[test]
    fn forall_requires_broadcast_slice() {
        let mut rodeo = Rodeo::new();
        let x = rodeo.get_or_intern("x");
        let var = ELVar::forall(x);
        let slice = BindingSlice::new();
        assert!(var.resolve(&slice, None).is_err());

        let mut all = BindingSlice::new();
        all.insert(x, NodeId(2), ELValue::Int(5));
        assert_eq!(
            var.resolve(&slice, Some(&all)).unwrap(),
            Bound::Value(ELValue::Int(5))
        );
    }

    #[test]
    fn render_forms() {
        let mut rodeo = Rodeo::new();
        let x = rodeo.get_or_intern("x");
        assert_eq!(ELVar::exis(x).render(&rodeo), "$x");
        assert_eq!(ELVar::forall(x).render(&rodeo), "@x");
        assert_eq!(ELVar::exis(x).path().render(&rodeo), "$..x");
        assert_eq!(
            ELVar::exis(x).with_access(Accessor::Index(3)).render(&rodeo),
            "$x(3)"
        );
    }
}
