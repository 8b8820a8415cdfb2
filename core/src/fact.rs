use std::hash::{Hash, Hasher};

use lasso::Rodeo;

use crate::arith::ELArithFact;
use crate::binding::{BindingSlice, NodeId};
use crate::compare::ELComparison;
use crate::error::ELError;
use crate::rule::ELRule;
use crate::value::ELValue;
use crate::var::{Accessor, Bound, ELVar, VarScope};

/// The two edge semantics: DOT lets siblings coexist, EX permits the parent
/// at most one child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Dot,
    Ex,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Dot => ".",
            EdgeKind::Ex => "!",
        }
    }
}

/// Where a fact is anchored: the trie root, or a node named by a path
/// variable (resolved to a pinned id once bound).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RootRef {
    Var(ELVar),
    Node(NodeId),
}

/// An element of a terminal list, before expansion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListElem {
    Val(ELValue),
    Var(ELVar),
    Fact(ELFact),
    List(Vec<ListElem>),
    Comp(ELComparison),
    Arith(ELArithFact),
}

/// The value slot of a path step. Beyond plain values and variables, rule
/// subtrees store structural sentinels: a query mark, a negation mark, and
/// comparison/arithmetic/rule leaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PairTerm {
    Val(ELValue),
    Var(ELVar),
    List(Vec<ListElem>),
    QueryMark,
    NotMark,
    Comp(ELComparison),
    Arith(ELArithFact),
    Rule(ELRule),
}

/// One step of a fact path. A pair's `edge` is its outgoing edge kind; the
/// terminal pair's edge is never consumed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathElem {
    Root(Option<RootRef>),
    Pair { term: PairTerm, edge: EdgeKind },
    Query,
}

impl PathElem {
    pub fn pair(term: PairTerm, edge: EdgeKind) -> PathElem {
        PathElem::Pair { term, edge }
    }
}

/// A rooted path: the unit of assertion, retraction and query.
/// Equality and hashing cover the path and polarity only; filled bindings
/// are carried state, not identity.
#[derive(Debug, Clone)]
pub struct ELFact {
    pub elems: Vec<PathElem>,
    pub negated: bool,
    /// Variables declared along the path, in order of appearance.
    pub vars: Vec<ELVar>,
    pub filled: BindingSlice,
}

impl PartialEq for ELFact {
    fn eq(&self, other: &Self) -> bool {
        self.negated == other.negated && self.elems == other.elems
    }
}

impl Eq for ELFact {}

impl Hash for ELFact {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.negated.hash(state);
        self.elems.hash(state);
    }
}

fn collect_vars(elems: &[PathElem]) -> Vec<ELVar> {
    let mut vars = Vec::new();
    let mut add = |v: &ELVar| {
        vars.push(v.clone());
        if let Some(Accessor::Var(inner)) = &v.access {
            vars.push((**inner).clone());
        }
    };
    for elem in elems {
        match elem {
            PathElem::Root(Some(RootRef::Var(v))) => add(v),
            PathElem::Pair {
                term: PairTerm::Var(v),
                ..
            } => add(v),
            _ => {}
        }
    }
    vars
}

impl ELFact {
    pub fn new() -> ELFact {
        ELFact {
            elems: Vec::new(),
            negated: false,
            vars: Vec::new(),
            filled: BindingSlice::new(),
        }
    }

    /// A fact anchored at the trie root.
    pub fn anchored() -> ELFact {
        ELFact::new().push(PathElem::Root(None))
    }

    pub fn anchored_at(root: RootRef) -> ELFact {
        ELFact::new().push(PathElem::Root(Some(root)))
    }

    pub fn from_elems(elems: Vec<PathElem>) -> ELFact {
        let vars = collect_vars(&elems);
        ELFact {
            elems,
            negated: false,
            vars,
            filled: BindingSlice::new(),
        }
    }

    pub fn push(mut self, elem: PathElem) -> ELFact {
        match &elem {
            PathElem::Root(Some(RootRef::Var(v))) => self.vars.push(v.clone()),
            PathElem::Pair {
                term: PairTerm::Var(v),
                ..
            } => {
                self.vars.push(v.clone());
                if let Some(Accessor::Var(inner)) = &v.access {
                    self.vars.push((**inner).clone());
                }
            }
            _ => {}
        }
        self.elems.push(elem);
        self
    }

    pub fn pair(self, value: ELValue) -> ELFact {
        self.push(PathElem::pair(PairTerm::Val(value), EdgeKind::Dot))
    }

    /// A pair whose children are exclusive: renders as `value!`.
    pub fn epair(self, value: ELValue) -> ELFact {
        self.push(PathElem::pair(PairTerm::Val(value), EdgeKind::Ex))
    }

    pub fn var(self, var: ELVar) -> ELFact {
        self.push(PathElem::pair(PairTerm::Var(var), EdgeKind::Dot))
    }

    pub fn evar(self, var: ELVar) -> ELFact {
        self.push(PathElem::pair(PairTerm::Var(var), EdgeKind::Ex))
    }

    pub fn list(self, items: Vec<ListElem>) -> ELFact {
        self.push(PathElem::pair(PairTerm::List(items), EdgeKind::Dot))
    }

    pub fn query(self) -> ELFact {
        self.push(PathElem::Query)
    }

    pub fn negate(&self) -> ELFact {
        let mut copy = self.clone();
        copy.negated = !copy.negated;
        copy
    }

    pub fn is_query(&self) -> bool {
        matches!(self.elems.last(), Some(PathElem::Query))
    }

    /// A copy guaranteed to end with the query sentinel.
    pub fn as_query(&self) -> ELFact {
        if self.is_query() {
            self.clone()
        } else {
            let mut copy = self.clone();
            copy.elems.push(PathElem::Query);
            copy
        }
    }

    /// A copy with the query sentinel stripped.
    pub fn without_query(&self) -> ELFact {
        let mut copy = self.clone();
        if copy.is_query() {
            copy.elems.pop();
        }
        copy
    }

    pub fn root(&self) -> Option<&PathElem> {
        self.elems.first()
    }

    pub fn starts_with_root(&self) -> bool {
        matches!(self.elems.first(), Some(PathElem::Root(_)))
    }

    pub fn is_valid_for_query(&self) -> bool {
        self.starts_with_root() && self.is_query()
    }

    /// Assertable: rooted, query-free, and list-free except at the terminal.
    pub fn is_valid_for_assert(&self) -> bool {
        if !self.starts_with_root() || self.is_query() {
            return false;
        }
        let last = self.elems.len() - 1;
        self.elems.iter().enumerate().skip(1).all(|(i, e)| match e {
            PathElem::Pair { term, .. } => !matches!(term, PairTerm::List(_)) || i == last,
            _ => false,
        })
    }

    pub fn has_forall(&self) -> bool {
        self.vars.iter().any(|v| v.scope == VarScope::Forall)
    }

    fn var_bound(var: &ELVar, slice: &BindingSlice, all_slice: Option<&BindingSlice>) -> bool {
        match var.scope {
            VarScope::Exis => slice.contains(var.name),
            VarScope::Forall => all_slice.is_some_and(|s| s.contains(var.name)),
        }
    }

    /// A copy with bound variables substituted by their slice values and
    /// the filled bindings merged. Unbound variables survive untouched.
    pub fn bind(
        &self,
        slice: &BindingSlice,
        all_slice: Option<&BindingSlice>,
    ) -> Result<ELFact, ELError> {
        let mut elems = Vec::with_capacity(self.elems.len());
        for elem in &self.elems {
            let new_elem = match elem {
                PathElem::Root(Some(RootRef::Var(v)))
                    if Self::var_bound(v, slice, all_slice) =>
                {
                    match v.resolve(slice, all_slice)? {
                        Bound::Node(id) => PathElem::Root(Some(RootRef::Node(id))),
                        Bound::Value(_) => {
                            return Err(ELError::consistency(
                                "root variable must be a path binding",
                            ));
                        }
                    }
                }
                PathElem::Pair {
                    term: PairTerm::Var(v),
                    edge,
                } if Self::var_bound(v, slice, all_slice) => {
                    match v.resolve(slice, all_slice)? {
                        Bound::Value(val) => PathElem::pair(PairTerm::Val(val), *edge),
                        Bound::Node(_) => {
                            return Err(ELError::consistency(
                                "path binding used inside a fact path",
                            ));
                        }
                    }
                }
                other => other.clone(),
            };
            elems.push(new_elem);
        }
        let mut filled = self.filled.clone();
        if self.has_forall() {
            if let Some(all) = all_slice {
                filled.merge(all);
            }
        }
        filled.merge(slice);
        Ok(ELFact {
            elems,
            negated: self.negated,
            vars: self.vars.clone(),
            filled,
        })
    }

    /// Pre-assertion expansion of a terminal list: one fact per leaf
    /// element. Embedded facts concatenate minus their root, carrying
    /// negation and query terminators as sentinel pairs. Nested lists
    /// recurse, an empty list yields the bare prefix, and a fact with no
    /// terminal list expands to itself alone.
    pub fn expand(&self) -> Vec<ELFact> {
        let Some(PathElem::Pair {
            term: PairTerm::List(items),
            ..
        }) = self.elems.last()
        else {
            return vec![self.clone()];
        };
        let prefix = &self.elems[..self.elems.len() - 1];
        if items.is_empty() {
            return vec![ELFact::from_elems(prefix.to_vec())];
        }
        let mut out = Vec::new();
        for item in items {
            match item {
                ListElem::Val(v) => out.push(ELFact::from_elems(
                    [prefix, &[PathElem::pair(PairTerm::Val(v.clone()), EdgeKind::Dot)]].concat(),
                )),
                ListElem::Var(v) => out.push(ELFact::from_elems(
                    [prefix, &[PathElem::pair(PairTerm::Var(v.clone()), EdgeKind::Dot)]].concat(),
                )),
                ListElem::Comp(c) => out.push(ELFact::from_elems(
                    [prefix, &[PathElem::pair(PairTerm::Comp(c.clone()), EdgeKind::Dot)]].concat(),
                )),
                ListElem::Arith(a) => out.push(ELFact::from_elems(
                    [prefix, &[PathElem::pair(PairTerm::Arith(a.clone()), EdgeKind::Dot)]]
                        .concat(),
                )),
                ListElem::List(inner) => {
                    let nested = ELFact::from_elems(
                        [
                            prefix,
                            &[PathElem::pair(PairTerm::List(inner.clone()), EdgeKind::Dot)],
                        ]
                        .concat(),
                    );
                    out.extend(nested.expand());
                }
                ListElem::Fact(f) => {
                    let mut elems = prefix.to_vec();
                    if f.negated {
                        elems.push(PathElem::pair(PairTerm::NotMark, EdgeKind::Dot));
                    }
                    for (i, e) in f.elems.iter().enumerate() {
                        match e {
                            // a variable root survives as a stored variable
                            PathElem::Root(Some(RootRef::Var(v))) if i == 0 => {
                                elems.push(PathElem::pair(PairTerm::Var(v.clone()), EdgeKind::Dot));
                            }
                            PathElem::Root(_) if i == 0 => {}
                            PathElem::Query => {
                                elems.push(PathElem::pair(PairTerm::QueryMark, EdgeKind::Dot));
                            }
                            other => elems.push(other.clone()),
                        }
                    }
                    out.extend(ELFact::from_elems(elems).expand());
                }
            }
        }
        out
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        let mut out = String::new();
        if self.negated {
            out.push('~');
        }
        // index of the last pair, which renders without its outgoing edge
        let last_pair = self
            .elems
            .iter()
            .rposition(|e| matches!(e, PathElem::Pair { .. }));
        for (i, elem) in self.elems.iter().enumerate() {
            match elem {
                PathElem::Root(None) => out.push('.'),
                PathElem::Root(Some(RootRef::Var(v))) => {
                    out.push_str(&v.render(rodeo));
                    out.push('.');
                }
                PathElem::Root(Some(RootRef::Node(id))) => {
                    out.push_str(&format!("<node {}>.", id.0));
                }
                PathElem::Pair { term, edge } => {
                    out.push_str(&render_term(term, rodeo));
                    if Some(i) != last_pair {
                        out.push_str(edge.as_str());
                    }
                }
                PathElem::Query => out.push('?'),
            }
        }
        out
    }
}

impl Default for ELFact {
    fn default() -> Self {
        ELFact::new()
    }
}

fn render_term(term: &PairTerm, rodeo: &Rodeo) -> String {
    match term {
        PairTerm::Val(v) => v.render(rodeo),
        PairTerm::Var(v) => v.render(rodeo),
        PairTerm::List(items) => {
            let inner: Vec<String> = items.iter().map(|e| render_list_elem(e, rodeo)).collect();
            format!("[{}]", inner.join(", "))
        }
        PairTerm::QueryMark => "?".to_string(),
        PairTerm::NotMark => "~".to_string(),
        PairTerm::Comp(c) => c.render(rodeo),
        PairTerm::Arith(a) => a.render(rodeo),
        PairTerm::Rule(r) => r.render(rodeo),
    }
}

fn render_list_elem(elem: &ListElem, rodeo: &Rodeo) -> String {
    match elem {
        ListElem::Val(v) => v.render(rodeo),
        ListElem::Var(v) => v.render(rodeo),
        ListElem::Fact(f) => f.render(rodeo),
        ListElem::List(items) => {
            let inner: Vec<String> = items.iter().map(|e| render_list_elem(e, rodeo)).collect();
            format!("[{}]", inner.join(", "))
        }
        ListElem::Comp(c) => c.render(rodeo),
        ListElem::Arith(a) => a.render(rodeo),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::NodeId;
    use lasso::Rodeo;

    fn sym(rodeo: &mut Rodeo, s: &str) -> ELValue {
        ELValue::sym(rodeo, s)
    }

    #[test]
    fn builders_render_surface_syntax() {
        let mut rodeo = Rodeo::new();
        let a = sym(&mut rodeo, "a");
        let b = sym(&mut rodeo, "b");
        let c = sym(&mut rodeo, "c");
        let fact = ELFact::anchored().pair(a).epair(b).pair(c);
        assert_eq!(fact.render(&rodeo), ".a.b!c");
        assert_eq!(fact.as_query().render(&rodeo), ".a.b!c?");
        assert_eq!(fact.negate().render(&rodeo), "~.a.b!c");
    }

    #[test]
    fn expansion_is_identity_on_flat_facts() {
        let mut rodeo = Rodeo::new();
        let a = sym(&mut rodeo, "a");
        let fact = ELFact::anchored().pair(a);
        let expanded = fact.expand();
        assert_eq!(expanded, vec![fact]);
    }

    #[test]
    fn list_terminal_expands_one_per_leaf() {
        let mut rodeo = Rodeo::new();
        let a = sym(&mut rodeo, "a");
        let b = sym(&mut rodeo, "b");
        let fact = ELFact::anchored().pair(a).pair(b).list(vec![
            ListElem::Val(ELValue::Int(1)),
            ListElem::Val(ELValue::Int(2)),
            ListElem::List(vec![ListElem::Val(ELValue::Int(3)), ListElem::Val(ELValue::Int(4))]),
        ]);
        let expanded = fact.expand();
        let rendered: Vec<String> = expanded.iter().map(|f| f.render(&rodeo)).collect();
        assert_eq!(rendered, vec![".a.b.1", ".a.b.2", ".a.b.3", ".a.b.4"]);
    }

    #[test]
    fn empty_list_yields_prefix_alone() {
        let mut rodeo = Rodeo::new();
        let a = sym(&mut rodeo, "a");
        let fact = ELFact::anchored().pair(a).list(vec![]);
        let expanded = fact.expand();
        assert_eq!(expanded.len(), 1);
        assert_eq!(expanded[0].render(&rodeo), ".a");
    }

    #[test]
    fn embedded_facts_concatenate_without_their_root() {
        let mut rodeo = Rodeo::new();
        let conds = sym(&mut rodeo, "conditions");
        let a = sym(&mut rodeo, "a");
        let b = sym(&mut rodeo, "b");
        let x = ELVar::exis(rodeo.get_or_intern("x"));
        let inner = ELFact::anchored().pair(a.clone()).var(x).query();
        let negated = ELFact::anchored().pair(a).pair(b).negate();
        let fact = ELFact::anchored()
            .pair(conds)
            .list(vec![ListElem::Fact(inner), ListElem::Fact(negated)]);
        let rendered: Vec<String> = fact.expand().iter().map(|f| f.render(&rodeo)).collect();
        assert_eq!(rendered, vec![".conditions.a.$x.?", ".conditions.~.a.b"]);
    }

    #[test]
    fn bind_substitutes_known_variables() {
        let mut rodeo = Rodeo::new();
        let a = sym(&mut rodeo, "a");
        let x = rodeo.get_or_intern("x");
        let y = rodeo.get_or_intern("y");
        let fact = ELFact::anchored()
            .pair(a)
            .var(ELVar::exis(x))
            .var(ELVar::exis(y));
        let mut slice = BindingSlice::new();
        slice.insert(x, NodeId(1), ELValue::Int(7));
        let bound = fact.bind(&slice, None).unwrap();
        assert_eq!(bound.render(&rodeo), ".a.7.$y");
        assert!(bound.filled.contains(x));
    }

    #[test]
    fn bind_pins_root_path_variables() {
        let mut rodeo = Rodeo::new();
        let x = rodeo.get_or_intern("x");
        let b = sym(&mut rodeo, "bloo");
        let fact = ELFact::anchored_at(RootRef::Var(ELVar::exis(x).path())).pair(b);
        let mut slice = BindingSlice::new();
        slice.insert(x, NodeId(9), ELValue::Int(0));
        let bound = fact.bind(&slice, None).unwrap();
        assert!(matches!(
            bound.elems[0],
            PathElem::Root(Some(RootRef::Node(NodeId(9))))
        ));
    }

    #[test]
    fn assert_validity_rejects_mid_path_lists() {
        let mut rodeo = Rodeo::new();
        let a = sym(&mut rodeo, "a");
        let b = sym(&mut rodeo, "b");
        let ok = ELFact::anchored()
            .pair(a.clone())
            .list(vec![ListElem::Val(ELValue::Int(1))]);
        assert!(ok.is_valid_for_assert());
        let bad = ELFact::anchored()
            .push(PathElem::pair(
                PairTerm::List(vec![ListElem::Val(ELValue::Int(1))]),
                EdgeKind::Dot,
            ))
            .pair(b);
        assert!(!bad.is_valid_for_assert());
        assert!(!ELFact::anchored().pair(a).query().is_valid_for_assert());
    }
}
