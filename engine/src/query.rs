use el_core::{
    BindingFrame, BindingSlice, ELError, ELFact, ELResult, ELSuccess, EdgeKind, NodeId, PairTerm,
    PathElem, RootRef,
};
use tracing::debug;

use crate::trie::{ELTrie, NodeValue};

impl ELTrie {
    /// Test a query fact against the trie, honoring negation: a negated
    /// query succeeds (with one slice preserving the input bindings) exactly
    /// when the underlying match fails.
    pub fn query(&self, fact: &ELFact) -> Result<ELResult, ELError> {
        let result = self.get_matches(fact)?;
        debug!(negated = fact.negated, hit = result.is_success(), "query");
        if !fact.negated {
            return Ok(result);
        }
        match result {
            ELResult::Fail => {
                let frame = BindingFrame::from_slices(vec![fact.filled.clone()]);
                Ok(ELResult::Success(ELSuccess {
                    path: Some(fact.clone()),
                    bindings: frame,
                    nodes: Vec::new(),
                }))
            }
            ELResult::Success(_) => Ok(ELResult::Fail),
        }
    }

    /// Positive unification: every concrete binding slice under which the
    /// path exists, each anchored at the node it reached. All surviving
    /// slices must share one key set; a mismatch is a Fail.
    pub fn get_matches(&self, fact: &ELFact) -> Result<ELResult, ELError> {
        if !fact.is_valid_for_query() {
            return Err(ELError::consistency("not a valid query fact"));
        }
        let start = match fact.root() {
            Some(PathElem::Root(None)) => self.root(),
            Some(PathElem::Root(Some(RootRef::Node(id)))) => {
                if !self.contains_id(*id) {
                    return Err(ELError::consistency("root node not found"));
                }
                *id
            }
            Some(PathElem::Root(Some(RootRef::Var(var)))) => match fact.filled.get(var.name) {
                Some(entry) => entry.node,
                None => {
                    return Err(ELError::consistency("unresolved root variable in query"));
                }
            },
            _ => return Err(ELError::consistency("query does not start at a root")),
        };
        let slices = self.sub_get(start, &fact.elems[1..], &fact.filled, EdgeKind::Dot);
        if slices.is_empty() {
            return Ok(ELResult::Fail);
        }
        let first = &slices[0];
        if !slices.iter().all(|s| s.same_keys(first)) {
            debug!("discarding result with inconsistent binding keys");
            return Ok(ELResult::Fail);
        }
        Ok(ELResult::Success(ELSuccess::with_bindings(
            Some(fact.clone()),
            BindingFrame::from_slices(slices),
        )))
    }

    /// The recursive walk. `pending` is the edge kind the next step must
    /// satisfy: an EX step matches only an EX-edge child, a DOT step
    /// matches either kind. Variables branch over the children; a name met
    /// twice must re-bind to the same value or the branch dies.
    fn sub_get(
        &self,
        start: NodeId,
        elems: &[PathElem],
        bindings: &BindingSlice,
        pending: EdgeKind,
    ) -> Vec<BindingSlice> {
        let mut current = start;
        let mut pending = pending;
        let mut i = 0;
        while i < elems.len() {
            match &elems[i] {
                PathElem::Query => break,
                PathElem::Root(_) => return Vec::new(),
                PathElem::Pair { term, edge } => {
                    let key = match term {
                        PairTerm::Var(var) => {
                            if let Some(entry) = bindings.get(var.name) {
                                // already bound: must match that value exactly
                                NodeValue::Val(entry.value.clone())
                            } else {
                                let mut results = Vec::new();
                                for child_id in self.node(current).children() {
                                    let child = self.node(child_id);
                                    if pending == EdgeKind::Ex && child.edge != EdgeKind::Ex {
                                        continue;
                                    }
                                    let NodeValue::Val(val) = &child.value else {
                                        continue;
                                    };
                                    let mut extended = bindings.clone();
                                    extended.insert(var.name, child_id, val.clone());
                                    results.extend(self.sub_get(
                                        child_id,
                                        &elems[i + 1..],
                                        &extended,
                                        *edge,
                                    ));
                                }
                                return results;
                            }
                        }
                        PairTerm::Val(v) => NodeValue::Val(v.clone()),
                        PairTerm::QueryMark => NodeValue::QueryMark,
                        PairTerm::NotMark => NodeValue::NotMark,
                        PairTerm::Comp(c) => NodeValue::Comp(c.clone()),
                        PairTerm::Arith(a) => NodeValue::Arith(a.clone()),
                        PairTerm::Rule(r) => NodeValue::Rule(r.clone()),
                        // lists are not path-addressable
                        PairTerm::List(_) => return Vec::new(),
                    };
                    match self.node(current).get_child(&key) {
                        Some(child)
                            if pending == EdgeKind::Dot
                                || self.node(child).edge == EdgeKind::Ex =>
                        {
                            current = child;
                        }
                        _ => return Vec::new(),
                    }
                    pending = *edge;
                    i += 1;
                }
            }
        }
        vec![BindingSlice::anchored(bindings, current)]
    }
}
