use el_core::{
    ArithOp, ArithTarget, BindingFrame, BindingSlice, BindingStack, Bound, ELArithFact,
    ELComparison, ELError, ELFact, ELResult, ELRule, ELSuccess, ELValue, NodeId, Operand,
    PathElem, RootRef, RuleAction, eval_binary,
};
use el_parser::{SECTIONS, Section, Statement, parse, parse_one_fact};
use lasso::{Rodeo, Spur};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rustc_hash::FxHashMap;
use tracing::{debug, warn};

use crate::select::{Selector, UniformSelector};
use crate::trie::{ELTrie, NodeValue, TrieMetrics};

/// Phases of one node-execution step; Fail is a sink from any of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Conditions,
    Comparisons,
    Selection,
    Arithmetic,
    Actions,
}

/// The unified runtime: parses strings into IR and acts on it. Owns the
/// trie, the binding stack, the global path aliases and the random stream.
/// Single-threaded; callers serialize externally.
pub struct ELRuntime {
    pub interner: Rodeo,
    trie: ELTrie,
    stack: BindingStack,
    globals: FxHashMap<Spur, ELFact>,
    selector: Box<dyn Selector>,
    rng: StdRng,
    history: Vec<Statement>,
}

impl Default for ELRuntime {
    fn default() -> Self {
        ELRuntime::new()
    }
}

impl ELRuntime {
    pub fn new() -> ELRuntime {
        ELRuntime::with_rng(StdRng::from_entropy())
    }

    /// Seeded construction for reproducible selection and `rnd` results.
    pub fn with_seed(seed: u64) -> ELRuntime {
        ELRuntime::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> ELRuntime {
        ELRuntime {
            interner: Rodeo::new(),
            trie: ELTrie::new(),
            stack: BindingStack::new(),
            globals: FxHashMap::default(),
            selector: Box::new(UniformSelector),
            rng,
            history: Vec::new(),
        }
    }

    pub fn set_selector(&mut self, selector: Box<dyn Selector>) {
        self.selector = selector;
    }

    pub fn trie(&self) -> &ELTrie {
        &self.trie
    }

    // ─── Binding Stack ───────────────────────────────────────────

    pub fn push_level(&mut self) {
        self.stack.push_level();
    }

    pub fn pop_level(&mut self) {
        self.stack.pop_level();
    }

    pub fn top_frame(&self) -> BindingFrame {
        self.stack.top()
    }

    pub fn replace_top(&mut self, frame: BindingFrame) {
        self.stack.replace_top(frame);
    }

    // ─── String Entry Points ─────────────────────────────────────

    /// Parse an input and act on every statement, in caller order. Plain
    /// facts expand their terminal lists before assertion; queries and
    /// retractions do not expand.
    pub fn run(&mut self, input: &str) -> Result<Vec<ELResult>, ELError> {
        let stmts = parse(input, &mut self.interner)?;
        let mut results = Vec::new();
        for stmt in stmts {
            match stmt {
                Statement::Fact(f) if !f.is_query() && !f.negated => {
                    for fact in f.expand() {
                        results.push(self.act(Statement::Fact(fact))?);
                    }
                }
                other => results.push(self.act(other)?),
            }
        }
        Ok(results)
    }

    /// All statements of the input hold.
    pub fn holds(&mut self, input: &str) -> Result<bool, ELError> {
        Ok(self.run(input)?.iter().all(|r| r.is_success()))
    }

    // ─── Dispatcher ──────────────────────────────────────────────

    /// Single entry for acting on one IR statement.
    pub fn act(&mut self, stmt: Statement) -> Result<ELResult, ELError> {
        self.history.push(stmt.clone());
        match stmt {
            Statement::Fact(f) => {
                if f.is_query() {
                    self.stack.push_level();
                    let frame = self.stack.top();
                    let outcome = self.fact_query(&f, frame);
                    self.stack.pop_level();
                    let (result, _frame) = outcome?;
                    Ok(result)
                } else if f.negated {
                    self.fact_retract(&f)
                } else {
                    self.fact_assert(&f)
                }
            }
            Statement::Bind { var, target } => {
                match target {
                    Some(fact) => {
                        self.globals.insert(var.name, fact);
                    }
                    None => {
                        self.globals.remove(&var.name);
                    }
                }
                Ok(ELResult::success())
            }
            Statement::Arith(a) => {
                let mut scratch = BindingSlice::new();
                self.apply_arith(&a, &mut scratch, None)
            }
        }
    }

    // ─── Fact Operations ─────────────────────────────────────────

    fn fact_assert(&mut self, fact: &ELFact) -> Result<ELResult, ELError> {
        let fact = self.resolve_root(fact)?;
        Ok(self.trie.push(&fact))
    }

    fn fact_retract(&mut self, fact: &ELFact) -> Result<ELResult, ELError> {
        let fact = self.resolve_root(fact)?;
        Ok(self.trie.pop(&fact))
    }

    /// Query under a frame: bind the query per slice, run each against the
    /// trie, and flatten the surviving slices into the narrowed frame. An
    /// empty narrowed frame is a Fail and leaves the input frame untouched.
    pub fn fact_query(
        &self,
        query: &ELFact,
        frame: BindingFrame,
    ) -> Result<(ELResult, BindingFrame), ELError> {
        if frame.is_empty() {
            return Ok((ELResult::Fail, frame));
        }
        let mut narrowed = BindingFrame::empty();
        for slice in frame.iter() {
            let bound = query.bind(slice, None)?;
            let bound = self.resolve_root(&bound)?;
            if let ELResult::Success(s) = self.trie.query(&bound)? {
                for out in s.bindings.iter() {
                    narrowed.push(out.clone());
                }
            }
        }
        if narrowed.is_empty() {
            debug!("query narrowed the frame to nothing");
            return Ok((ELResult::Fail, frame));
        }
        let success = ELSuccess::with_bindings(Some(query.clone()), narrowed.clone());
        Ok((ELResult::Success(success), narrowed))
    }

    /// Pin a variable root to a node id: first from the fact's own filled
    /// bindings, then through the global alias store.
    fn resolve_root(&self, fact: &ELFact) -> Result<ELFact, ELError> {
        let Some(PathElem::Root(Some(RootRef::Var(var)))) = fact.root() else {
            return Ok(fact.clone());
        };
        if let Some(entry) = fact.filled.get(var.name) {
            let mut out = fact.clone();
            out.elems[0] = PathElem::Root(Some(RootRef::Node(entry.node)));
            return Ok(out);
        }
        let Some(alias) = self.globals.get(&var.name) else {
            return Err(ELError::consistency("unresolved root variable"));
        };
        match self.trie.query(&alias.as_query())? {
            ELResult::Success(s) if !s.nodes.is_empty() => {
                let mut out = fact.clone();
                out.elems[0] = PathElem::Root(Some(RootRef::Node(s.nodes[0])));
                Ok(out)
            }
            _ => Err(ELError::consistency("global binding target not in the trie")),
        }
    }

    // ─── Arithmetic ──────────────────────────────────────────────

    fn eval_op(&mut self, op: ArithOp, a: &ELValue, b: &ELValue) -> Result<ELValue, ELError> {
        if op == ArithOp::Rand {
            return Ok(ELValue::Float(self.rng.r#gen::<f64>()));
        }
        eval_binary(op, a, b)
    }

    /// In-place node update preserving identity: the parent re-keys its
    /// child map, the id stays.
    fn apply_to_node(
        &mut self,
        id: NodeId,
        op: ArithOp,
        rhs: &ELValue,
    ) -> Result<ELValue, ELError> {
        let old = match self.trie.get(id).map(|n| n.value.clone()) {
            Some(NodeValue::Val(v)) => v,
            _ => return Err(ELError::consistency("arithmetic target is not a value node")),
        };
        let new = self.eval_op(op, &old, rhs)?;
        self.trie.update_value(id, new.clone())?;
        debug!(node = id.0, "updated in place");
        Ok(new)
    }

    /// Apply one arithmetic action under a slice. Plain variable targets
    /// update the slice only; path variables and fact targets write through
    /// to the trie and refresh the slice's value map.
    fn apply_arith(
        &mut self,
        action: &ELArithFact,
        slice: &mut BindingSlice,
        all_slice: Option<&BindingSlice>,
    ) -> Result<ELResult, ELError> {
        let rhs = match &action.rhs {
            Operand::Val(v) => v.clone(),
            Operand::Var(v) => match v.resolve(slice, all_slice)? {
                Bound::Value(val) => val,
                Bound::Node(_) => {
                    return Err(ELError::consistency(
                        "arithmetic right-hand side is a path binding",
                    ));
                }
            },
        };
        match &action.target {
            ArithTarget::Var(v) if !v.is_path => {
                let current = match v.resolve(slice, all_slice)? {
                    Bound::Value(val) => val,
                    Bound::Node(_) => {
                        return Err(ELError::consistency("path binding without path marker"));
                    }
                };
                let new = self.eval_op(action.op, &current, &rhs)?;
                slice.update_value(v.name, new);
                Ok(ELResult::success())
            }
            ArithTarget::Var(v) => {
                let id = match v.resolve(slice, all_slice)? {
                    Bound::Node(id) => id,
                    Bound::Value(_) => {
                        return Err(ELError::consistency("path variable resolved to a value"));
                    }
                };
                let new = self.apply_to_node(id, action.op, &rhs)?;
                slice.update_value(v.name, new);
                Ok(ELResult::success())
            }
            ArithTarget::Node(id) => {
                self.apply_to_node(*id, action.op, &rhs)?;
                Ok(ELResult::success())
            }
            ArithTarget::Fact(f) => {
                let bound = f.bind(slice, all_slice)?;
                let resolved = self.resolve_root(&bound)?;
                match self.trie.query(&resolved.as_query())? {
                    ELResult::Success(s) if !s.nodes.is_empty() => {
                        self.apply_to_node(s.nodes[0], action.op, &rhs)?;
                        Ok(ELResult::success())
                    }
                    _ => Ok(ELResult::Fail),
                }
            }
        }
    }

    // ─── Rule / Node Execution ───────────────────────────────────

    /// Run the braced rule form under a fresh frame level.
    pub fn run_rule(&mut self, rule: &ELRule) -> Result<ELResult, ELError> {
        self.stack.push_level();
        let result = self.execute_pipeline(&rule.conditions, &rule.comparisons, &[], &rule.actions);
        self.stack.pop_level();
        result
    }

    /// Execute a node named by a query: either its braced rule leaf, or the
    /// conditions/comparisons/arithmetic/actions subtree pipeline.
    pub fn run_node_str(&mut self, input: &str) -> Result<ELResult, ELError> {
        let fact = parse_one_fact(input, &mut self.interner)?;
        self.run_node(&fact)
    }

    pub fn run_node(&mut self, node_query: &ELFact) -> Result<ELResult, ELError> {
        let Some(node) = self.locate(node_query)? else {
            return Ok(ELResult::Fail);
        };
        let rule = self.trie.node(node).children().find_map(|c| {
            match &self.trie.node(c).value {
                NodeValue::Rule(r) => Some(r.clone()),
                _ => None,
            }
        });
        if let Some(rule) = rule {
            return self.run_rule(&rule);
        }
        let conditions = self.section_facts(node, Section::Conditions);
        let comparisons = self.section_comparisons_of(node);
        let ariths = self.section_ariths(node);
        let actions = self.section_actions(node);
        self.stack.push_level();
        let result = self.execute_pipeline(&conditions, &comparisons, &ariths, &actions);
        self.stack.pop_level();
        result
    }

    /// The shared step pipeline. Condition failure aborts quietly with no
    /// partial actions; later failures abort the remainder without rollback.
    fn execute_pipeline(
        &mut self,
        conditions: &[ELFact],
        comparisons: &[ELComparison],
        ariths: &[ELArithFact],
        actions: &[RuleAction],
    ) -> Result<ELResult, ELError> {
        let mut phase = Phase::Conditions;
        let mut frame = self.stack.top();
        for cond in conditions {
            let (res, next) = self.fact_query(&cond.as_query(), frame)?;
            if res.is_fail() {
                warn!(?phase, "condition failed, aborting");
                return Ok(ELResult::Fail);
            }
            frame = next;
        }

        phase = Phase::Comparisons;
        frame = self.filter_by_comparisons(comparisons, frame)?;
        if frame.is_empty() {
            warn!(?phase, "comparisons eliminated every slice");
            return Ok(ELResult::Fail);
        }

        phase = Phase::Selection;
        let idx = self.selector.select(frame.len(), &mut self.rng);
        let mut selection = frame.slices()[idx].clone();
        debug!(?phase, chosen = idx, of = frame.len(), "slice selected");

        phase = Phase::Arithmetic;
        debug!(?phase, count = ariths.len(), "applying updates");
        for action in ariths {
            self.apply_arith(action, &mut selection, None)?;
        }

        phase = Phase::Actions;
        debug!(?phase, count = actions.len(), "dispatching");
        for action in actions {
            self.dispatch_action(action, &selection, &frame)?;
        }

        Ok(ELResult::Success(ELSuccess::with_bindings(
            None,
            BindingFrame::from_slices(vec![selection]),
        )))
    }

    /// FORALL actions broadcast once per surviving slice; everything else
    /// binds against the selected slice alone.
    fn dispatch_action(
        &mut self,
        action: &RuleAction,
        selection: &BindingSlice,
        frame: &BindingFrame,
    ) -> Result<(), ELError> {
        match action {
            RuleAction::Fact(f) => {
                if f.has_forall() {
                    for slice in frame.iter() {
                        let bound = f.bind(selection, Some(slice))?;
                        self.dispatch_fact(bound)?;
                    }
                } else {
                    let bound = f.bind(selection, None)?;
                    self.dispatch_fact(bound)?;
                }
            }
            RuleAction::Arith(a) => {
                if a.has_forall() {
                    for slice in frame.iter() {
                        let mut sel = selection.clone();
                        self.apply_arith(a, &mut sel, Some(slice))?;
                    }
                } else {
                    let mut sel = selection.clone();
                    self.apply_arith(a, &mut sel, None)?;
                }
            }
        }
        Ok(())
    }

    fn dispatch_fact(&mut self, fact: ELFact) -> Result<ELResult, ELError> {
        self.history.push(Statement::Fact(fact.clone()));
        if fact.negated {
            self.fact_retract(&fact)
        } else {
            let mut last = ELResult::success();
            for f in fact.expand() {
                last = self.fact_assert(&f)?;
            }
            Ok(last)
        }
    }

    fn filter_by_comparisons(
        &self,
        comparisons: &[ELComparison],
        frame: BindingFrame,
    ) -> Result<BindingFrame, ELError> {
        let mut frame = frame;
        for comp in comparisons {
            let mut kept = Vec::new();
            for slice in frame.iter() {
                if comp.passes(slice, None, &self.interner)? {
                    kept.push(slice.clone());
                }
            }
            frame = BindingFrame::from_slices(kept);
        }
        Ok(frame)
    }

    // ─── Section Runners ─────────────────────────────────────────

    /// Run the leaf facts of a section node as queries, each narrowing the
    /// frame.
    pub fn run_conditions(
        &mut self,
        section_query: &str,
        bindings: Option<BindingFrame>,
    ) -> Result<ELResult, ELError> {
        let fact = parse_one_fact(section_query, &mut self.interner)?;
        let Some(node) = self.locate(&fact)? else {
            return Ok(ELResult::Fail);
        };
        let conditions = self.trie.leaf_facts(node);
        let mut frame = bindings.unwrap_or_default();
        for cond in &conditions {
            let (res, next) = self.fact_query(&cond.as_query(), frame)?;
            if res.is_fail() {
                return Ok(ELResult::Fail);
            }
            frame = next;
        }
        Ok(ELResult::Success(ELSuccess::with_bindings(None, frame)))
    }

    /// Filter a frame through the comparison leaves of a section node.
    pub fn run_comparisons(
        &mut self,
        section_query: &str,
        frame: BindingFrame,
    ) -> Result<BindingFrame, ELError> {
        let fact = parse_one_fact(section_query, &mut self.interner)?;
        let Some(node) = self.locate(&fact)? else {
            return Ok(BindingFrame::empty());
        };
        let comparisons = self.comparison_leaves(node);
        self.filter_by_comparisons(&comparisons, frame)
    }

    /// Apply the arithmetic leaves of a section node under a slice,
    /// returning the updated slice.
    pub fn run_arithmetic(
        &mut self,
        section_query: &str,
        binding: &BindingSlice,
    ) -> Result<BindingSlice, ELError> {
        let fact = parse_one_fact(section_query, &mut self.interner)?;
        let Some(node) = self.locate(&fact)? else {
            return Ok(binding.clone());
        };
        let actions = self.arith_leaves(node);
        let mut updated = binding.clone();
        for action in &actions {
            self.apply_arith(action, &mut updated, None)?;
        }
        Ok(updated)
    }

    /// Dispatch the action leaves of a section node, bound against an
    /// optional slice, broadcasting FORALL actions over an optional frame.
    pub fn run_actions(
        &mut self,
        section_query: &str,
        binding: Option<&BindingSlice>,
        broadcast: Option<&BindingFrame>,
    ) -> Result<ELResult, ELError> {
        let fact = parse_one_fact(section_query, &mut self.interner)?;
        let Some(node) = self.locate(&fact)? else {
            return Ok(ELResult::Fail);
        };
        let actions = self.action_leaves(node);
        let selection = binding.cloned().unwrap_or_default();
        let frame = broadcast.cloned().unwrap_or_else(BindingFrame::empty);
        for action in &actions {
            self.dispatch_action(action, &selection, &frame)?;
        }
        Ok(ELResult::success())
    }

    /// Pick an output string under a node (one of a list leaf's options,
    /// chosen through the selector) and interpolate `{name}` holes from the
    /// slice.
    pub fn run_output(
        &mut self,
        node_query: &str,
        binding: Option<&BindingSlice>,
    ) -> Result<Option<String>, ELError> {
        let fact = parse_one_fact(node_query, &mut self.interner)?;
        let Some(node) = self.locate(&fact)? else {
            return Ok(None);
        };
        let Some(out_node) = self.section_node(node, Section::Output) else {
            return Ok(None);
        };
        let candidates: Vec<ELValue> = self
            .trie
            .leaf_chains(out_node)
            .into_iter()
            .filter_map(|chain| chain.last().and_then(|(v, _)| v.as_value().cloned()))
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let idx = self.selector.select(candidates.len(), &mut self.rng);
        let text = candidates[idx].bare_text(&self.interner);
        Ok(Some(self.interpolate(&text, binding)))
    }

    /// Pick one of a node's `next` children and resolve it to its own
    /// root-level node.
    pub fn next_node(&mut self, node_query: &str) -> Result<Option<NodeId>, ELError> {
        let fact = parse_one_fact(node_query, &mut self.interner)?;
        let Some(node) = self.locate(&fact)? else {
            return Ok(None);
        };
        self.next_node_from(node)
    }

    pub fn next_node_from(&mut self, node: NodeId) -> Result<Option<NodeId>, ELError> {
        let Some(next_node) = self.section_node(node, Section::Next) else {
            return Ok(None);
        };
        let candidates: Vec<ELValue> = self
            .trie
            .node(next_node)
            .children()
            .filter_map(|c| self.trie.node(c).value.as_value().cloned())
            .collect();
        if candidates.is_empty() {
            return Ok(None);
        }
        let idx = self.selector.select(candidates.len(), &mut self.rng);
        let target = ELFact::anchored().pair(candidates[idx].clone()).query();
        match self.trie.query(&target)? {
            ELResult::Success(s) => Ok(s.nodes.first().copied()),
            ELResult::Fail => Ok(None),
        }
    }

    // ─── Section Extraction ──────────────────────────────────────

    fn locate(&self, fact: &ELFact) -> Result<Option<NodeId>, ELError> {
        let q = fact.as_query();
        match self.trie.query(&q)? {
            ELResult::Success(s) => Ok(s.nodes.first().copied()),
            ELResult::Fail => Ok(None),
        }
    }

    fn section_node(&self, node: NodeId, section: Section) -> Option<NodeId> {
        self.trie.node(node).children().find(|c| {
            match &self.trie.node(*c).value {
                NodeValue::Val(ELValue::Sym(s)) => {
                    SECTIONS.get(self.interner.resolve(s)) == Some(&section)
                }
                _ => false,
            }
        })
    }

    fn section_facts(&self, node: NodeId, section: Section) -> Vec<ELFact> {
        match self.section_node(node, section) {
            Some(sn) => self.trie.leaf_facts(sn),
            None => Vec::new(),
        }
    }

    fn section_comparisons_of(&self, node: NodeId) -> Vec<ELComparison> {
        match self.section_node(node, Section::Comparisons) {
            Some(sn) => self.comparison_leaves(sn),
            None => Vec::new(),
        }
    }

    fn section_ariths(&self, node: NodeId) -> Vec<ELArithFact> {
        match self.section_node(node, Section::Arithmetic) {
            Some(sn) => self.arith_leaves(sn),
            None => Vec::new(),
        }
    }

    fn section_actions(&self, node: NodeId) -> Vec<RuleAction> {
        match self.section_node(node, Section::Actions) {
            Some(sn) => self.action_leaves(sn),
            None => Vec::new(),
        }
    }

    fn comparison_leaves(&self, node: NodeId) -> Vec<ELComparison> {
        self.trie
            .leaf_chains(node)
            .into_iter()
            .filter_map(|chain| match chain.last() {
                Some((NodeValue::Comp(c), _)) => Some(c.clone()),
                _ => None,
            })
            .collect()
    }

    fn arith_leaves(&self, node: NodeId) -> Vec<ELArithFact> {
        self.trie
            .leaf_chains(node)
            .into_iter()
            .filter_map(|chain| match chain.last() {
                Some((NodeValue::Arith(a), _)) => Some(a.clone()),
                _ => None,
            })
            .collect()
    }

    fn action_leaves(&self, node: NodeId) -> Vec<RuleAction> {
        self.trie
            .leaf_chains(node)
            .into_iter()
            .map(|chain| match chain.last() {
                Some((NodeValue::Arith(a), _)) => RuleAction::Arith(a.clone()),
                _ => RuleAction::Fact(crate::trie::chain_to_fact(&chain)),
            })
            .collect()
    }

    // ─── Output Interpolation ────────────────────────────────────

    fn interpolate(&self, template: &str, binding: Option<&BindingSlice>) -> String {
        let Some(slice) = binding else {
            return template.to_string();
        };
        let mut out = String::new();
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            match after.find('}') {
                Some(close) => {
                    let name = &after[..close];
                    let replaced = self
                        .interner
                        .get(name)
                        .and_then(|spur| slice.get(spur))
                        .map(|entry| entry.value.bare_text(&self.interner));
                    match replaced {
                        Some(text) => out.push_str(&text),
                        None => {
                            out.push('{');
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[close + 1..];
                }
                None => {
                    out.push('{');
                    rest = after;
                }
            }
        }
        out.push_str(rest);
        out
    }

    // ─── Metrics & Export ────────────────────────────────────────

    pub fn metrics(&self) -> Result<TrieMetrics, ELError> {
        self.trie.dfs_metrics()
    }

    pub fn max_depth(&self) -> Result<usize, ELError> {
        Ok(self.metrics()?.max_depth)
    }

    pub fn num_leaves(&self) -> Result<usize, ELError> {
        Ok(self.metrics()?.leaves.len())
    }

    pub fn num_rules(&self) -> Result<usize, ELError> {
        Ok(self.metrics()?.rules.len())
    }

    pub fn num_assertions(&self) -> usize {
        self.history
            .iter()
            .filter(|s| matches!(s, Statement::Fact(f) if !f.negated && !f.is_query()))
            .count()
    }

    pub fn num_retractions(&self) -> usize {
        self.history
            .iter()
            .filter(|s| matches!(s, Statement::Fact(f) if f.negated && !f.is_query()))
            .count()
    }

    /// Every leaf fact of the knowledge base, one per line.
    pub fn dump(&self) -> Result<String, ELError> {
        let metrics = self.metrics()?;
        let lines: Vec<String> = metrics
            .leaves
            .iter()
            .map(|id| self.trie.node_path(*id).render(&self.interner))
            .collect();
        Ok(lines.join("\n"))
    }
}
