use std::collections::VecDeque;

use el_core::{
    ELArithFact, ELComparison, ELError, ELFact, ELResult, ELRule, ELValue, ELVar, EdgeKind,
    ListElem, NodeId, PairTerm, PathElem, RootRef,
};
use lasso::Rodeo;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

/// What a trie node holds. Beyond the root sentinel and plain values, rule
/// subtrees store variables, query/negation marks and comparison,
/// arithmetic and rule leaves so sections reconstruct losslessly.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeValue {
    Root,
    Val(ELValue),
    Var(ELVar),
    QueryMark,
    NotMark,
    Comp(ELComparison),
    Arith(ELArithFact),
    Rule(ELRule),
}

impl NodeValue {
    pub fn as_value(&self) -> Option<&ELValue> {
        match self {
            NodeValue::Val(v) => Some(v),
            _ => None,
        }
    }

    fn to_pair_term(&self) -> Option<PairTerm> {
        match self {
            NodeValue::Root => None,
            NodeValue::Val(v) => Some(PairTerm::Val(v.clone())),
            NodeValue::Var(v) => Some(PairTerm::Var(v.clone())),
            NodeValue::QueryMark => Some(PairTerm::QueryMark),
            NodeValue::NotMark => Some(PairTerm::NotMark),
            NodeValue::Comp(c) => Some(PairTerm::Comp(c.clone())),
            NodeValue::Arith(a) => Some(PairTerm::Arith(a.clone())),
            NodeValue::Rule(r) => Some(PairTerm::Rule(r.clone())),
        }
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        match self {
            NodeValue::Root => ".".to_string(),
            NodeValue::Val(v) => v.render(rodeo),
            NodeValue::Var(v) => v.render(rodeo),
            NodeValue::QueryMark => "?".to_string(),
            NodeValue::NotMark => "~".to_string(),
            NodeValue::Comp(c) => c.render(rodeo),
            NodeValue::Arith(a) => a.render(rodeo),
            NodeValue::Rule(r) => r.render(rodeo),
        }
    }
}

/// A single trie node. `edge` is the kind of the edge from its parent; an
/// EX edge means the parent holds no other child. Children keep both a
/// keyed map and their insertion order.
#[derive(Debug, Clone)]
pub struct ELTrieNode {
    pub id: NodeId,
    pub edge: EdgeKind,
    pub value: NodeValue,
    pub parent: Option<NodeId>,
    children: FxHashMap<NodeValue, NodeId>,
    child_order: Vec<NodeId>,
}

impl ELTrieNode {
    fn new(id: NodeId, edge: EdgeKind, value: NodeValue, parent: Option<NodeId>) -> ELTrieNode {
        ELTrieNode {
            id,
            edge,
            value,
            parent,
            children: FxHashMap::default(),
            child_order: Vec::new(),
        }
    }

    pub fn get_child(&self, key: &NodeValue) -> Option<NodeId> {
        self.children.get(key).copied()
    }

    /// Children in insertion order.
    pub fn children(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.child_order.iter().copied()
    }

    pub fn child_count(&self) -> usize {
        self.child_order.len()
    }

    pub fn is_leaf(&self) -> bool {
        self.child_order.is_empty()
    }

    fn link(&mut self, key: NodeValue, id: NodeId) {
        self.children.insert(key, id);
        self.child_order.push(id);
    }

    fn unlink(&mut self, key: &NodeValue, id: NodeId) {
        self.children.remove(key);
        self.child_order.retain(|c| *c != id);
    }

    fn clear(&mut self) {
        self.children.clear();
        self.child_order.clear();
    }
}

/// Structural measurements from a full DFS.
#[derive(Debug, Clone)]
pub struct TrieMetrics {
    pub max_depth: usize,
    pub leaves: Vec<NodeId>,
    pub rules: Vec<NodeId>,
}

/// The exclusion trie: an arena of nodes addressed by stable ids. Nodes are
/// never deallocated; pop and EX displacement merely detach them, so every
/// id ever handed out stays valid.
#[derive(Debug, Clone)]
pub struct ELTrie {
    nodes: Vec<ELTrieNode>,
    root: NodeId,
}

impl Default for ELTrie {
    fn default() -> Self {
        ELTrie::new()
    }
}

impl ELTrie {
    pub fn new() -> ELTrie {
        let root = NodeId(0);
        ELTrie {
            nodes: vec![ELTrieNode::new(root, EdgeKind::Dot, NodeValue::Root, None)],
            root,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &ELTrieNode {
        &self.nodes[id.0 as usize]
    }

    pub fn get(&self, id: NodeId) -> Option<&ELTrieNode> {
        self.nodes.get(id.0 as usize)
    }

    pub fn contains_id(&self, id: NodeId) -> bool {
        (id.0 as usize) < self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.node(self.root).is_leaf()
    }

    /// Arena size: every node ever allocated, attached or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn alloc(&mut self, edge: EdgeKind, value: NodeValue, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes
            .push(ELTrieNode::new(id, edge, value.clone(), Some(parent)));
        self.nodes[parent.0 as usize].link(value, id);
        id
    }

    /// Walk a fact into the trie, creating nodes as needed and applying the
    /// exclusion semantics at each step. Fails on an unrooted fact, a query
    /// terminator, a list at a non-terminal pair, or a terminal list that
    /// is not a plain value list.
    pub fn push(&mut self, fact: &ELFact) -> ELResult {
        let mut current = match fact.root() {
            Some(PathElem::Root(None)) => self.root,
            Some(PathElem::Root(Some(RootRef::Node(id)))) if self.contains_id(*id) => *id,
            _ => return ELResult::Fail,
        };
        let mut pending = EdgeKind::Dot;
        let last = fact.elems.len() - 1;
        for (i, elem) in fact.elems.iter().enumerate().skip(1) {
            let PathElem::Pair { term, edge } = elem else {
                return ELResult::Fail;
            };
            let value = match term {
                PairTerm::List(items) => {
                    if i != last {
                        debug!("rejecting list at a non-terminal pair");
                        return ELResult::Fail;
                    }
                    match plain_list(items) {
                        Some(v) => NodeValue::Val(v),
                        None => return ELResult::Fail,
                    }
                }
                PairTerm::Val(v) => NodeValue::Val(v.clone()),
                PairTerm::Var(v) => NodeValue::Var(v.clone()),
                PairTerm::QueryMark => NodeValue::QueryMark,
                PairTerm::NotMark => NodeValue::NotMark,
                PairTerm::Comp(c) => NodeValue::Comp(c.clone()),
                PairTerm::Arith(a) => NodeValue::Arith(a.clone()),
                PairTerm::Rule(r) => NodeValue::Rule(r.clone()),
            };
            current = self.ensure_child(current, value, pending);
            pending = *edge;
        }
        ELResult::success()
    }

    /// Locate or create a child under `parent`, honoring the edge kind the
    /// incoming step carries.
    fn ensure_child(&mut self, parent: NodeId, value: NodeValue, incoming: EdgeKind) -> NodeId {
        if let Some(child) = self.node(parent).get_child(&value) {
            let child_edge = self.node(child).edge;
            match (incoming, child_edge) {
                // an exclusion displaces every sibling
                (EdgeKind::Ex, EdgeKind::Dot) => {
                    self.clear_children_except(parent, child);
                    self.nodes[child.0 as usize].edge = EdgeKind::Ex;
                }
                // a permissive assert downgrades the exclusive child, the
                // previously exclusive value stays reachable
                (EdgeKind::Dot, EdgeKind::Ex) => {
                    self.nodes[child.0 as usize].edge = EdgeKind::Dot;
                }
                _ => {}
            }
            return child;
        }
        match incoming {
            EdgeKind::Ex => {
                self.clear_children(parent);
            }
            EdgeKind::Dot => {
                let exclusive: Vec<NodeId> = self
                    .node(parent)
                    .children()
                    .filter(|c| self.node(*c).edge == EdgeKind::Ex)
                    .collect();
                for id in exclusive {
                    self.nodes[id.0 as usize].edge = EdgeKind::Dot;
                }
            }
        }
        self.alloc(incoming, value, parent)
    }

    fn clear_children(&mut self, parent: NodeId) {
        if self.node(parent).child_count() > 0 {
            debug!(parent = parent.0, "exclusion displacing children");
        }
        self.nodes[parent.0 as usize].clear();
    }

    fn clear_children_except(&mut self, parent: NodeId, keep: NodeId) {
        let removed: Vec<(NodeValue, NodeId)> = self
            .node(parent)
            .children()
            .filter(|c| *c != keep)
            .map(|c| (self.node(c).value.clone(), c))
            .collect();
        for (value, id) in removed {
            self.nodes[parent.0 as usize].unlink(&value, id);
        }
    }

    /// Detach the node a fact names from its parent. The subtree below it
    /// goes with it; empty intermediate chains are left alone. A missing
    /// path is a Fail, never an error.
    pub fn pop(&mut self, fact: &ELFact) -> ELResult {
        let mut probe = fact.clone();
        probe.negated = false;
        let probe = probe.as_query();
        let target = match self.get_matches(&probe) {
            Ok(ELResult::Success(s)) => match s.nodes.first() {
                Some(id) => *id,
                None => return ELResult::Fail,
            },
            _ => return ELResult::Fail,
        };
        let Some(parent) = self.node(target).parent else {
            return ELResult::Fail;
        };
        let key = self.node(target).value.clone();
        self.nodes[parent.0 as usize].unlink(&key, target);
        debug!(node = target.0, "popped");
        ELResult::success()
    }

    /// Re-key a node's value in place, preserving its identity. The parent's
    /// child map moves to the new key; the insertion order slot is unchanged.
    pub fn update_value(&mut self, id: NodeId, new_value: ELValue) -> Result<(), ELError> {
        if !self.contains_id(id) {
            return Err(ELError::consistency("no such node"));
        }
        let old = self.node(id).value.clone();
        if let Some(parent) = self.node(id).parent {
            let parent_node = &mut self.nodes[parent.0 as usize];
            if parent_node.children.get(&old) == Some(&id) {
                parent_node.children.remove(&old);
                parent_node.children.insert(NodeValue::Val(new_value.clone()), id);
            }
        }
        self.nodes[id.0 as usize].value = NodeValue::Val(new_value);
        Ok(())
    }

    /// Every leaf under `id` as its chain of (value, incoming edge) pairs,
    /// breadth-first.
    pub fn leaf_chains(&self, id: NodeId) -> Vec<Vec<(NodeValue, EdgeKind)>> {
        let mut out = Vec::new();
        let mut queue: VecDeque<(NodeId, Vec<(NodeValue, EdgeKind)>)> = self
            .node(id)
            .children()
            .map(|c| {
                let n = self.node(c);
                (c, vec![(n.value.clone(), n.edge)])
            })
            .collect();
        while let Some((nid, chain)) = queue.pop_front() {
            let node = self.node(nid);
            if node.is_leaf() {
                out.push(chain);
            } else {
                for c in node.children() {
                    let n = self.node(c);
                    let mut next = chain.clone();
                    next.push((n.value.clone(), n.edge));
                    queue.push_back((c, next));
                }
            }
        }
        out
    }

    /// Leaves under `id` converted back to root-anchored facts.
    pub fn leaf_facts(&self, id: NodeId) -> Vec<ELFact> {
        self.leaf_chains(id)
            .into_iter()
            .map(|chain| chain_to_fact(&chain))
            .collect()
    }

    /// The full path of a node from the trie root, as a fact.
    pub fn node_path(&self, id: NodeId) -> ELFact {
        let mut chain = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            let node = self.node(cid);
            if matches!(node.value, NodeValue::Root) {
                break;
            }
            chain.push((node.value.clone(), node.edge));
            current = node.parent;
        }
        chain.reverse();
        chain_to_fact(&chain)
    }

    /// DFS over the attached tree: max depth, leaf set, rule-valued nodes.
    /// A revisited node means a cross edge, which the tree construction
    /// makes impossible, so it errors loudly.
    pub fn dfs_metrics(&self) -> Result<TrieMetrics, ELError> {
        let mut seen: FxHashSet<NodeId> = FxHashSet::default();
        let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
        queue.push_back((self.root, 0));
        let mut metrics = TrieMetrics {
            max_depth: 0,
            leaves: Vec::new(),
            rules: Vec::new(),
        };
        while let Some((id, depth)) = queue.pop_front() {
            if !seen.insert(id) {
                return Err(ELError::consistency(
                    "cross edge during DFS: the trie is not a tree",
                ));
            }
            let node = self.node(id);
            metrics.max_depth = metrics.max_depth.max(depth);
            if node.is_leaf() && id != self.root {
                metrics.leaves.push(id);
            }
            if matches!(node.value, NodeValue::Rule(_)) {
                metrics.rules.push(id);
            }
            for c in node.children() {
                queue.push_back((c, depth + 1));
            }
        }
        Ok(metrics)
    }
}

/// A terminal list is storable only when every element is a plain value.
fn plain_list(items: &[ListElem]) -> Option<ELValue> {
    let mut values = Vec::with_capacity(items.len());
    for item in items {
        match item {
            ListElem::Val(v) => values.push(v.clone()),
            _ => return None,
        }
    }
    Some(ELValue::List(values))
}

/// Rebuild a fact from a chain of node values: a leading negation mark sets
/// the polarity, a trailing query mark the terminator, and a leading path
/// variable re-roots the fact at that binding.
pub fn chain_to_fact(chain: &[(NodeValue, EdgeKind)]) -> ELFact {
    let mut start = 0;
    let mut end = chain.len();
    let negated = matches!(chain.first(), Some((NodeValue::NotMark, _)));
    if negated {
        start = 1;
    }
    let has_query = end > start && matches!(chain[end - 1].0, NodeValue::QueryMark);
    if has_query {
        end -= 1;
    }
    let mut fact = match chain.get(start) {
        Some((NodeValue::Var(v), _)) if v.is_path => {
            start += 1;
            ELFact::anchored_at(RootRef::Var(v.clone()))
        }
        _ => ELFact::anchored(),
    };
    for i in start..end {
        let Some(term) = chain[i].0.to_pair_term() else {
            continue;
        };
        let outgoing = if i + 1 < end {
            chain[i + 1].1
        } else {
            EdgeKind::Dot
        };
        fact = fact.push(PathElem::pair(term, outgoing));
    }
    if has_query {
        fact = fact.push(PathElem::Query);
    }
    if negated {
        fact.negated = true;
    }
    fact
}
