use lasso::Spur;
use rustc_hash::FxHashMap;

use crate::value::ELValue;

/// Stable identity of a trie node. Ids index an append-only arena and are
/// never reused, so a detached node stays addressable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

/// A single data point: `$x = 5`, remembering both where it was found and
/// what it was.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingEntry {
    pub node: NodeId,
    pub value: ELValue,
}

/// One complete variable assignment, tagged with the node the match ended
/// on. Treated as immutable by queries; arithmetic replaces entries wholesale.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BindingSlice {
    entries: FxHashMap<Spur, BindingEntry>,
    pub anchor: Option<NodeId>,
}

impl BindingSlice {
    pub fn new() -> BindingSlice {
        BindingSlice::default()
    }

    pub fn anchored(base: &BindingSlice, anchor: NodeId) -> BindingSlice {
        BindingSlice {
            entries: base.entries.clone(),
            anchor: Some(anchor),
        }
    }

    pub fn get(&self, name: Spur) -> Option<&BindingEntry> {
        self.entries.get(&name)
    }

    pub fn contains(&self, name: Spur) -> bool {
        self.entries.contains_key(&name)
    }

    pub fn insert(&mut self, name: Spur, node: NodeId, value: ELValue) {
        self.entries.insert(name, BindingEntry { node, value });
    }

    /// Replace the value of an existing entry, keeping its node.
    pub fn update_value(&mut self, name: Spur, value: ELValue) {
        if let Some(entry) = self.entries.get_mut(&name) {
            entry.value = value;
        }
    }

    /// Overlay `other` onto this slice; entries in `other` win.
    pub fn merge(&mut self, other: &BindingSlice) {
        for (name, entry) in &other.entries {
            self.entries.insert(*name, entry.clone());
        }
        if other.anchor.is_some() {
            self.anchor = other.anchor;
        }
    }

    pub fn names(&self) -> impl Iterator<Item = Spur> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Spur, &BindingEntry)> {
        self.entries.iter().map(|(k, v)| (*k, v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when both slices bind exactly the same names.
    pub fn same_keys(&self, other: &BindingSlice) -> bool {
        self.len() == other.len() && self.names().all(|n| other.contains(n))
    }
}

/// All possibilities across the current query: a disjunction of slices.
/// A fresh frame holds one empty slice, so an unconditioned query runs once.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingFrame {
    slices: Vec<BindingSlice>,
}

impl Default for BindingFrame {
    fn default() -> Self {
        BindingFrame {
            slices: vec![BindingSlice::new()],
        }
    }
}

impl BindingFrame {
    pub fn new() -> BindingFrame {
        BindingFrame::default()
    }

    pub fn empty() -> BindingFrame {
        BindingFrame { slices: Vec::new() }
    }

    pub fn from_slices(slices: Vec<BindingSlice>) -> BindingFrame {
        BindingFrame { slices }
    }

    pub fn slices(&self) -> &[BindingSlice] {
        &self.slices
    }

    pub fn push(&mut self, slice: BindingSlice) {
        self.slices.push(slice);
    }

    pub fn retain(&mut self, keep: impl FnMut(&BindingSlice) -> bool) {
        self.slices.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.slices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BindingSlice> {
        self.slices.iter()
    }
}

/// Lexically scoped frames for nested rule execution. The bottom frame is
/// never popped.
#[derive(Debug, Clone)]
pub struct BindingStack {
    frames: Vec<BindingFrame>,
}

impl Default for BindingStack {
    fn default() -> Self {
        BindingStack {
            frames: vec![BindingFrame::new()],
        }
    }
}

impl BindingStack {
    pub fn new() -> BindingStack {
        BindingStack::default()
    }

    /// A copy of the top frame.
    pub fn top(&self) -> BindingFrame {
        self.frames.last().cloned().unwrap_or_default()
    }

    /// Duplicate the top frame onto the stack.
    pub fn push_level(&mut self) {
        let top = self.top();
        self.frames.push(top);
    }

    pub fn replace_top(&mut self, frame: BindingFrame) {
        if let Some(top) = self.frames.last_mut() {
            *top = frame;
        }
    }

    pub fn pop_level(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
