use crate::binding::{BindingFrame, NodeId};
use crate::fact::ELFact;

/// A successful operation, possibly carrying the matched path, the
/// surviving binding slices, and the node each slice ended on.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ELSuccess {
    pub path: Option<ELFact>,
    pub bindings: BindingFrame,
    pub nodes: Vec<NodeId>,
}

impl ELSuccess {
    pub fn bare() -> ELSuccess {
        ELSuccess::default()
    }

    pub fn with_bindings(path: Option<ELFact>, bindings: BindingFrame) -> ELSuccess {
        let nodes = bindings
            .iter()
            .filter_map(|slice| slice.anchor)
            .collect();
        ELSuccess {
            path,
            bindings,
            nodes,
        }
    }
}

/// Every top-level operation resolves to one of these. Failure is a value,
/// not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ELResult {
    Success(ELSuccess),
    Fail,
}

impl ELResult {
    pub fn success() -> ELResult {
        ELResult::Success(ELSuccess::bare())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ELResult::Success(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, ELResult::Fail)
    }

    pub fn bindings(&self) -> Option<&BindingFrame> {
        match self {
            ELResult::Success(s) => Some(&s.bindings),
            ELResult::Fail => None,
        }
    }

    pub fn nodes(&self) -> &[NodeId] {
        match self {
            ELResult::Success(s) => &s.nodes,
            ELResult::Fail => &[],
        }
    }
}

impl From<ELSuccess> for ELResult {
    fn from(s: ELSuccess) -> ELResult {
        ELResult::Success(s)
    }
}
