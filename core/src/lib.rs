//! IR model for the exclusion-logic engine: values, variables, facts,
//! comparisons, arithmetic actions, rules, binding structures and results.
//! The parser produces these types; the engine consumes them.

pub mod arith;
pub mod binding;
pub mod compare;
pub mod error;
pub mod fact;
pub mod result;
pub mod rule;
pub mod value;
pub mod var;

pub use arith::{ArithOp, ArithTarget, ELArithFact, eval_binary};
pub use binding::{BindingEntry, BindingFrame, BindingSlice, BindingStack, NodeId};
pub use compare::{CompOp, ELComparison, Operand};
pub use error::ELError;
pub use fact::{ELFact, EdgeKind, ListElem, PairTerm, PathElem, RootRef};
pub use result::{ELResult, ELSuccess};
pub use rule::{ELRule, RuleAction};
pub use value::{ELValue, Rational};
pub use var::{Accessor, Bound, ELVar, VarScope};
