use lasso::Rodeo;

use crate::arith::ELArithFact;
use crate::compare::ELComparison;
use crate::fact::ELFact;

/// A consequent of a rule: assert/retract a fact, or update in place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleAction {
    Fact(ELFact),
    Arith(ELArithFact),
}

/// The braced rule form `{ conditions | comparisons -> actions }`,
/// storable as a leaf value and executed directly from IR.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ELRule {
    pub conditions: Vec<ELFact>,
    pub comparisons: Vec<ELComparison>,
    pub actions: Vec<RuleAction>,
}

impl ELRule {
    pub fn new(
        conditions: Vec<ELFact>,
        comparisons: Vec<ELComparison>,
        actions: Vec<RuleAction>,
    ) -> ELRule {
        ELRule {
            conditions,
            comparisons,
            actions,
        }
    }

    pub fn render(&self, rodeo: &Rodeo) -> String {
        let conds: Vec<String> = self.conditions.iter().map(|f| f.render(rodeo)).collect();
        let actions: Vec<String> = self
            .actions
            .iter()
            .map(|a| match a {
                RuleAction::Fact(f) => f.render(rodeo),
                RuleAction::Arith(a) => a.render(rodeo),
            })
            .collect();
        if self.comparisons.is_empty() {
            format!("{{ {} -> {} }}", conds.join(", "), actions.join(", "))
        } else {
            let comps: Vec<String> = self.comparisons.iter().map(|c| c.render(rodeo)).collect();
            format!(
                "{{ {} | {} -> {} }}",
                conds.join(", "),
                comps.join(", "),
                actions.join(", ")
            )
        }
    }
}
