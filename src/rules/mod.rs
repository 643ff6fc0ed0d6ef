//! Rule Engine: the shared match/cooldown/write-back semantics for alert and automation
//! rules, plus the sandboxed formula evaluator custom metrics can be expressed in.

pub mod engine;
pub mod formula;

pub use engine::{
    alert_rule_eligible, applicable_campaigns, automation_rule_eligible, find_first_match,
    plan_budget_write_backs, BudgetWriteBack, MatchResult,
};
pub use formula::{evaluate as evaluate_formula, FormulaError};
