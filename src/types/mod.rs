mod error;
mod expr;
mod parameters;
mod rule;
mod rule_result;
mod settings;
mod value;
mod workflow;

pub use error::{ActionError, EvalError, ExecuteError, WorkflowError};
pub use expr::{ArithOp, CompareOp, Expr, UnaryOp};
pub use parameters::{Parameter, Parameters};
pub(crate) use rule::CompiledRule;
pub use rule::{ActionBinding, ActionContext, Rule};
pub use rule_result::RuleResult;
pub use settings::Settings;
pub(crate) use value::weekday_name;
pub use value::{Record, Value};
pub use workflow::{RuleBuilder, Workflow, WorkflowBuilder};
