mod actions;
mod builtins;
mod compile;
mod engine;
mod error;
mod evaluate;
mod parse;
mod types;

pub use actions::{ActionFactory, ActionHandler, ActionRegistry, OutputExpression, OUTPUT_EXPRESSION};
pub use async_trait::async_trait;
pub use engine::Engine;
pub use error::RulecraftError;
pub use evaluate::{eval, Expression};
pub use parse::{parse_expression, parse_workflows, ParseError};
pub use tokio_util::sync::CancellationToken;
pub use types::{
    ActionBinding, ActionContext, ActionError, ArithOp, CompareOp, EvalError, ExecuteError, Expr,
    Parameter, Parameters, Record, Rule, RuleBuilder, RuleResult, Settings, UnaryOp, Value,
    Workflow, WorkflowBuilder, WorkflowError,
};
