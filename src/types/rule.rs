use std::collections::BTreeMap;
use std::sync::Arc;

use super::expr::Expr;
use super::Value;
use crate::evaluate::Expression;

/// Key/value data handed verbatim to an action handler.
pub type ActionContext = BTreeMap<String, Value>;

/// A reference to a registered action plus the context it is invoked with.
///
/// The name is resolved against the engine's action registry only when the
/// action fires, so bindings may name actions that are registered later.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ActionBinding {
    pub action_name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub context: ActionContext,
}

impl ActionBinding {
    pub fn new(action_name: impl Into<String>) -> Self {
        Self {
            action_name: action_name.into(),
            context: ActionContext::new(),
        }
    }

    /// Add a context entry.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.context.insert(key.to_owned(), value.into());
        self
    }
}

/// A named boolean condition with optional error text, success event and
/// success/failure actions.
///
/// Rules are created via [`WorkflowBuilder`](super::WorkflowBuilder) or by parsing
/// a workflow definition with [`parse_workflows()`](crate::parse_workflows).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Rule {
    pub name: String,
    pub expression: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub error_message: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub success_event: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_success: Option<ActionBinding>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub on_failure: Option<ActionBinding>,
}

impl Rule {
    pub fn new(name: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            error_message: None,
            success_event: None,
            on_success: None,
            on_failure: None,
        }
    }
}

/// A rule whose expression has been parsed into an AST.
///
/// Produced at registration time and stored inside the engine; the `Arc`
/// lets every [`RuleResult`](super::RuleResult) point back at its rule cheaply.
#[derive(Debug, Clone)]
pub(crate) struct CompiledRule {
    pub(crate) rule: Arc<Rule>,
    pub(crate) condition: Expr,
    /// Pre-parsed `expression` of an `OutputExpression` success binding.
    pub(crate) success_output: Option<Expression>,
    pub(crate) failure_output: Option<Expression>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binding_collects_context() {
        let binding = ActionBinding::new("ApplyDiscount")
            .with("percent", 10_i64)
            .with("reason", "weekend");
        assert_eq!(binding.action_name, "ApplyDiscount");
        assert_eq!(binding.context.get("percent"), Some(&Value::Int(10)));
        assert_eq!(binding.context.len(), 2);
    }

    #[test]
    fn new_rule_has_no_extras() {
        let rule = Rule::new("AgeCheck", "Age >= 18");
        assert_eq!(rule.name, "AgeCheck");
        assert_eq!(rule.expression, "Age >= 18");
        assert!(rule.error_message.is_none());
        assert!(rule.on_success.is_none());
        assert!(rule.on_failure.is_none());
    }
}
