use std::fmt;

use super::rule::{ActionBinding, Rule};

/// A named, ordered collection of rules evaluated together in one call.
///
/// Rule order is evaluation order and result order.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Workflow {
    pub name: String,
    pub rules: Vec<Rule>,
}

impl Workflow {
    pub fn new(name: impl Into<String>, rules: Vec<Rule>) -> Self {
        Self {
            name: name.into(),
            rules,
        }
    }

    /// Start building a workflow with the given name.
    #[must_use]
    pub fn builder(name: &str) -> WorkflowBuilder {
        WorkflowBuilder::new(name)
    }

    /// Look up a rule by name.
    #[must_use]
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }
}

impl fmt::Display for Workflow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Workflow({}, {} rules)", self.name, self.rules.len())
    }
}

/// Builder for constructing a [`Workflow`].
///
/// # Example
///
/// ```
/// use rulecraft::{ActionBinding, Workflow};
///
/// let workflow = Workflow::builder("TransactionProcessing")
///     .rule("MondayValidation", |r| {
///         r.when("Date.DayOfWeek != DayOfWeek.Monday")
///             .error_message("Transactions are not allowed on Mondays...")
///     })
///     .rule("WeekendDiscount", |r| {
///         r.when("Date.DayOfWeek == Saturday || Date.DayOfWeek == Sunday")
///             .on_success(ActionBinding::new("OutputExpression").with("expression", "Amount * 0.9"))
///     })
///     .build();
///
/// assert_eq!(workflow.rules.len(), 2);
/// ```
#[derive(Debug)]
pub struct WorkflowBuilder {
    name: String,
    rules: Vec<Rule>,
}

/// Intermediate builder passed to the rule definition closure.
#[derive(Debug)]
pub struct RuleBuilder {
    rule: Rule,
}

impl WorkflowBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            rules: Vec::new(),
        }
    }

    /// Define a rule. The closure should call `.when(expression)`; a rule left
    /// without an expression fails registration with a parse error.
    #[must_use]
    pub fn rule(mut self, name: &str, f: impl FnOnce(RuleBuilder) -> RuleBuilder) -> Self {
        let builder = f(RuleBuilder {
            rule: Rule::new(name, ""),
        });
        self.rules.push(builder.rule);
        self
    }

    #[must_use]
    pub fn build(self) -> Workflow {
        Workflow {
            name: self.name,
            rules: self.rules,
        }
    }
}

impl RuleBuilder {
    /// Set the condition expression for this rule.
    #[must_use]
    pub fn when(mut self, expression: &str) -> Self {
        self.rule.expression = expression.to_owned();
        self
    }

    /// Message reported when the rule fails. `$(Name)` placeholders are
    /// filled from parameters when message formatting is enabled.
    #[must_use]
    pub fn error_message(mut self, message: &str) -> Self {
        self.rule.error_message = Some(message.to_owned());
        self
    }

    /// Event name reported when the rule succeeds.
    #[must_use]
    pub fn success_event(mut self, event: &str) -> Self {
        self.rule.success_event = Some(event.to_owned());
        self
    }

    #[must_use]
    pub fn on_success(mut self, binding: ActionBinding) -> Self {
        self.rule.on_success = Some(binding);
        self
    }

    #[must_use]
    pub fn on_failure(mut self, binding: ActionBinding) -> Self {
        self.rule.on_failure = Some(binding);
        self
    }
}
