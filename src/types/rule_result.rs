use std::fmt;
use std::sync::Arc;

use super::error::{ActionError, EvalError};
use super::rule::Rule;
use super::value::Value;

/// Per-rule outcome of one execution call.
///
/// Results are returned in declared rule order. A result whose
/// [`evaluation_error()`](Self::evaluation_error) is set failed because the rule
/// could not be evaluated, not because its condition was false.
#[derive(Debug, Clone)]
#[must_use]
pub struct RuleResult {
    rule: Arc<Rule>,
    is_success: bool,
    error_message: Option<String>,
    evaluation_error: Option<EvalError>,
    action_result: Option<Value>,
    action_error: Option<ActionError>,
}

impl RuleResult {
    pub(crate) fn new(rule: Arc<Rule>, is_success: bool) -> Self {
        Self {
            rule,
            is_success,
            error_message: None,
            evaluation_error: None,
            action_result: None,
            action_error: None,
        }
    }

    pub(crate) fn with_error_message(mut self, message: Option<String>) -> Self {
        self.error_message = message;
        self
    }

    pub(crate) fn with_evaluation_error(mut self, error: Option<EvalError>) -> Self {
        self.evaluation_error = error;
        self
    }

    pub(crate) fn with_action_outcome(mut self, outcome: Option<Result<Value, ActionError>>) -> Self {
        match outcome {
            Some(Ok(value)) => self.action_result = Some(value),
            Some(Err(err)) => self.action_error = Some(err),
            None => {}
        }
        self
    }

    /// The rule this result belongs to.
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    #[must_use]
    pub fn rule_name(&self) -> &str {
        &self.rule.name
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.is_success
    }

    /// The rule's error message; only present when the rule failed.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// The rule's success event; only present when the rule succeeded.
    #[must_use]
    pub fn success_event(&self) -> Option<&str> {
        if self.is_success {
            self.rule.success_event.as_deref()
        } else {
            None
        }
    }

    /// Why the rule could not be evaluated, if it could not.
    #[must_use]
    pub fn evaluation_error(&self) -> Option<&EvalError> {
        self.evaluation_error.as_ref()
    }

    /// Value returned by the action that fired for this rule.
    #[must_use]
    pub fn action_result(&self) -> Option<&Value> {
        self.action_result.as_ref()
    }

    /// Error raised by the action that fired for this rule. Does not affect
    /// [`is_success()`](Self::is_success).
    #[must_use]
    pub fn action_error(&self) -> Option<&ActionError> {
        self.action_error.as_ref()
    }
}

impl fmt::Display for RuleResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.rule.name, self.is_success)?;
        if let Some(err) = &self.evaluation_error {
            write!(f, " (evaluation error: {err})")?;
        } else if let Some(msg) = &self.error_message {
            write!(f, " ({msg})")?;
        }
        if let Some(value) = &self.action_result {
            write!(f, ", action result: {value}")?;
        }
        if let Some(err) = &self.action_error {
            write!(f, ", action error: {err}")?;
        }
        Ok(())
    }
}
