use thiserror::Error;

use crate::parse::ParseError;

/// Configuration-time errors raised while registering a workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("workflow '{name}' is already registered")]
    DuplicateWorkflowName { name: String },

    #[error("duplicate rule name '{rule}' in workflow '{workflow}'")]
    DuplicateRule { workflow: String, rule: String },

    #[error("workflow '{name}' has no rules")]
    EmptyWorkflow { name: String },

    #[error("invalid expression in rule '{rule}' of workflow '{workflow}': {source}")]
    InvalidExpression {
        workflow: String,
        rule: String,
        #[source]
        source: ParseError,
    },
}

/// Caller-visible errors from an execution call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExecuteError {
    #[error("workflow '{name}' not found")]
    WorkflowNotFound { name: String },
}

/// Runtime errors while evaluating an expression. Scoped to a single rule.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("unknown identifier '{name}'")]
    UnknownIdentifier { name: String },

    #[error("type {type_name} has no member '{member}'")]
    UnknownMember { type_name: String, member: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },

    #[error("type mismatch: cannot apply '{op}' to {left} and {right}")]
    TypeMismatch {
        op: String,
        left: String,
        right: String,
    },

    #[error("expected {expected}, found {found}")]
    UnexpectedType { expected: String, found: String },

    #[error("'{function}' expects {expected} argument(s), got {found}")]
    ArityMismatch {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("expression evaluated to {found}, expected bool")]
    NotBoolean { found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("arithmetic overflow")]
    Overflow,

    #[error("cannot convert {value} to {target}")]
    Conversion { value: String, target: String },

    #[error("lambda '{param} => ...' is only valid as a collection predicate")]
    MisplacedLambda { param: String },
}

/// Errors raised while invoking an action. Reported beside the rule verdict,
/// never instead of it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("action '{name}' is not registered")]
    NotRegistered { name: String },

    #[error("action '{action}' failed: {message}")]
    Failed { action: String, message: String },

    #[error("action '{action}' was cancelled")]
    Cancelled { action: String },
}

impl ActionError {
    /// Convenience constructor for handler implementations.
    pub fn failed(action: impl Into<String>, message: impl Into<String>) -> Self {
        ActionError::Failed {
            action: action.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_workflow_message() {
        let err = WorkflowError::DuplicateWorkflowName {
            name: "TransactionProcessing".into(),
        };
        assert_eq!(
            err.to_string(),
            "workflow 'TransactionProcessing' is already registered"
        );
    }

    #[test]
    fn duplicate_rule_message() {
        let err = WorkflowError::DuplicateRule {
            workflow: "wf".into(),
            rule: "r1".into(),
        };
        assert_eq!(err.to_string(), "duplicate rule name 'r1' in workflow 'wf'");
    }

    #[test]
    fn invalid_expression_message() {
        let err = WorkflowError::InvalidExpression {
            workflow: "wf".into(),
            rule: "r1".into(),
            source: ParseError::new("unexpected token"),
        };
        assert_eq!(
            err.to_string(),
            "invalid expression in rule 'r1' of workflow 'wf': parse error: unexpected token"
        );
    }

    #[test]
    fn workflow_not_found_message() {
        let err = ExecuteError::WorkflowNotFound {
            name: "Missing".into(),
        };
        assert_eq!(err.to_string(), "workflow 'Missing' not found");
    }

    #[test]
    fn type_mismatch_message() {
        let err = EvalError::TypeMismatch {
            op: "<".into(),
            left: "string".into(),
            right: "int".into(),
        };
        assert_eq!(
            err.to_string(),
            "type mismatch: cannot apply '<' to string and int"
        );
    }

    #[test]
    fn action_failed_message() {
        let err = ActionError::failed("ApplyBonus", "upstream timeout");
        assert_eq!(err.to_string(), "action 'ApplyBonus' failed: upstream timeout");
    }
}
