use std::collections::HashSet;
use std::sync::Arc;

use crate::actions::OUTPUT_EXPRESSION;
use crate::evaluate::Expression;
use crate::parse::{parse_expression, ParseError};
use crate::types::{ActionBinding, CompiledRule, Workflow, WorkflowError};

/// A registered workflow: the definition as supplied plus its parsed rules.
#[derive(Debug, Clone)]
pub(crate) struct CompiledWorkflow {
    pub(crate) workflow: Workflow,
    pub(crate) rules: Vec<CompiledRule>,
}

/// Validate a workflow definition and parse every rule expression, including
/// the `expression` entry of each `OutputExpression` binding.
pub(crate) fn compile(workflow: Workflow) -> Result<CompiledWorkflow, WorkflowError> {
    if workflow.rules.is_empty() {
        return Err(WorkflowError::EmptyWorkflow {
            name: workflow.name,
        });
    }
    check_duplicates(&workflow)?;

    let rules = workflow
        .rules
        .iter()
        .map(|rule| {
            let invalid = |source| WorkflowError::InvalidExpression {
                workflow: workflow.name.clone(),
                rule: rule.name.clone(),
                source,
            };
            let condition = parse_expression(&rule.expression).map_err(invalid)?;
            Ok(CompiledRule {
                rule: Arc::new(rule.clone()),
                condition,
                success_output: output_expression(rule.on_success.as_ref()).map_err(invalid)?,
                failure_output: output_expression(rule.on_failure.as_ref()).map_err(invalid)?,
            })
        })
        .collect::<Result<Vec<_>, WorkflowError>>()?;

    Ok(CompiledWorkflow { workflow, rules })
}

fn output_expression(binding: Option<&ActionBinding>) -> Result<Option<Expression>, ParseError> {
    let Some(binding) = binding.filter(|b| b.action_name == OUTPUT_EXPRESSION) else {
        return Ok(None);
    };
    let source = binding
        .context
        .get("expression")
        .and_then(crate::Value::as_str)
        .ok_or_else(|| ParseError::new("OutputExpression needs a string 'expression' entry"))?;
    Expression::parse(source).map(Some)
}

fn check_duplicates(workflow: &Workflow) -> Result<(), WorkflowError> {
    let mut seen = HashSet::new();
    for rule in &workflow.rules {
        if !seen.insert(rule.name.as_str()) {
            return Err(WorkflowError::DuplicateRule {
                workflow: workflow.name.clone(),
                rule: rule.name.clone(),
            });
        }
    }
    Ok(())
}
