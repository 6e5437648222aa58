mod error;
mod expr;
mod workflow;

pub use error::ParseError;

use crate::types::{Expr, Workflow};

/// Parse a single expression into its AST.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not a well-formed expression.
pub fn parse_expression(input: &str) -> Result<Expr, ParseError> {
    use winnow::Parser;
    expr::expression
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}

/// Parse a workflow definition file containing one or more workflows.
///
/// # Errors
///
/// Returns [`ParseError`] if the input is not valid workflow syntax. Rule
/// expressions are checked for syntax here and parsed again on registration.
pub fn parse_workflows(input: &str) -> Result<Vec<Workflow>, ParseError> {
    use winnow::Parser;
    workflow::workflows
        .parse(input)
        .map_err(|e| ParseError::new(e.to_string()))
}
