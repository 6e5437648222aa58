use thiserror::Error;

use crate::parse::ParseError;
use crate::types::{EvalError, ExecuteError, WorkflowError};

/// Unified error type covering parsing, evaluation, registration, execution and I/O.
///
/// Returned by convenience methods like [`Engine::from_dsl()`](crate::Engine::from_dsl)
/// and [`Engine::from_file()`](crate::Engine::from_file).
#[derive(Debug, Error)]
pub enum RulecraftError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    Execute(#[from] ExecuteError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_component_errors_transparently() {
        let err: RulecraftError = ExecuteError::WorkflowNotFound {
            name: "wf".into(),
        }
        .into();
        assert_eq!(err.to_string(), "workflow 'wf' not found");
        assert!(matches!(err, RulecraftError::Execute(_)));

        let err: RulecraftError = WorkflowError::EmptyWorkflow { name: "wf".into() }.into();
        assert_eq!(err.to_string(), "workflow 'wf' has no rules");
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing.rules");
        let err: RulecraftError = io.into();
        assert!(matches!(err, RulecraftError::Io(_)));
    }
}
