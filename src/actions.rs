//! Pluggable post-evaluation actions.
//!
//! Handlers are registered by name as factories. Every invocation builds a
//! fresh handler, so a handler may keep per-invocation state in `&mut self`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::evaluate::Expression;
use crate::types::{ActionBinding, ActionContext, ActionError};
use crate::{Parameters, Value};

/// Name of the action that evaluates `context["expression"]` against the
/// rule's parameters and returns the result.
pub const OUTPUT_EXPRESSION: &str = "OutputExpression";

/// An asynchronous action fired after a rule is evaluated.
///
/// ```
/// use rulecraft::{async_trait, ActionContext, ActionError, ActionHandler, Parameters, Value};
///
/// struct Greet;
///
/// #[async_trait]
/// impl ActionHandler for Greet {
///     async fn execute(
///         &mut self,
///         context: &ActionContext,
///         _parameters: &Parameters,
///     ) -> Result<Value, ActionError> {
///         let name = context.get("name").map(Value::render).unwrap_or_default();
///         Ok(Value::String(format!("hello {name}")))
///     }
/// }
/// ```
#[async_trait]
pub trait ActionHandler: Send {
    async fn execute(
        &mut self,
        context: &ActionContext,
        parameters: &Parameters,
    ) -> Result<Value, ActionError>;
}

/// Builds a fresh handler for each invocation.
pub type ActionFactory = Arc<dyn Fn() -> Box<dyn ActionHandler> + Send + Sync>;

/// Evaluates an expression taken from the action context.
#[derive(Debug, Default)]
pub struct OutputExpression;

#[async_trait]
impl ActionHandler for OutputExpression {
    async fn execute(
        &mut self,
        context: &ActionContext,
        parameters: &Parameters,
    ) -> Result<Value, ActionError> {
        let source = context
            .get("expression")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ActionError::failed(OUTPUT_EXPRESSION, "context has no string 'expression'")
            })?;
        let expression = Expression::parse(source)
            .map_err(|e| ActionError::failed(OUTPUT_EXPRESSION, e.to_string()))?;
        expression
            .evaluate(parameters)
            .map_err(|e| ActionError::failed(OUTPUT_EXPRESSION, e.to_string()))
    }
}

/// Name-to-factory table of action handlers.
#[derive(Clone)]
pub struct ActionRegistry {
    factories: HashMap<String, ActionFactory>,
    /// `OUTPUT_EXPRESSION` still names the built-in handler.
    builtin_output: bool,
}

impl Default for ActionRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(OUTPUT_EXPRESSION, || OutputExpression);
        registry.builtin_output = true;
        registry
    }
}

impl ActionRegistry {
    /// A registry holding only the built-in actions.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with no actions at all, not even the built-ins.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
            builtin_output: false,
        }
    }

    /// Register a handler factory under `name`, replacing any existing
    /// handler of that name, built-ins included.
    pub fn register<F, H>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: ActionHandler + 'static,
    {
        let factory: ActionFactory = Arc::new(move || Box::new(factory()) as Box<dyn ActionHandler>);
        self.factories.insert(name.to_owned(), factory);
        if name == OUTPUT_EXPRESSION {
            self.builtin_output = false;
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with<F, H>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: ActionHandler + 'static,
    {
        self.register(name, factory);
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered action names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Build a fresh handler for `name` and run it with `context` and the
    /// triggering rule's parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ActionError::NotRegistered`] for an unknown name, or whatever
    /// error the handler itself reports.
    pub async fn invoke(
        &self,
        name: &str,
        context: &ActionContext,
        parameters: &Parameters,
    ) -> Result<Value, ActionError> {
        self.invoke_with_cancellation(name, context, parameters, &CancellationToken::new())
            .await
    }

    /// Like [`invoke`](Self::invoke), racing the handler against `cancel`.
    ///
    /// # Errors
    ///
    /// As [`invoke`](Self::invoke), plus [`ActionError::Cancelled`] once the
    /// token fires.
    pub async fn invoke_with_cancellation(
        &self,
        name: &str,
        context: &ActionContext,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<Value, ActionError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| ActionError::NotRegistered {
                name: name.to_owned(),
            })?;

        debug!(action = name, "invoking action");
        let mut handler = factory();
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ActionError::Cancelled {
                action: name.to_owned(),
            }),
            result = handler.execute(context, parameters) => result,
        }
    }
}

impl ActionRegistry {
    /// Run a rule's bound action. `prepared` is the expression parsed at
    /// registration for an `OutputExpression` binding; it is evaluated
    /// directly while the built-in handler is in place.
    pub(crate) async fn dispatch(
        &self,
        binding: &ActionBinding,
        prepared: Option<&Expression>,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<Value, ActionError> {
        match prepared {
            Some(expression) if self.builtin_output => {
                if cancel.is_cancelled() {
                    return Err(ActionError::Cancelled {
                        action: OUTPUT_EXPRESSION.to_owned(),
                    });
                }
                debug!(action = OUTPUT_EXPRESSION, "invoking action");
                expression
                    .evaluate(parameters)
                    .map_err(|e| ActionError::failed(OUTPUT_EXPRESSION, e.to_string()))
            }
            _ => {
                self.invoke_with_cancellation(
                    &binding.action_name,
                    &binding.context,
                    parameters,
                    cancel,
                )
                .await
            }
        }
    }
}

impl fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionRegistry")
            .field("actions", &self.names())
            .finish()
    }
}
