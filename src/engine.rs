use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::actions::{ActionHandler, ActionRegistry};
use crate::compile::{compile, CompiledWorkflow};
use crate::evaluate::evaluate_condition;
use crate::types::{
    CompiledRule, EvalError, ExecuteError, Rule, RuleResult, Settings, Workflow, WorkflowError,
};
use crate::{Parameters, RulecraftError};

/// Holds registered workflows and actions and executes workflows against
/// parameter sets.
///
/// Registration takes `&mut self`; execution takes `&self`, so a fully
/// configured engine can be shared behind an `Arc` and executed from many
/// tasks at once.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use rulecraft::{ActionRegistry, Engine, Parameters, Workflow};
///
/// # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
/// # rt.block_on(async {
/// let workflow = Workflow::builder("TransactionProcessing")
///     .rule("MondayValidation", |r| {
///         r.when("Date.DayOfWeek != DayOfWeek.Monday")
///             .error_message("Transactions are not allowed on Mondays...")
///     })
///     .build();
/// let engine = Engine::new([workflow], ActionRegistry::new()).unwrap();
///
/// let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
/// let params = Parameters::new().set("Date", monday).set("Amount", 100_i64);
/// let results = engine.execute_all("TransactionProcessing", &params).await.unwrap();
///
/// assert!(!results[0].is_success());
/// assert_eq!(
///     results[0].error_message(),
///     Some("Transactions are not allowed on Mondays...")
/// );
/// # });
/// ```
#[derive(Debug, Clone, Default)]
pub struct Engine {
    workflows: HashMap<String, CompiledWorkflow>,
    actions: ActionRegistry,
    settings: Settings,
}

impl Engine {
    /// Build an engine from a set of workflows and an action registry.
    ///
    /// # Errors
    ///
    /// Returns the first [`WorkflowError`] raised while registering the workflows.
    pub fn new(
        workflows: impl IntoIterator<Item = Workflow>,
        actions: ActionRegistry,
    ) -> Result<Self, WorkflowError> {
        let mut engine = Self {
            workflows: HashMap::new(),
            actions,
            settings: Settings::default(),
        };
        for workflow in workflows {
            engine.register_workflow(workflow)?;
        }
        Ok(engine)
    }

    /// Parse workflow definitions and build an engine with the built-in actions.
    ///
    /// # Errors
    ///
    /// Returns [`RulecraftError`] on parse or registration failure.
    pub fn from_dsl(input: &str) -> Result<Self, RulecraftError> {
        let workflows = crate::parse::parse_workflows(input)?;
        Ok(Self::new(workflows, ActionRegistry::new())?)
    }

    /// Read a workflow definition file and build an engine from it.
    ///
    /// # Errors
    ///
    /// Returns [`RulecraftError`] on I/O, parse, or registration failure.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, RulecraftError> {
        let input = std::fs::read_to_string(path)?;
        Self::from_dsl(&input)
    }

    #[must_use]
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn settings(&self) -> Settings {
        self.settings
    }

    /// Validate and register a workflow. Every rule expression is parsed here.
    ///
    /// # Errors
    ///
    /// Fails if the name is taken, the workflow has no rules, two rules share
    /// a name, or an expression does not parse. A failed registration leaves
    /// the engine unchanged.
    pub fn register_workflow(&mut self, workflow: Workflow) -> Result<(), WorkflowError> {
        let compiled = if self.workflows.contains_key(&workflow.name) {
            Err(WorkflowError::DuplicateWorkflowName {
                name: workflow.name,
            })
        } else {
            compile(workflow)
        }
        .inspect_err(|err| warn!(error = %err, "rejected workflow"))?;
        info!(
            workflow = %compiled.workflow.name,
            rules = compiled.rules.len(),
            "registered workflow"
        );
        self.workflows
            .insert(compiled.workflow.name.clone(), compiled);
        Ok(())
    }

    /// Register an action factory under `name`. Replaces any existing action
    /// of that name, including built-ins.
    pub fn register_action<F, H>(&mut self, name: &str, factory: F)
    where
        F: Fn() -> H + Send + Sync + 'static,
        H: ActionHandler + 'static,
    {
        info!(action = name, "registered action");
        self.actions.register(name, factory);
    }

    #[must_use]
    pub fn actions(&self) -> &ActionRegistry {
        &self.actions
    }

    /// Look up a registered workflow definition.
    #[must_use]
    pub fn get_workflow(&self, name: &str) -> Option<&Workflow> {
        self.workflows.get(name).map(|c| &c.workflow)
    }

    /// Registered workflow names, sorted.
    #[must_use]
    pub fn workflow_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.workflows.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Evaluate every rule of a workflow, in declared order.
    ///
    /// A rule that cannot be evaluated is reported as failed with
    /// [`RuleResult::evaluation_error`] set; the remaining rules still run.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::WorkflowNotFound`] if no workflow has that name.
    pub async fn execute_all(
        &self,
        workflow_name: &str,
        parameters: &Parameters,
    ) -> Result<Vec<RuleResult>, ExecuteError> {
        self.execute_all_with_cancellation(workflow_name, parameters, &CancellationToken::new())
            .await
    }

    /// Like [`execute_all`](Self::execute_all), racing every action against
    /// `cancel`. Once the token fires, pending and later actions report
    /// [`ActionError::Cancelled`](crate::ActionError::Cancelled) while every
    /// rule still receives its verdict.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::WorkflowNotFound`] if no workflow has that name.
    #[instrument(skip_all, fields(workflow = workflow_name))]
    pub async fn execute_all_with_cancellation(
        &self,
        workflow_name: &str,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> Result<Vec<RuleResult>, ExecuteError> {
        let compiled = self
            .workflows
            .get(workflow_name)
            .ok_or_else(|| ExecuteError::WorkflowNotFound {
                name: workflow_name.to_owned(),
            })?;

        let mut results = Vec::with_capacity(compiled.rules.len());
        for rule in &compiled.rules {
            results.push(self.execute_rule(rule, parameters, cancel).await);
        }
        Ok(results)
    }

    async fn execute_rule(
        &self,
        compiled: &CompiledRule,
        parameters: &Parameters,
        cancel: &CancellationToken,
    ) -> RuleResult {
        let rule = &compiled.rule;
        let (is_success, evaluation_error) =
            match evaluate_condition(&compiled.condition, parameters) {
                Ok(verdict) => (verdict, None),
                Err(err) => {
                    warn!(rule = %rule.name, error = %err, "rule could not be evaluated");
                    (false, Some(err))
                }
            };
        debug!(rule = %rule.name, success = is_success, "rule evaluated");

        let (binding, prepared) = if is_success {
            (rule.on_success.as_ref(), compiled.success_output.as_ref())
        } else {
            (rule.on_failure.as_ref(), compiled.failure_output.as_ref())
        };
        let outcome = match binding {
            Some(binding) => Some(
                self.actions
                    .dispatch(binding, prepared, parameters, cancel)
                    .await,
            ),
            None => None,
        };
        if let Some(Err(err)) = &outcome {
            warn!(rule = %rule.name, error = %err, "action failed");
        }

        let error_message = if is_success {
            None
        } else {
            self.error_message(rule, evaluation_error.as_ref(), parameters)
        };

        RuleResult::new(Arc::clone(rule), is_success)
            .with_error_message(error_message)
            .with_evaluation_error(evaluation_error)
            .with_action_outcome(outcome)
    }

    fn error_message(
        &self,
        rule: &Rule,
        evaluation_error: Option<&EvalError>,
        parameters: &Parameters,
    ) -> Option<String> {
        if self.settings.exception_as_error_message_enabled() {
            if let Some(err) = evaluation_error {
                return Some(err.to_string());
            }
        }
        let message = rule.error_message.as_deref()?;
        if self.settings.format_error_messages_enabled() {
            Some(format_message(message, parameters))
        } else {
            Some(message.to_owned())
        }
    }
}

/// Replace `$(Name)` with the rendered value of parameter `Name`. Unknown
/// names and unterminated placeholders are left as written.
fn format_message(template: &str, parameters: &Parameters) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("$(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find(')') else {
            out.push_str(&rest[start..]);
            return out;
        };
        match parameters.get(&after[..end]) {
            Some(value) => out.push_str(&value.render()),
            None => out.push_str(&rest[start..start + 2 + end + 1]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}
