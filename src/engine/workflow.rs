// src/engine/workflow.rs

//! Minimal step loop for the `stepbox` binary.
//!
//! Steps run in file order and the actions of a step run one after the
//! other; the first failing action stops the workflow.

use tracing::{error, info};

use crate::action::ActionStatement;
use crate::config::{StepConfig, WorkflowFile};
use crate::engine::ActionDispatcher;
use crate::errors::{ActionError, Result};
use crate::exec::CancelSignal;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkflowSummary {
    pub steps_run: usize,
    pub actions_run: usize,
}

/// Run every step (or only `only_step`) of `workflow`.
pub async fn run_workflow(
    workflow: &WorkflowFile,
    dispatcher: &ActionDispatcher,
    only_step: Option<&str>,
    cancel: CancelSignal,
) -> Result<WorkflowSummary> {
    let steps: Vec<&StepConfig> = match only_step {
        Some(name) => vec![
            workflow
                .step_named(name)
                .ok_or_else(|| ActionError::Config(format!("no step named '{name}'")))?,
        ],
        None => workflow.step.iter().collect(),
    };

    let mut summary = WorkflowSummary::default();
    for step in steps {
        info!(step = %step.name, actions = step.action.len(), "starting step");

        for (index, action) in step.action.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(ActionError::Interrupted {
                    command: action.action.clone(),
                    reason: "cancelled before start".to_string(),
                });
            }

            let statement = ActionStatement::from(action);
            if let Err(err) = dispatcher.dispatch_statement(statement, cancel.clone()).await {
                error!(step = %step.name, index, action = %action.action, "step failed");
                return Err(err);
            }
            summary.actions_run += 1;
        }

        summary.steps_run += 1;
        info!(step = %step.name, "step finished");
    }

    Ok(summary)
}
