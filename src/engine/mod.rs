// src/engine/mod.rs

//! Action dispatch and the step loop that drives it.
//!
//! - [`dispatcher`] is the public entry point the workflow engine calls for
//!   each action statement.
//! - [`workflow`] walks the steps of a workflow file and feeds their actions
//!   to the dispatcher.

pub mod dispatcher;
pub mod workflow;

pub use dispatcher::{ActionDispatcher, DEST_PLACEHOLDER, DispatcherConfig};
pub use workflow::{WorkflowSummary, run_workflow};
