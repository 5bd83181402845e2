// src/action/mod.rs

//! Action statements and their normalised request shape.
//!
//! - [`request`] turns either surface syntax (option block on a `run:`
//!   body, or a keyword call like `singularity_build(src=…, dest=…)`) into a
//!   single [`ActionRequest`].
//! - [`options`] parses the option map strictly into [`ExecutionOptions`].

pub mod options;
pub mod request;

pub use options::{ExecutionOptions, VolumeMount};
pub use request::{ActionRequest, ActionStatement};

/// Ordered option map as supplied by the workflow front end.
pub type OptionMap = toml::Table;
