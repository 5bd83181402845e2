// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::action::{ActionStatement, OptionMap};

/// Top-level workflow file as read from TOML.
///
/// ```toml
/// [config]
/// default_engine = "singularity"
///
/// [[step]]
/// name = "hello"
/// [[step.action]]
/// action = "run"
/// container = "shub://singularityhub/ubuntu"
/// script = "echo 'Echo'"
/// ```
///
/// Use [`WorkflowFile`] (obtained via `TryFrom`) everywhere else; it is only
/// constructed after validation.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWorkflowFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub step: Vec<StepConfig>,
}

/// A validated workflow file.
#[derive(Debug, Clone)]
pub struct WorkflowFile {
    pub config: ConfigSection,
    pub step: Vec<StepConfig>,
}

impl WorkflowFile {
    pub(crate) fn new_unchecked(config: ConfigSection, step: Vec<StepConfig>) -> Self {
        Self { config, step }
    }

    pub fn step_named(&self, name: &str) -> Option<&StepConfig> {
        self.step.iter().find(|s| s.name == name)
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Backend used by run actions that do not name an `engine`.
    #[serde(default = "default_engine")]
    pub default_engine: String,

    /// Directory for temporary scripts and recipes; system temp dir if unset.
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// How many trailing stderr lines a failure carries.
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,

    /// Environment overrides applied to every spawned process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Command run after a verified build; `{dest}` is replaced with the
    /// build destination.
    #[serde(default)]
    pub post_build_verify: Option<Vec<String>>,
}

fn default_engine() -> String {
    "singularity".to_string()
}

fn default_stderr_tail_lines() -> usize {
    20
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            default_engine: default_engine(),
            temp_dir: None,
            stderr_tail_lines: default_stderr_tail_lines(),
            env: BTreeMap::new(),
            post_build_verify: None,
        }
    }
}

/// `[[step]]` entry: a named, ordered list of actions.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StepConfig {
    pub name: String,

    #[serde(default)]
    pub action: Vec<ActionConfig>,
}

/// `[[step.action]]` entry.
///
/// `action`, `script` and `args` are structural; every other key is an
/// action option and is validated by the dispatcher, not here.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionConfig {
    pub action: String,

    #[serde(default)]
    pub script: Option<String>,

    #[serde(default)]
    pub args: Vec<toml::Value>,

    #[serde(flatten)]
    pub options: OptionMap,
}

impl From<&ActionConfig> for ActionStatement {
    fn from(cfg: &ActionConfig) -> Self {
        ActionStatement {
            name: cfg.action.clone(),
            args: cfg.args.clone(),
            options: cfg.options.clone(),
            body: cfg.script.clone(),
        }
    }
}
