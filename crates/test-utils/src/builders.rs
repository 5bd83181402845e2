#![allow(dead_code)]

use stepbox::action::OptionMap;
use stepbox::config::{ActionConfig, ConfigSection, RawWorkflowFile, StepConfig, WorkflowFile};

/// Builder for `WorkflowFile` to simplify test setup.
pub struct WorkflowFileBuilder {
    workflow: RawWorkflowFile,
}

impl WorkflowFileBuilder {
    pub fn new() -> Self {
        Self {
            workflow: RawWorkflowFile {
                config: ConfigSection::default(),
                step: Vec::new(),
            },
        }
    }

    pub fn with_step(mut self, step: StepConfig) -> Self {
        self.workflow.step.push(step);
        self
    }

    pub fn with_default_engine(mut self, engine: &str) -> Self {
        self.workflow.config.default_engine = engine.to_string();
        self
    }

    pub fn with_post_build_verify(mut self, argv: &[&str]) -> Self {
        self.workflow.config.post_build_verify =
            Some(argv.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn build(self) -> WorkflowFile {
        WorkflowFile::try_from(self.workflow).expect("Failed to build valid workflow from builder")
    }
}

impl Default for WorkflowFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `[[step]]` entry.
pub struct StepBuilder {
    step: StepConfig,
}

impl StepBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            step: StepConfig {
                name: name.to_string(),
                action: Vec::new(),
            },
        }
    }

    pub fn action(mut self, action: ActionConfig) -> Self {
        self.step.action.push(action);
        self
    }

    pub fn build(self) -> StepConfig {
        self.step
    }
}

/// Builder for a `[[step.action]]` entry.
pub struct ActionConfigBuilder {
    action: ActionConfig,
}

impl ActionConfigBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            action: ActionConfig {
                action: name.to_string(),
                script: None,
                args: Vec::new(),
                options: OptionMap::new(),
            },
        }
    }

    pub fn script(mut self, body: &str) -> Self {
        self.action.script = Some(body.to_string());
        self
    }

    pub fn arg(mut self, value: &str) -> Self {
        self.action.args.push(toml::Value::String(value.to_string()));
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<toml::Value>) -> Self {
        self.action.options.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> ActionConfig {
        self.action
    }
}
