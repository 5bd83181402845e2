// src/config/validate.rs

use std::collections::HashSet;

use crate::config::model::{RawWorkflowFile, WorkflowFile};
use crate::errors::{ActionError, Result};

impl TryFrom<RawWorkflowFile> for WorkflowFile {
    type Error = ActionError;

    fn try_from(raw: RawWorkflowFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_workflow(&raw)?;
        Ok(WorkflowFile::new_unchecked(raw.config, raw.step))
    }
}

fn validate_raw_workflow(raw: &RawWorkflowFile) -> Result<()> {
    validate_global_config(raw)?;
    ensure_has_steps(raw)?;
    validate_steps(raw)?;
    Ok(())
}

fn validate_global_config(raw: &RawWorkflowFile) -> Result<()> {
    if raw.config.default_engine.trim().is_empty() {
        return Err(ActionError::Config(
            "[config].default_engine must not be empty".to_string(),
        ));
    }
    if raw.config.stderr_tail_lines == 0 {
        return Err(ActionError::Config(
            "[config].stderr_tail_lines must be >= 1 (got 0)".to_string(),
        ));
    }
    if let Some(hook) = &raw.config.post_build_verify {
        if hook.is_empty() || hook[0].trim().is_empty() {
            return Err(ActionError::Config(
                "[config].post_build_verify must name a program".to_string(),
            ));
        }
    }
    Ok(())
}

fn ensure_has_steps(raw: &RawWorkflowFile) -> Result<()> {
    if raw.step.is_empty() {
        return Err(ActionError::Config(
            "workflow must contain at least one [[step]] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_steps(raw: &RawWorkflowFile) -> Result<()> {
    let mut seen = HashSet::new();
    for step in &raw.step {
        if step.name.trim().is_empty() {
            return Err(ActionError::Config("step name must not be empty".to_string()));
        }
        if !seen.insert(step.name.as_str()) {
            return Err(ActionError::Config(format!(
                "duplicate step name '{}'",
                step.name
            )));
        }
        if step.action.is_empty() {
            return Err(ActionError::Config(format!(
                "step '{}' has no [[step.action]] entries",
                step.name
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::config::loader::load_from_str;
    use crate::config::model::WorkflowFile;
    use crate::errors::ActionError;

    fn validate(src: &str) -> Result<WorkflowFile, ActionError> {
        WorkflowFile::try_from(load_from_str(src)?)
    }

    #[test]
    fn empty_workflow_is_rejected() {
        assert!(matches!(validate(""), Err(ActionError::Config(_))));
    }

    #[test]
    fn duplicate_step_names_are_rejected() {
        let err = validate(
            r#"
[[step]]
name = "a"
[[step.action]]
action = "run"

[[step]]
name = "a"
[[step.action]]
action = "run"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ActionError::Config(ref m) if m.contains("duplicate")));
    }

    #[test]
    fn zero_tail_lines_is_rejected() {
        let err = validate(
            r#"
[config]
stderr_tail_lines = 0

[[step]]
name = "a"
[[step.action]]
action = "run"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ActionError::Config(ref m) if m.contains("stderr_tail_lines")));
    }

    #[test]
    fn action_options_are_flattened() {
        let wf = validate(
            r#"
[[step]]
name = "build"
[[step.action]]
action = "singularity_build"
src = "shub://GodloveD/lolcow"
dest = "lolcow_shub.simg"
sudo = true
volumes = ["/b:/data", "/a:/data"]
"#,
        )
        .unwrap();
        let action = &wf.step[0].action[0];
        assert_eq!(action.action, "singularity_build");
        assert!(action.script.is_none());
        assert_eq!(action.options.len(), 4);
        assert!(!action.options.contains_key("action"));

        let volumes: Vec<&str> = action.options["volumes"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|v| v.as_str())
            .collect();
        assert_eq!(volumes, vec!["/b:/data", "/a:/data"]);
    }
}
