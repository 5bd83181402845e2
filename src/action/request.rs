// src/action/request.rs

//! Normalising both surface syntaxes into one request shape.
//!
//! ```text
//! run: container='shub://singularityhub/ubuntu'      ─┐
//! echo 'Echo'                                          ├─> ActionRequest
//! singularity_build(src='shub://…', dest='x.simg')   ─┘
//! ```
//!
//! The option-block style supplies options plus a body; the keyword-call
//! style supplies positional arguments plus keyword options. Both land in
//! [`ActionRequest`] and are dispatched by the same code path.

use toml::Value;

use crate::action::OptionMap;
use crate::errors::{ActionError, Result};
use crate::types::{ActionKind, BUILD_ACTION_SUFFIX, BackendId};

/// An action statement as produced by the workflow front end.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionStatement {
    /// Action name as written, e.g. `run` or `singularity_build`.
    pub name: String,
    /// Positional call arguments.
    pub args: Vec<Value>,
    /// Keyword arguments or option-block options.
    pub options: OptionMap,
    /// Literal body following an option block.
    pub body: Option<String>,
}

/// One normalised action, owned by a single dispatch call.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRequest {
    pub action: String,
    pub kind: ActionKind,
    pub container_ref: Option<String>,
    pub script_or_recipe: String,
    pub options: OptionMap,
}

impl ActionRequest {
    /// A `run` action. `container` is stored as the `container` option.
    pub fn run(container: impl Into<String>, script: impl Into<String>) -> Self {
        let container = container.into();
        let mut options = OptionMap::new();
        options.insert("container".to_string(), Value::String(container.clone()));
        Self {
            action: crate::types::RUN_ACTION.to_string(),
            kind: ActionKind::Run,
            container_ref: Some(container),
            script_or_recipe: script.into(),
            options,
        }
    }

    /// A `<backend>_build` action with a recipe body (possibly empty).
    pub fn build(backend: &BackendId, recipe: impl Into<String>) -> Self {
        Self {
            action: format!("{backend}{BUILD_ACTION_SUFFIX}"),
            kind: ActionKind::Build,
            container_ref: None,
            script_or_recipe: recipe.into(),
            options: OptionMap::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// Backend named by a build action (`docker_build` → `docker`).
    pub fn build_backend(&self) -> Option<BackendId> {
        self.action
            .strip_suffix(BUILD_ACTION_SUFFIX)
            .filter(|name| !name.is_empty())
            .map(BackendId::from)
    }

    /// Normalise an action statement.
    ///
    /// - `run`: the script is the body or the single positional argument;
    ///   the container comes from the `container` option.
    /// - `<backend>_build`: the single positional argument is the image
    ///   source (alternative to `src`); the body is the recipe.
    pub fn from_statement(stmt: ActionStatement) -> Result<Self> {
        let kind: ActionKind = stmt
            .name
            .parse()
            .map_err(|_| ActionError::UnknownAction(stmt.name.clone()))?;

        if stmt.args.len() > 1 {
            return Err(ActionError::invalid_option(
                "args",
                format!("'{}' takes at most one positional argument", stmt.name),
            ));
        }
        let positional = match stmt.args.into_iter().next() {
            None => None,
            Some(Value::String(s)) => Some(s),
            Some(other) => {
                return Err(ActionError::invalid_option(
                    "args",
                    format!("positional argument must be a string, got {}", other.type_str()),
                ));
            }
        };

        let (container_ref, script_or_recipe) = match kind {
            ActionKind::Run => {
                let script = match (stmt.body, positional) {
                    (Some(_), Some(_)) => {
                        return Err(ActionError::invalid_option(
                            "args",
                            "script given both as body and as positional argument",
                        ));
                    }
                    (Some(body), None) | (None, Some(body)) => body,
                    (None, None) => String::new(),
                };
                let container = match stmt.options.get("container") {
                    Some(Value::String(s)) => Some(s.clone()),
                    _ => None,
                };
                (container, script)
            }
            ActionKind::Build => {
                let src = match stmt.options.get("src") {
                    Some(Value::String(s)) => Some(s.clone()),
                    _ => None,
                };
                let source = match (positional, src) {
                    (Some(p), Some(s)) if p != s => {
                        return Err(ActionError::invalid_option(
                            "src",
                            "conflicts with the positional image source",
                        ));
                    }
                    (p, s) => p.or(s),
                };
                (source, stmt.body.unwrap_or_default())
            }
        };

        Ok(Self {
            action: stmt.name,
            kind,
            container_ref,
            script_or_recipe,
            options: stmt.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(src: &str) -> OptionMap {
        toml::from_str(src).unwrap()
    }

    #[test]
    fn option_block_and_keyword_call_normalise_identically() {
        let block = ActionStatement {
            name: "singularity_build".into(),
            args: vec![],
            options: opts("src = 'shub://GodloveD/lolcow'\ndest = 'lolcow_shub.simg'\nsudo = true\nnotest = true"),
            body: None,
        };
        let call = ActionStatement {
            name: "singularity_build".into(),
            args: vec![Value::String("shub://GodloveD/lolcow".into())],
            options: opts("dest = 'lolcow_shub.simg'\nsudo = true\nnotest = true"),
            body: None,
        };

        let a = ActionRequest::from_statement(block).unwrap();
        let b = ActionRequest::from_statement(call).unwrap();
        assert_eq!(a.kind, ActionKind::Build);
        assert_eq!(a.container_ref, b.container_ref);
        assert_eq!(a.script_or_recipe, b.script_or_recipe);
        assert_eq!(a.build_backend(), Some(BackendId::SINGULARITY));
    }

    #[test]
    fn run_block_takes_container_from_options() {
        let stmt = ActionStatement {
            name: "run".into(),
            args: vec![],
            options: opts("container = 'shub://singularityhub/ubuntu'"),
            body: Some("echo 'Echo'\n".into()),
        };
        let req = ActionRequest::from_statement(stmt).unwrap();
        assert_eq!(req.kind, ActionKind::Run);
        assert_eq!(req.container_ref.as_deref(), Some("shub://singularityhub/ubuntu"));
        assert_eq!(req.script_or_recipe, "echo 'Echo'\n");
    }

    #[test]
    fn unknown_action_names_fail() {
        let stmt = ActionStatement {
            name: "python".into(),
            ..Default::default()
        };
        assert!(matches!(
            ActionRequest::from_statement(stmt),
            Err(ActionError::UnknownAction(_))
        ));
    }

    #[test]
    fn conflicting_sources_fail() {
        let stmt = ActionStatement {
            name: "docker_build".into(),
            args: vec![Value::String("docker://a".into())],
            options: opts("src = 'docker://b'"),
            body: None,
        };
        assert!(matches!(
            ActionRequest::from_statement(stmt),
            Err(ActionError::InvalidOption { .. })
        ));
    }
}
