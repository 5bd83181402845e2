// src/action/options.rs

//! Strict option parsing.
//!
//! Every key in an action's option map must be recognised for that action
//! kind; anything else is an [`ActionError::UnrecognizedOption`]. Aliases
//! (`sudo`/`privileged`, `notest`/`verify-skip`) may both be given only if
//! they agree.

use std::path::PathBuf;
use std::time::Duration;

use toml::Value;

use crate::action::OptionMap;
use crate::errors::{ActionError, Result};
use crate::types::{ActionKind, BackendId};

const RUN_KEYS: &[&str] = &[
    "container",
    "engine",
    "sudo",
    "privileged",
    "volumes",
    "workdir",
    "interpreter",
    "env",
    "timeout",
];

const BUILD_KEYS: &[&str] = &[
    "sudo",
    "privileged",
    "notest",
    "verify-skip",
    "dest",
    "src",
    "volumes",
    "workdir",
    "env",
    "timeout",
];

/// Recognised option keys for an action kind.
pub fn recognized_keys(kind: ActionKind) -> &'static [&'static str] {
    match kind {
        ActionKind::Run => RUN_KEYS,
        ActionKind::Build => BUILD_KEYS,
    }
}

/// A `host:container[:mode]` bind mount.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeMount {
    pub host: PathBuf,
    pub container: String,
    pub mode: Option<String>,
}

impl VolumeMount {
    /// Parse `host`, `host:container` or `host:container:mode`.
    pub fn parse(spec: &str) -> Result<Self> {
        let spec = spec.trim();
        let mut parts = spec.splitn(3, ':');
        let host = parts.next().unwrap_or_default();
        if host.is_empty() {
            return Err(ActionError::invalid_option(
                "volumes",
                format!("mount '{spec}' has an empty host path"),
            ));
        }
        let container = match parts.next() {
            Some("") => {
                return Err(ActionError::invalid_option(
                    "volumes",
                    format!("mount '{spec}' has an empty container path"),
                ));
            }
            Some(c) => c.to_string(),
            None => host.to_string(),
        };
        let mode = parts.next().filter(|m| !m.is_empty()).map(str::to_string);

        Ok(Self {
            host: PathBuf::from(host),
            container,
            mode,
        })
    }

    /// `host:container[:mode]`, the spelling both backends accept.
    pub fn to_spec(&self) -> String {
        match &self.mode {
            Some(mode) => format!("{}:{}:{}", self.host.display(), self.container, mode),
            None => format!("{}:{}", self.host.display(), self.container),
        }
    }
}

/// Typed view over an action's option map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionOptions {
    pub container: Option<String>,
    pub engine: Option<BackendId>,
    pub privileged: bool,
    /// False when `notest` / `verify-skip` was requested.
    pub verify: bool,
    pub dest: Option<String>,
    pub src: Option<String>,
    pub volumes: Vec<VolumeMount>,
    pub workdir: Option<PathBuf>,
    pub interpreter: Option<Vec<String>>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
}

impl ExecutionOptions {
    /// Validate `options` for `action` (named `action_name` for diagnostics).
    pub fn parse(kind: ActionKind, action_name: &str, options: &OptionMap) -> Result<Self> {
        let allowed = recognized_keys(kind);
        if let Some(key) = options.keys().find(|k| !allowed.contains(&k.as_str())) {
            return Err(ActionError::UnrecognizedOption {
                action: action_name.to_string(),
                key: key.clone(),
            });
        }

        let privileged = aliased_bool(options, "sudo", "privileged")?.unwrap_or(false);
        let skip_verify = aliased_bool(options, "notest", "verify-skip")?.unwrap_or(false);

        let interpreter = match string_opt(options, "interpreter")? {
            Some(s) => {
                let words: Vec<String> = s.split_whitespace().map(str::to_string).collect();
                if words.is_empty() {
                    return Err(ActionError::invalid_option("interpreter", "must not be empty"));
                }
                Some(words)
            }
            None => None,
        };

        Ok(Self {
            container: string_opt(options, "container")?,
            engine: string_opt(options, "engine")?.map(|s| BackendId::from(s.as_str())),
            privileged,
            verify: !skip_verify,
            dest: string_opt(options, "dest")?,
            src: string_opt(options, "src")?,
            volumes: volumes_opt(options)?,
            workdir: string_opt(options, "workdir")?.map(PathBuf::from),
            interpreter,
            env: env_opt(options)?,
            timeout: timeout_opt(options)?,
        })
    }
}

fn bool_opt(options: &OptionMap, key: &str) -> Result<Option<bool>> {
    match options.get(key) {
        None => Ok(None),
        Some(Value::Boolean(b)) => Ok(Some(*b)),
        Some(other) => Err(ActionError::invalid_option(
            key,
            format!("expected a boolean, got {}", other.type_str()),
        )),
    }
}

fn aliased_bool(options: &OptionMap, key: &str, alias: &str) -> Result<Option<bool>> {
    match (bool_opt(options, key)?, bool_opt(options, alias)?) {
        (Some(a), Some(b)) if a != b => Err(ActionError::invalid_option(
            key,
            format!("conflicts with '{alias}'"),
        )),
        (a, b) => Ok(a.or(b)),
    }
}

fn string_opt(options: &OptionMap, key: &str) -> Result<Option<String>> {
    match options.get(key) {
        None => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ActionError::invalid_option(
            key,
            "must not be empty",
        )),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ActionError::invalid_option(
            key,
            format!("expected a string, got {}", other.type_str()),
        )),
    }
}

fn volumes_opt(options: &OptionMap) -> Result<Vec<VolumeMount>> {
    match options.get("volumes") {
        None => Ok(Vec::new()),
        Some(Value::String(s)) => Ok(vec![VolumeMount::parse(s)?]),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => VolumeMount::parse(s),
                other => Err(ActionError::invalid_option(
                    "volumes",
                    format!("expected mount strings, got {}", other.type_str()),
                )),
            })
            .collect(),
        Some(other) => Err(ActionError::invalid_option(
            "volumes",
            format!("expected a string or a list of strings, got {}", other.type_str()),
        )),
    }
}

fn env_opt(options: &OptionMap) -> Result<Vec<(String, String)>> {
    let table = match options.get("env") {
        None => return Ok(Vec::new()),
        Some(Value::Table(t)) => t,
        Some(other) => {
            return Err(ActionError::invalid_option(
                "env",
                format!("expected a table, got {}", other.type_str()),
            ));
        }
    };

    table
        .iter()
        .map(|(name, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Integer(i) => i.to_string(),
                Value::Float(f) => f.to_string(),
                Value::Boolean(b) => b.to_string(),
                other => {
                    return Err(ActionError::invalid_option(
                        "env",
                        format!("variable '{name}' must be a scalar, got {}", other.type_str()),
                    ));
                }
            };
            Ok((name.clone(), value))
        })
        .collect()
}

fn timeout_opt(options: &OptionMap) -> Result<Option<Duration>> {
    let secs = match options.get("timeout") {
        None => return Ok(None),
        Some(Value::Integer(i)) => *i as f64,
        Some(Value::Float(f)) => *f,
        Some(other) => {
            return Err(ActionError::invalid_option(
                "timeout",
                format!("expected seconds as a number, got {}", other.type_str()),
            ));
        }
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ActionError::invalid_option("timeout", "must be a positive number of seconds"));
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|_| ActionError::invalid_option("timeout", format!("{secs} seconds is out of range")))
}
