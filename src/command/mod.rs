// src/command/mod.rs

//! Turning resolved images and bodies into argument vectors.
//!
//! - [`script`] owns the [`TempScriptFile`] scoped resource.
//! - [`builder`] composes run/build argument vectors from a backend's flag
//!   spellings.
//!
//! An [`ArgVector`] is always executed directly, never through a shell, so
//! nothing in a script body or an option value is ever expanded.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub mod builder;
pub mod script;

pub use builder::{BuildInput, BuildSpec, CommandBuilder, PRIVILEGE_PREFIX};
pub use script::TempScriptFile;

/// Program followed by its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArgVector(Vec<String>);

impl ArgVector {
    pub fn new(argv: Vec<String>) -> Self {
        Self(argv)
    }

    pub fn program(&self) -> &str {
        self.0.first().map(String::as_str).unwrap_or_default()
    }

    pub fn args(&self) -> &[String] {
        self.0.get(1..).unwrap_or_default()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.iter().any(|t| t == token)
    }

    /// Keep `names` across a leading privilege prefix.
    ///
    /// `sudo` resets the environment, so the variables an invocation sets
    /// are listed in `--preserve-env=A,B` right after it. Unprivileged
    /// vectors are returned unchanged.
    pub fn preserving_env<'a>(mut self, names: impl IntoIterator<Item = &'a str>) -> Self {
        if self.program() != PRIVILEGE_PREFIX {
            return self;
        }
        let mut kept: Vec<&str> = Vec::new();
        for name in names {
            if !kept.contains(&name) {
                kept.push(name);
            }
        }
        if !kept.is_empty() {
            self.0.insert(1, format!("--preserve-env={}", kept.join(",")));
        }
        self
    }
}

impl From<Vec<String>> for ArgVector {
    fn from(argv: Vec<String>) -> Self {
        Self(argv)
    }
}

/// Renders a copy-pasteable command line for diagnostics only.
impl fmt::Display for ArgVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            let plain = !token.is_empty()
                && token
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_./:=@,+%".contains(c));
            if plain {
                f.write_str(token)?;
            } else {
                write!(f, "'{}'", token.replace('\'', r"'\''"))?;
            }
        }
        Ok(())
    }
}

/// Everything the process runner needs for one external command.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub argv: ArgVector,
    pub workdir: PathBuf,
    /// Overrides applied on top of the controlled environment.
    pub env: Vec<(String, String)>,
    /// Host variables with these prefixes are passed through.
    pub inherit_prefixes: Vec<String>,
    pub timeout: Option<Duration>,
}

impl Invocation {
    pub fn new(argv: impl Into<ArgVector>, workdir: impl Into<PathBuf>) -> Self {
        Self {
            argv: argv.into(),
            workdir: workdir.into(),
            env: Vec::new(),
            inherit_prefixes: Vec::new(),
            timeout: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_quotes_only_when_needed() {
        let argv = ArgVector::new(vec![
            "singularity".into(),
            "exec".into(),
            "shub://singularityhub/ubuntu".into(),
            "echo $(rm -rf /)".into(),
            "it's".into(),
        ]);
        assert_eq!(
            argv.to_string(),
            r#"singularity exec shub://singularityhub/ubuntu 'echo $(rm -rf /)' 'it'\''s'"#
        );
    }

    #[test]
    fn program_and_args_split() {
        let argv = ArgVector::new(vec!["docker".into(), "run".into()]);
        assert_eq!(argv.program(), "docker");
        assert_eq!(argv.args(), &["run".to_string()]);
        assert_eq!(ArgVector::default().program(), "");
    }

    #[test]
    fn privileged_vectors_preserve_named_variables() {
        let argv = ArgVector::new(vec!["sudo".into(), "singularity".into(), "exec".into()])
            .preserving_env(["SINGULARITYENV_A", "A", "SINGULARITYENV_A"]);
        assert_eq!(
            argv.as_slice(),
            &["sudo", "--preserve-env=SINGULARITYENV_A,A", "singularity", "exec"]
        );

        let plain = ArgVector::new(vec!["singularity".into()]).preserving_env(["A"]);
        assert_eq!(plain.as_slice(), &["singularity"]);

        let nothing_to_keep = ArgVector::new(vec!["sudo".into(), "docker".into()]).preserving_env([]);
        assert_eq!(nothing_to_keep.as_slice(), &["sudo", "docker"]);
    }
}
