use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

/// Key under which a container backend is registered.
///
/// Kept as an open string key (rather than a closed enum) so a new backend
/// only needs an adapter and a registry entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BackendId(Cow<'static, str>);

impl BackendId {
    pub const SINGULARITY: BackendId = BackendId(Cow::Borrowed("singularity"));
    pub const DOCKER: BackendId = BackendId(Cow::Borrowed("docker"));

    pub fn new(name: impl Into<String>) -> Self {
        BackendId(Cow::Owned(name.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BackendId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BackendId {
    fn from(s: &str) -> Self {
        BackendId::new(s.trim().to_lowercase())
    }
}

/// The two shapes an action statement can take once normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Run,
    Build,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Run => f.write_str("run"),
            ActionKind::Build => f.write_str("build"),
        }
    }
}

/// Suffix that turns a backend name into its build action (`singularity_build`).
pub const BUILD_ACTION_SUFFIX: &str = "_build";

/// Action name recognised for inline run blocks.
pub const RUN_ACTION: &str = "run";

impl FromStr for ActionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s == RUN_ACTION {
            Ok(ActionKind::Run)
        } else if s.ends_with(BUILD_ACTION_SUFFIX) && s.len() > BUILD_ACTION_SUFFIX.len() {
            Ok(ActionKind::Build)
        } else {
            Err(format!("unknown action '{s}' (expected \"run\" or \"<backend>_build\")"))
        }
    }
}

/// Which pipe a captured output line came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}
