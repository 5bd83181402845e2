// src/backend/mod.rs

//! Pluggable container backends.
//!
//! A backend adapter knows its tool's subcommands and flag spellings and
//! nothing else: it never spawns processes itself, the [`ProcessRunner`]
//! does. Adding a tool means writing one [`ContainerBackend`] impl and
//! registering it in a [`BackendRegistry`]; the dispatcher and the command
//! builder only ever look backends up by [`BackendId`].

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use tracing::debug;

use crate::action::VolumeMount;
use crate::command::Invocation;
use crate::errors::Result;
use crate::exec::{CancelSignal, ProcessResult, ProcessRunner};
use crate::image::{ImageSource, ResolvedImage};
use crate::types::BackendId;

pub mod docker;
pub mod singularity;

pub use docker::DockerBackend;
pub use singularity::SingularityBackend;

/// Per-invocation facts a backend may need to spell its run flags.
#[derive(Debug, Clone, Copy)]
pub struct RunContext<'a> {
    pub workdir: &'a Path,
    /// Directory holding the temporary script; must be visible in the container.
    pub script_dir: &'a Path,
}

/// Capability contract shared by every container tool.
pub trait ContainerBackend: Send + Sync + Debug {
    fn id(&self) -> BackendId;

    /// Executable looked up on `PATH`.
    fn binary(&self) -> &str;

    /// Probe for the binary. Absence only matters at dispatch time.
    fn is_available(&self) -> bool {
        which::which(self.binary()).is_ok()
    }

    fn run_subcommand(&self) -> &'static str;

    fn build_subcommand(&self) -> &'static str;

    /// Spell a classified image source the way this tool accepts it.
    fn image_identifier(&self, source: &ImageSource) -> Result<String>;

    /// Whether a schemeless reference names a registry image rather than a
    /// file on disk.
    fn bare_names_are_registry_images(&self) -> bool {
        false
    }

    /// Flags for one user-supplied bind mount.
    fn mount_flags(&self, mount: &VolumeMount) -> Vec<String>;

    /// Tool-specific run flags (workdir, script directory visibility).
    /// Emitted after the user's mounts.
    fn run_flags(&self, ctx: RunContext<'_>) -> Vec<String>;

    /// Flags forwarding action-level environment variables into the container.
    fn env_flags(&self, _env: &[(String, String)]) -> Vec<String> {
        Vec::new()
    }

    /// Host environment entries forwarding action-level variables.
    fn host_env(&self, _env: &[(String, String)]) -> Vec<(String, String)> {
        Vec::new()
    }

    /// Host variable prefixes passed through to the tool.
    fn inherited_env_prefixes(&self) -> &'static [&'static str];

    /// Flag disabling post-build verification, if the tool has one.
    fn verify_skip_flag(&self) -> Option<&'static str>;

    /// Whether `build` accepts bind mounts.
    fn supports_build_mounts(&self) -> bool;

    /// Whether a build `dest` is a filesystem path (as opposed to a tag).
    fn dest_is_path(&self) -> bool;

    /// Trailing build arguments: destination and recipe/source.
    fn build_target_args(&self, dest: &str, input: &str, workdir: &Path) -> Vec<String>;

    /// Recipe to synthesise when building from an image source, or `None` if
    /// the tool builds straight from the reference.
    fn recipe_for_image(&self, image: &ResolvedImage) -> Option<String>;

    /// File suffix for recipe temp files.
    fn recipe_suffix(&self) -> &'static str;

    fn run<'a>(
        &'a self,
        runner: &'a dyn ProcessRunner,
        invocation: &'a Invocation,
        cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        debug!(backend = %self.id(), command = %invocation.argv, "run");
        runner.execute(invocation, cancel)
    }

    fn build<'a>(
        &'a self,
        runner: &'a dyn ProcessRunner,
        invocation: &'a Invocation,
        cancel: CancelSignal,
    ) -> Pin<Box<dyn Future<Output = Result<ProcessResult>> + Send + 'a>> {
        debug!(backend = %self.id(), command = %invocation.argv, "build");
        runner.execute(invocation, cancel)
    }
}

/// Read-only lookup table of backends, shared after startup.
#[derive(Debug, Clone, Default)]
pub struct BackendRegistry {
    backends: BTreeMap<BackendId, Arc<dyn ContainerBackend>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with Singularity and Docker using their default binaries.
    pub fn with_defaults() -> Self {
        Self::new()
            .register(SingularityBackend::new())
            .register(DockerBackend::new())
    }

    /// Add (or replace) a backend under its own id.
    pub fn register(mut self, backend: impl ContainerBackend + 'static) -> Self {
        self.backends.insert(backend.id(), Arc::new(backend));
        self
    }

    pub fn get(&self, id: &BackendId) -> Option<Arc<dyn ContainerBackend>> {
        self.backends.get(id).cloned()
    }

    pub fn ids(&self) -> impl Iterator<Item = &BackendId> {
        self.backends.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_register_both_backends() {
        let registry = BackendRegistry::with_defaults();
        let ids: Vec<&str> = registry.ids().map(BackendId::as_str).collect();
        assert_eq!(ids, vec!["docker", "singularity"]);
        assert!(registry.get(&BackendId::SINGULARITY).is_some());
        assert!(registry.get(&BackendId::new("podman")).is_none());
    }

    #[test]
    fn missing_binary_is_unavailable() {
        let backend = SingularityBackend::with_binary("stepbox-no-such-binary-x1");
        assert!(!backend.is_available());
    }
}
