// src/backend/singularity.rs

use std::path::Path;

use crate::action::VolumeMount;
use crate::backend::{ContainerBackend, RunContext};
use crate::errors::Result;
use crate::image::{ImageSource, ResolvedImage};
use crate::types::BackendId;

/// Directory Singularity binds into every container by default.
const DEFAULT_BOUND_TMP: &str = "/tmp";

#[derive(Debug, Clone)]
pub struct SingularityBackend {
    binary: String,
}

impl SingularityBackend {
    pub fn new() -> Self {
        Self::with_binary("singularity")
    }

    /// Use a different executable name or path (e.g. `apptainer`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for SingularityBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBackend for SingularityBackend {
    fn id(&self) -> BackendId {
        BackendId::SINGULARITY
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn run_subcommand(&self) -> &'static str {
        "exec"
    }

    fn build_subcommand(&self) -> &'static str {
        "build"
    }

    fn image_identifier(&self, source: &ImageSource) -> Result<String> {
        // Singularity pulls shub:// and docker:// itself.
        Ok(source.to_string())
    }

    fn mount_flags(&self, mount: &VolumeMount) -> Vec<String> {
        vec!["--bind".to_string(), mount.to_spec()]
    }

    fn run_flags(&self, ctx: RunContext<'_>) -> Vec<String> {
        let mut flags = Vec::new();
        if ctx.script_dir != Path::new(DEFAULT_BOUND_TMP) {
            let dir = ctx.script_dir.display().to_string();
            flags.push("--bind".to_string());
            flags.push(format!("{dir}:{dir}"));
        }
        flags.push("--pwd".to_string());
        flags.push(ctx.workdir.display().to_string());
        flags
    }

    fn host_env(&self, env: &[(String, String)]) -> Vec<(String, String)> {
        env.iter()
            .map(|(k, v)| (format!("SINGULARITYENV_{k}"), v.clone()))
            .collect()
    }

    fn inherited_env_prefixes(&self) -> &'static [&'static str] {
        &["SINGULARITY_", "SINGULARITYENV_", "APPTAINER_"]
    }

    fn verify_skip_flag(&self) -> Option<&'static str> {
        Some("--notest")
    }

    fn supports_build_mounts(&self) -> bool {
        true
    }

    fn dest_is_path(&self) -> bool {
        true
    }

    fn build_target_args(&self, dest: &str, input: &str, _workdir: &Path) -> Vec<String> {
        vec![dest.to_string(), input.to_string()]
    }

    fn recipe_for_image(&self, _image: &ResolvedImage) -> Option<String> {
        None
    }

    fn recipe_suffix(&self) -> &'static str {
        ".def"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn registry_references_pass_through() {
        let b = SingularityBackend::new();
        assert_eq!(
            b.image_identifier(&ImageSource::RegistryHub("GodloveD/lolcow".into()))
                .unwrap(),
            "shub://GodloveD/lolcow"
        );
        assert_eq!(
            b.image_identifier(&ImageSource::LocalPath(PathBuf::from("img.simg")))
                .unwrap(),
            "img.simg"
        );
    }

    #[test]
    fn tmp_script_dir_is_not_rebound() {
        let b = SingularityBackend::new();
        let flags = b.run_flags(RunContext {
            workdir: Path::new("/work"),
            script_dir: Path::new("/tmp"),
        });
        assert_eq!(flags, vec!["--pwd", "/work"]);

        let flags = b.run_flags(RunContext {
            workdir: Path::new("/work"),
            script_dir: Path::new("/scratch/tmp"),
        });
        assert_eq!(flags, vec!["--bind", "/scratch/tmp:/scratch/tmp", "--pwd", "/work"]);
    }

    #[test]
    fn env_goes_through_singularityenv_prefix() {
        let b = SingularityBackend::new();
        let env = b.host_env(&[("LC_ALL".into(), "C".into())]);
        assert_eq!(env, vec![("SINGULARITYENV_LC_ALL".to_string(), "C".to_string())]);
    }
}
