// src/backend/docker.rs

use std::path::Path;

use crate::action::VolumeMount;
use crate::backend::{ContainerBackend, RunContext};
use crate::errors::{ActionError, Result};
use crate::image::{ImageSource, ResolvedImage};
use crate::types::BackendId;

#[derive(Debug, Clone)]
pub struct DockerBackend {
    binary: String,
}

impl DockerBackend {
    pub fn new() -> Self {
        Self::with_binary("docker")
    }

    /// Use a different executable name or path (e.g. `podman`).
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for DockerBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerBackend for DockerBackend {
    fn id(&self) -> BackendId {
        BackendId::DOCKER
    }

    fn binary(&self) -> &str {
        &self.binary
    }

    fn run_subcommand(&self) -> &'static str {
        "run"
    }

    fn build_subcommand(&self) -> &'static str {
        "build"
    }

    fn image_identifier(&self, source: &ImageSource) -> Result<String> {
        match source {
            ImageSource::DockerRegistry(handle) => Ok(handle.clone()),
            ImageSource::LocalPath(path) => Ok(path.display().to_string()),
            ImageSource::RegistryHub(_) => Err(ActionError::InvalidReference {
                reference: source.to_string(),
                reason: "docker cannot pull from Singularity Hub".to_string(),
            }),
        }
    }

    fn bare_names_are_registry_images(&self) -> bool {
        true
    }

    fn mount_flags(&self, mount: &VolumeMount) -> Vec<String> {
        vec!["-v".to_string(), mount.to_spec()]
    }

    fn run_flags(&self, ctx: RunContext<'_>) -> Vec<String> {
        let workdir = ctx.workdir.display().to_string();
        let script_dir = ctx.script_dir.display().to_string();
        let mut flags = vec!["--rm".to_string()];
        flags.push("-v".to_string());
        flags.push(format!("{workdir}:{workdir}"));
        if ctx.script_dir != ctx.workdir {
            flags.push("-v".to_string());
            flags.push(format!("{script_dir}:{script_dir}"));
        }
        flags.push("-w".to_string());
        flags.push(workdir);
        flags
    }

    fn env_flags(&self, env: &[(String, String)]) -> Vec<String> {
        env.iter()
            .flat_map(|(k, v)| ["-e".to_string(), format!("{k}={v}")])
            .collect()
    }

    fn inherited_env_prefixes(&self) -> &'static [&'static str] {
        &["DOCKER_"]
    }

    fn verify_skip_flag(&self) -> Option<&'static str> {
        None
    }

    fn supports_build_mounts(&self) -> bool {
        false
    }

    fn dest_is_path(&self) -> bool {
        false
    }

    fn build_target_args(&self, dest: &str, input: &str, workdir: &Path) -> Vec<String> {
        vec![
            "-t".to_string(),
            dest.to_string(),
            "-f".to_string(),
            input.to_string(),
            workdir.display().to_string(),
        ]
    }

    fn recipe_for_image(&self, image: &ResolvedImage) -> Option<String> {
        Some(format!("FROM {}\n", image.local_identifier))
    }

    fn recipe_suffix(&self) -> &'static str {
        ".Dockerfile"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn docker_scheme_is_stripped_and_shub_rejected() {
        let b = DockerBackend::new();
        assert_eq!(
            b.image_identifier(&ImageSource::DockerRegistry("godlovedc/lolcow".into()))
                .unwrap(),
            "godlovedc/lolcow"
        );
        assert!(matches!(
            b.image_identifier(&ImageSource::RegistryHub("GodloveD/lolcow".into())),
            Err(ActionError::InvalidReference { .. })
        ));
    }

    #[test]
    fn run_flags_mount_workdir_and_script_dir() {
        let b = DockerBackend::new();
        let flags = b.run_flags(RunContext {
            workdir: Path::new("/work"),
            script_dir: Path::new("/tmp"),
        });
        assert_eq!(
            flags,
            vec!["--rm", "-v", "/work:/work", "-v", "/tmp:/tmp", "-w", "/work"]
        );
    }

    #[test]
    fn image_source_builds_from_synthesised_recipe() {
        let b = DockerBackend::new();
        let image = ResolvedImage {
            backend: BackendId::DOCKER,
            local_identifier: "godlovedc/lolcow".into(),
        };
        assert_eq!(b.recipe_for_image(&image).as_deref(), Some("FROM godlovedc/lolcow\n"));
    }
}
