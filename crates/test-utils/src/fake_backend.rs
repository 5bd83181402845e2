use std::path::Path;

use stepbox::action::VolumeMount;
use stepbox::backend::{ContainerBackend, RunContext};
use stepbox::errors::Result;
use stepbox::image::{ImageSource, ResolvedImage};
use stepbox::types::BackendId;

/// A third backend used to check that registration alone is enough.
#[derive(Debug, Clone)]
pub struct FakeBackend {
    available: bool,
}

impl FakeBackend {
    pub fn new(available: bool) -> Self {
        Self { available }
    }
}

impl ContainerBackend for FakeBackend {
    fn id(&self) -> BackendId {
        BackendId::new("fake")
    }

    fn binary(&self) -> &str {
        "fake-container"
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn run_subcommand(&self) -> &'static str {
        "go"
    }

    fn build_subcommand(&self) -> &'static str {
        "make"
    }

    fn image_identifier(&self, source: &ImageSource) -> Result<String> {
        Ok(format!("fake:{source}"))
    }

    fn bare_names_are_registry_images(&self) -> bool {
        true
    }

    fn mount_flags(&self, mount: &VolumeMount) -> Vec<String> {
        vec![format!("--mount={}", mount.to_spec())]
    }

    fn run_flags(&self, _ctx: RunContext<'_>) -> Vec<String> {
        Vec::new()
    }

    fn inherited_env_prefixes(&self) -> &'static [&'static str] {
        &["FAKE_"]
    }

    fn verify_skip_flag(&self) -> Option<&'static str> {
        Some("--no-check")
    }

    fn supports_build_mounts(&self) -> bool {
        true
    }

    fn dest_is_path(&self) -> bool {
        true
    }

    fn build_target_args(&self, dest: &str, input: &str, _workdir: &Path) -> Vec<String> {
        vec!["--out".to_string(), dest.to_string(), input.to_string()]
    }

    fn recipe_for_image(&self, _image: &ResolvedImage) -> Option<String> {
        None
    }

    fn recipe_suffix(&self) -> &'static str {
        ".fake"
    }
}
