// src/command/builder.rs

//! Command Builder: run and build argument vectors.
//!
//! ```text
//! run:   [sudo] <bin> <run-sub> <env flags> <user mounts…> <backend flags> <image> <interpreter…> <script>
//! build: [sudo] <bin> <build-sub> [<skip-verify>] [<user mounts…>] <dest/recipe args>
//! ```
//!
//! User mounts keep the order they were given in; the first matching mount
//! wins in both tools.

use std::path::Path;

use crate::action::ExecutionOptions;
use crate::backend::{ContainerBackend, RunContext};
use crate::command::{ArgVector, TempScriptFile};
use crate::errors::{ActionError, Result};
use crate::image::ResolvedImage;

/// Separate leading token used for privileged actions.
pub const PRIVILEGE_PREFIX: &str = "sudo";

/// Interpreter used for run scripts when none is configured.
pub const DEFAULT_INTERPRETER: &[&str] = &["/bin/bash", "-ev"];

const RUN_SCRIPT_PREFIX: &str = "stepbox-run-";
const RECIPE_PREFIX: &str = "stepbox-recipe-";

/// What a build should produce and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Backend-native recipe text, passed through uninterpreted.
    pub recipe_body: String,
    pub dest_path: String,
    pub privileged: bool,
    pub verify: bool,
}

impl BuildSpec {
    /// Check that a build has a destination and exactly one input.
    pub fn from_options(
        recipe_body: &str,
        has_image_source: bool,
        opts: &ExecutionOptions,
    ) -> Result<Self> {
        let dest_path = opts
            .dest
            .clone()
            .ok_or_else(|| ActionError::MissingOption("dest".to_string()))?;

        let has_recipe = !recipe_body.trim().is_empty();
        match (has_recipe, has_image_source) {
            (false, false) => return Err(ActionError::MissingOption("src".to_string())),
            (true, true) => {
                return Err(ActionError::invalid_option(
                    "src",
                    "an image source cannot be combined with a recipe body",
                ));
            }
            _ => {}
        }

        Ok(Self {
            recipe_body: recipe_body.to_string(),
            dest_path,
            privileged: opts.privileged,
            verify: opts.verify,
        })
    }
}

/// What a build consumes.
#[derive(Debug, Clone, Copy)]
pub enum BuildInput<'a> {
    /// Use [`BuildSpec::recipe_body`].
    Recipe,
    /// Build from an already resolved image.
    Image(&'a ResolvedImage),
}

/// An argument vector plus the temp file it points at.
///
/// The script is removed when this value is dropped, so it must outlive the
/// process it was built for.
#[derive(Debug)]
pub struct PreparedCommand {
    pub argv: ArgVector,
    pub script: Option<TempScriptFile>,
}

#[derive(Debug)]
pub struct CommandBuilder<'a> {
    backend: &'a dyn ContainerBackend,
    temp_dir: &'a Path,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(backend: &'a dyn ContainerBackend, temp_dir: &'a Path) -> Self {
        Self { backend, temp_dir }
    }

    /// Write `command_text` to an executable temp script and compose the run
    /// argument vector ending in that script's path.
    pub fn build_run(
        &self,
        image: &ResolvedImage,
        command_text: &str,
        opts: &ExecutionOptions,
        workdir: &Path,
    ) -> Result<PreparedCommand> {
        let script =
            TempScriptFile::create(self.temp_dir, RUN_SCRIPT_PREFIX, ".sh", command_text, true)?;

        let mut argv = self.head(opts.privileged, self.backend.run_subcommand());
        argv.extend(self.backend.env_flags(&opts.env));
        for mount in &opts.volumes {
            argv.extend(self.backend.mount_flags(mount));
        }
        argv.extend(self.backend.run_flags(RunContext {
            workdir,
            script_dir: script.dir(),
        }));
        argv.push(image.local_identifier.clone());
        match &opts.interpreter {
            Some(words) => argv.extend(words.iter().cloned()),
            None => argv.extend(DEFAULT_INTERPRETER.iter().map(|s| s.to_string())),
        }
        argv.push(script.path().display().to_string());

        Ok(PreparedCommand {
            argv: ArgVector::new(argv),
            script: Some(script),
        })
    }

    /// Compose the build argument vector, writing a recipe temp file when the
    /// backend needs one.
    pub fn build_build(
        &self,
        spec: &BuildSpec,
        input: BuildInput<'_>,
        opts: &ExecutionOptions,
        workdir: &Path,
    ) -> Result<PreparedCommand> {
        if !opts.volumes.is_empty() && !self.backend.supports_build_mounts() {
            return Err(ActionError::invalid_option(
                "volumes",
                format!("{} build does not accept bind mounts", self.backend.id()),
            ));
        }

        let (script, input_arg) = match input {
            BuildInput::Recipe => self.write_recipe(&spec.recipe_body)?,
            BuildInput::Image(image) => match self.backend.recipe_for_image(image) {
                Some(text) => self.write_recipe(&text)?,
                None => (None, image.local_identifier.clone()),
            },
        };

        let mut argv = self.head(spec.privileged, self.backend.build_subcommand());
        if !spec.verify {
            if let Some(flag) = self.backend.verify_skip_flag() {
                argv.push(flag.to_string());
            }
        }
        for mount in &opts.volumes {
            argv.extend(self.backend.mount_flags(mount));
        }
        argv.extend(
            self.backend
                .build_target_args(&spec.dest_path, &input_arg, workdir),
        );

        Ok(PreparedCommand {
            argv: ArgVector::new(argv),
            script,
        })
    }

    fn write_recipe(&self, text: &str) -> Result<(Option<TempScriptFile>, String)> {
        let file = TempScriptFile::create(
            self.temp_dir,
            RECIPE_PREFIX,
            self.backend.recipe_suffix(),
            text,
            false,
        )?;
        let path = file.path().display().to_string();
        Ok((Some(file), path))
    }

    fn head(&self, privileged: bool, subcommand: &str) -> Vec<String> {
        let mut argv = Vec::new();
        if privileged {
            argv.push(PRIVILEGE_PREFIX.to_string());
        }
        argv.push(self.backend.binary().to_string());
        argv.push(subcommand.to_string());
        argv
    }
}
