// src/engine/dispatcher.rs

//! Action Dispatcher: the single entry point for every container action.
//!
//! Order of work for one request:
//!
//! 1. parse options strictly (nothing spawned on a typo)
//! 2. pick the backend from the registry
//! 3. check required options
//! 4. check the backend binary is on `PATH`
//! 5. resolve the image, write the temp script/recipe
//! 6. run through the backend adapter and the process runner
//! 7. turn a non-zero exit into [`ActionError::NonZeroExit`]
//!
//! Every value created here is local to the call, so one dispatcher can be
//! shared by concurrently running steps.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::action::{ActionRequest, ActionStatement, ExecutionOptions};
use crate::backend::{BackendRegistry, ContainerBackend};
use crate::command::{ArgVector, BuildInput, BuildSpec, CommandBuilder, Invocation};
use crate::config::ConfigSection;
use crate::errors::{ActionError, Result};
use crate::exec::{CancelSignal, ProcessResult, ProcessRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::image::ImageResolver;
use crate::types::{ActionKind, BackendId};

/// Placeholder substituted in the post-build verification command.
pub const DEST_PLACEHOLDER: &str = "{dest}";

/// Dispatcher settings, usually derived from the workflow file's `[config]`.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub default_engine: BackendId,
    pub temp_dir: PathBuf,
    /// Base for relative `workdir` options and local image paths.
    pub workdir: PathBuf,
    pub stderr_tail_lines: usize,
    pub env: Vec<(String, String)>,
    pub post_build_verify: Option<Vec<String>>,
    /// Fail with `BackendUnavailable` when the tool is not on `PATH`.
    /// Turned off for dry runs.
    pub require_available: bool,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_engine: BackendId::SINGULARITY,
            temp_dir: std::env::temp_dir(),
            workdir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            stderr_tail_lines: 20,
            env: Vec::new(),
            post_build_verify: None,
            require_available: true,
        }
    }
}

impl DispatcherConfig {
    pub fn from_section(section: &ConfigSection) -> Self {
        let defaults = Self::default();
        Self {
            default_engine: BackendId::from(section.default_engine.as_str()),
            temp_dir: section.temp_dir.clone().unwrap_or(defaults.temp_dir),
            stderr_tail_lines: section.stderr_tail_lines,
            env: section
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            post_build_verify: section.post_build_verify.clone(),
            ..defaults
        }
    }
}

#[derive(Clone)]
pub struct ActionDispatcher {
    registry: Arc<BackendRegistry>,
    runner: Arc<dyn ProcessRunner>,
    fs: Arc<dyn FileSystem>,
    config: DispatcherConfig,
}

impl ActionDispatcher {
    pub fn new(
        registry: Arc<BackendRegistry>,
        runner: Arc<dyn ProcessRunner>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            runner,
            fs: Arc::new(RealFileSystem),
            config,
        }
    }

    pub fn with_filesystem(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub async fn dispatch(&self, request: ActionRequest) -> Result<ProcessResult> {
        self.dispatch_with_cancel(request, CancelSignal::never())
            .await
    }

    /// Normalise a statement (either surface syntax) and dispatch it.
    pub async fn dispatch_statement(
        &self,
        statement: ActionStatement,
        cancel: CancelSignal,
    ) -> Result<ProcessResult> {
        let request = ActionRequest::from_statement(statement)?;
        self.dispatch_with_cancel(request, cancel).await
    }

    pub async fn dispatch_with_cancel(
        &self,
        request: ActionRequest,
        cancel: CancelSignal,
    ) -> Result<ProcessResult> {
        let action = request.action.clone();
        info!(%action, kind = %request.kind, "dispatching action");

        let outcome = match request.kind {
            ActionKind::Run => self.dispatch_run(request, cancel).await,
            ActionKind::Build => self.dispatch_build(request, cancel).await,
        };

        match &outcome {
            Ok(result) => info!(
                %action,
                exit_code = result.exit_code,
                duration_ms = result.duration.as_millis() as u64,
                "action succeeded"
            ),
            Err(err) => error!(
                %action,
                error = %err,
                configuration = err.is_configuration_error(),
                "action failed"
            ),
        }
        outcome
    }

    async fn dispatch_run(
        &self,
        request: ActionRequest,
        cancel: CancelSignal,
    ) -> Result<ProcessResult> {
        let opts = ExecutionOptions::parse(ActionKind::Run, &request.action, &request.options)?;

        let backend_id = opts
            .engine
            .clone()
            .unwrap_or_else(|| self.config.default_engine.clone());
        let backend = self.registry.get(&backend_id).ok_or_else(|| {
            ActionError::invalid_option(
                "engine",
                format!("no container backend registered as '{backend_id}'"),
            )
        })?;

        let container_ref = request
            .container_ref
            .clone()
            .or_else(|| opts.container.clone())
            .ok_or_else(|| ActionError::MissingOption("container".to_string()))?;

        self.ensure_available(backend.as_ref())?;

        let workdir = self.workdir(&opts);
        let image = ImageResolver::new(self.fs.as_ref()).resolve(
            &container_ref,
            backend.as_ref(),
            ActionKind::Run,
            &workdir,
        )?;

        let builder = CommandBuilder::new(backend.as_ref(), &self.config.temp_dir);
        let prepared = builder.build_run(&image, &request.script_or_recipe, &opts, &workdir)?;
        let invocation = self.invocation(backend.as_ref(), prepared.argv.clone(), &workdir, &opts);

        let result = backend
            .run(self.runner.as_ref(), &invocation, cancel)
            .await;
        // The script must outlive the process.
        drop(prepared);

        self.classify(backend.as_ref(), &invocation, result?)
    }

    async fn dispatch_build(
        &self,
        request: ActionRequest,
        cancel: CancelSignal,
    ) -> Result<ProcessResult> {
        let opts = ExecutionOptions::parse(ActionKind::Build, &request.action, &request.options)?;

        let backend = request
            .build_backend()
            .and_then(|id| self.registry.get(&id))
            .ok_or_else(|| ActionError::UnknownAction(request.action.clone()))?;

        let source_ref = request.container_ref.clone().or_else(|| opts.src.clone());
        let spec = BuildSpec::from_options(&request.script_or_recipe, source_ref.is_some(), &opts)?;

        self.ensure_available(backend.as_ref())?;

        let workdir = self.workdir(&opts);
        let image = match &source_ref {
            Some(reference) => Some(ImageResolver::new(self.fs.as_ref()).resolve(
                reference,
                backend.as_ref(),
                ActionKind::Build,
                &workdir,
            )?),
            None => None,
        };
        if backend.dest_is_path() {
            self.ensure_dest_parent(&workdir, &spec.dest_path)?;
        }

        let input = match &image {
            Some(image) => BuildInput::Image(image),
            None => BuildInput::Recipe,
        };
        let builder = CommandBuilder::new(backend.as_ref(), &self.config.temp_dir);
        let prepared = builder.build_build(&spec, input, &opts, &workdir)?;
        let invocation = self.invocation(backend.as_ref(), prepared.argv.clone(), &workdir, &opts);

        let result = backend
            .build(self.runner.as_ref(), &invocation, cancel.clone())
            .await;
        drop(prepared);
        let result = self.classify(backend.as_ref(), &invocation, result?)?;

        if spec.verify {
            if let Some(hook) = &self.config.post_build_verify {
                self.run_verify_hook(backend.as_ref(), hook, &spec, &workdir, &opts, cancel)
                    .await?;
            }
        }

        Ok(result)
    }

    async fn run_verify_hook(
        &self,
        backend: &dyn ContainerBackend,
        hook: &[String],
        spec: &BuildSpec,
        workdir: &Path,
        opts: &ExecutionOptions,
        cancel: CancelSignal,
    ) -> Result<()> {
        let argv: Vec<String> = hook
            .iter()
            .map(|t| t.replace(DEST_PLACEHOLDER, &spec.dest_path))
            .collect();
        let invocation = self.invocation(backend, ArgVector::new(argv), workdir, opts);
        info!(backend = %backend.id(), command = %invocation.argv, "running post-build verification");

        let result = self.runner.execute(&invocation, cancel).await?;
        self.classify(backend, &invocation, result).map(|_| ())
    }

    fn ensure_available(&self, backend: &dyn ContainerBackend) -> Result<()> {
        if self.config.require_available && !backend.is_available() {
            return Err(ActionError::BackendUnavailable {
                backend: backend.id().to_string(),
                binary: backend.binary().to_string(),
            });
        }
        Ok(())
    }

    fn ensure_dest_parent(&self, workdir: &Path, dest: &str) -> Result<()> {
        let Some(parent) = Path::new(dest).parent() else {
            return Ok(());
        };
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        let parent = workdir.join(parent);
        if !self.fs.is_dir(&parent) {
            self.fs.create_dir_all(&parent)?;
        }
        Ok(())
    }

    fn workdir(&self, opts: &ExecutionOptions) -> PathBuf {
        match &opts.workdir {
            Some(dir) => self.config.workdir.join(dir),
            None => self.config.workdir.clone(),
        }
    }

    fn invocation(
        &self,
        backend: &dyn ContainerBackend,
        argv: ArgVector,
        workdir: &Path,
        opts: &ExecutionOptions,
    ) -> Invocation {
        let mut env = self.config.env.clone();
        env.extend(backend.host_env(&opts.env));
        env.extend(opts.env.iter().cloned());
        let argv = argv.preserving_env(env.iter().map(|(name, _)| name.as_str()));

        Invocation {
            argv,
            workdir: workdir.to_path_buf(),
            env,
            inherit_prefixes: backend
                .inherited_env_prefixes()
                .iter()
                .map(|p| p.to_string())
                .collect(),
            timeout: opts.timeout,
        }
    }

    fn classify(
        &self,
        backend: &dyn ContainerBackend,
        invocation: &Invocation,
        result: ProcessResult,
    ) -> Result<ProcessResult> {
        if result.success() {
            return Ok(result);
        }
        debug!(backend = %backend.id(), "output of failed command:\n{}", result.interleaved_lossy());
        Err(ActionError::NonZeroExit {
            backend: backend.id().to_string(),
            exit_code: result.exit_code,
            command: invocation.argv.to_string(),
            stderr_tail: result.stderr_tail(self.config.stderr_tail_lines),
        })
    }
}
