// tests/workflow_file.rs

mod common;
use crate::common::{init_tracing, list_dir};

use std::error::Error;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use stepbox::backend::BackendRegistry;
use stepbox::config::{load_and_validate, load_from_str, WorkflowFile};
use stepbox::engine::{run_workflow, ActionDispatcher, DispatcherConfig, WorkflowSummary};
use stepbox::errors::ActionError;
use stepbox::exec::CancelSignal;
use stepbox_test_utils::builders::{ActionConfigBuilder, StepBuilder, WorkflowFileBuilder};
use stepbox_test_utils::spy_runner::SpyRunner;

type TestResult = Result<(), Box<dyn Error>>;

fn demo(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn dispatcher_for(workflow: &WorkflowFile, runner: &SpyRunner, temp_dir: &Path) -> ActionDispatcher {
    let config = DispatcherConfig {
        temp_dir: temp_dir.to_path_buf(),
        workdir: temp_dir.to_path_buf(),
        require_available: false,
        ..DispatcherConfig::from_section(&workflow.config)
    };
    ActionDispatcher::new(
        Arc::new(BackendRegistry::with_defaults()),
        Arc::new(runner.clone()),
        config,
    )
}

#[tokio::test]
async fn singularity_demo_runs_every_action_in_order() -> TestResult {
    init_tracing();
    let tmp = tempfile::tempdir()?;
    let workflow = load_and_validate(demo("singularity.toml"))?;
    let runner = SpyRunner::new();
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    let summary = run_workflow(&workflow, &dispatcher, None, CancelSignal::never()).await?;
    assert_eq!(
        summary,
        WorkflowSummary {
            steps_run: 3,
            actions_run: 4
        }
    );

    let calls = runner.calls();
    let run = calls[0].argv();
    assert_eq!(&run[..2], &["singularity", "exec"]);
    let script = PathBuf::from(run.last().unwrap());
    assert_eq!(calls[0].file_contents(&script), Some("echo 'Echo'\n"));

    let recipe_build = calls[1].argv();
    assert_eq!(&recipe_build[..5], &["sudo", "singularity", "build", "--notest", "lolcow.simg"]);
    let recipe = PathBuf::from(recipe_build.last().unwrap());
    assert!(calls[1]
        .file_contents(&recipe)
        .is_some_and(|text| text.starts_with("Bootstrap: docker\nFrom: ubuntu:16.04\n")));

    assert_eq!(
        calls[2].argv(),
        &["sudo", "singularity", "build", "--notest", "lolcow_shub.simg", "shub://GodloveD/lolcow"]
    );
    assert_eq!(
        calls[3].argv(),
        &["sudo", "singularity", "build", "--notest", "lolcow_docker.simg", "docker://godlovedc/lolcow"]
    );

    assert!(list_dir(tmp.path()).is_empty());
    Ok(())
}

#[tokio::test]
async fn docker_demo_uses_the_default_engine_and_config_env() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workflow = load_and_validate(demo("docker.toml"))?;
    let runner = SpyRunner::new();
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    run_workflow(&workflow, &dispatcher, None, CancelSignal::never()).await?;

    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    let run = &calls[0];
    assert_eq!(&run.argv()[..2], &["docker", "run"]);
    assert!(run.argv().contains(&"ubuntu:22.04".to_string()));
    assert!(run.argv().contains(&"/tmp:/scratch".to_string()));
    assert!(
        run.invocation
            .env
            .contains(&("LC_ALL".to_string(), "C".to_string()))
    );
    assert_eq!(run.invocation.timeout.map(|t| t.as_secs()), Some(600));
    assert_eq!(&calls[1].argv()[..4], &["docker", "build", "-t", "stepbox/lolcow:latest"]);
    Ok(())
}

#[tokio::test]
async fn only_the_selected_step_runs() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workflow = load_and_validate(demo("singularity.toml"))?;
    let runner = SpyRunner::new();
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    let summary = run_workflow(
        &workflow,
        &dispatcher,
        Some("build_from_hubs"),
        CancelSignal::never(),
    )
    .await?;
    assert_eq!(summary.actions_run, 2);
    assert_eq!(runner.call_count(), 2);

    let err = run_workflow(&workflow, &dispatcher, Some("nope"), CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Config(_)));
    Ok(())
}

#[tokio::test]
async fn first_failure_stops_the_workflow() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workflow = load_and_validate(demo("singularity.toml"))?;
    let runner = SpyRunner::failing(1, "FATAL: nope\n");
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    let err = run_workflow(&workflow, &dispatcher, None, CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::NonZeroExit { exit_code: 1, .. }));
    assert_eq!(runner.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn typo_in_an_action_spawns_nothing() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workflow = WorkflowFileBuilder::new()
        .with_step(
            StepBuilder::new("typo")
                .action(
                    ActionConfigBuilder::new("run")
                        .option("container", "shub://singularityhub/ubuntu")
                        .option("sudoo", true)
                        .script("echo hi")
                        .build(),
                )
                .build(),
        )
        .build();
    let runner = SpyRunner::new();
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    let err = run_workflow(&workflow, &dispatcher, None, CancelSignal::never())
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::UnrecognizedOption { ref key, .. } if key == "sudoo"));
    assert_eq!(runner.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn cancelled_workflow_starts_nothing() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workflow = load_and_validate(demo("singularity.toml"))?;
    let runner = SpyRunner::new();
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    let (handle, signal) = CancelSignal::pair();
    handle.cancel();
    let err = run_workflow(&workflow, &dispatcher, None, signal)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::Interrupted { .. }));
    assert_eq!(runner.call_count(), 0);
    Ok(())
}

#[tokio::test]
async fn verify_hook_from_config_runs_after_build() -> TestResult {
    let tmp = tempfile::tempdir()?;
    let workflow = WorkflowFileBuilder::new()
        .with_post_build_verify(&["singularity", "test", "{dest}"])
        .with_step(
            StepBuilder::new("image")
                .action(
                    ActionConfigBuilder::new("singularity_build")
                        .arg("docker://godlovedc/lolcow")
                        .option("dest", "lolcow.simg")
                        .build(),
                )
                .build(),
        )
        .build();
    let runner = SpyRunner::new();
    let dispatcher = dispatcher_for(&workflow, &runner, tmp.path());

    run_workflow(&workflow, &dispatcher, None, CancelSignal::never()).await?;
    let calls = runner.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].argv(), &["singularity", "test", "lolcow.simg"]);
    Ok(())
}

#[test]
fn unknown_config_keys_are_rejected() {
    let err = load_from_str("[config]\ndefault_engin = 'docker'\n").unwrap_err();
    assert!(matches!(err, ActionError::Toml(_)));
}
