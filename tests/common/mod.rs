#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use stepbox::backend::BackendRegistry;
use stepbox::engine::{ActionDispatcher, DispatcherConfig};
use stepbox_test_utils::spy_runner::SpyRunner;

pub use stepbox_test_utils::{init_tracing, list_dir, with_timeout};

/// Dispatcher over the default backends that records instead of spawning.
///
/// Backend availability is not checked, so these tests pass on machines
/// without Singularity or Docker.
pub fn spy_dispatcher(runner: &SpyRunner, temp_dir: &Path) -> ActionDispatcher {
    spy_dispatcher_with(BackendRegistry::with_defaults(), runner, temp_dir)
}

pub fn spy_dispatcher_with(
    registry: BackendRegistry,
    runner: &SpyRunner,
    temp_dir: &Path,
) -> ActionDispatcher {
    let config = DispatcherConfig {
        temp_dir: temp_dir.to_path_buf(),
        workdir: temp_dir.to_path_buf(),
        require_available: false,
        ..DispatcherConfig::default()
    };
    ActionDispatcher::new(Arc::new(registry), Arc::new(runner.clone()), config)
}
