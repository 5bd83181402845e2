pub mod builders;
pub mod fake_backend;
pub mod spy_runner;

use std::sync::Once;
use tracing_subscriber::{EnvFilter, fmt};

static INIT: Once = Once::new();

/// Route `tracing` output through the test harness capture.
///
/// Reads the same `STEPBOX_LOG` filter as the binary, defaulting to `info`.
/// Output is shown for failing tests only unless `--nocapture` is passed.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(stepbox::logging::LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new("info"));
        fmt().with_env_filter(filter).with_test_writer().init();
    });
}

/// Fail the test if `f` has not finished within ten seconds.
///
/// Long enough for a terminated process group to be reaped.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(10), f)
        .await
        .expect("test did not finish within 10 seconds")
}

/// Names of the entries currently in `dir`, sorted.
pub fn list_dir(dir: &std::path::Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("listing temp dir")
        .map(|e| e.expect("dir entry").file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
