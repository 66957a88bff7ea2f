//! Shared fixtures for pipedag's integration tests.

pub mod builders;
pub mod fake_submitter;

pub use builders::{PipelineBuilder, StageConfigBuilder, request};
pub use fake_submitter::{RecordingSubmitter, SubmitEvent};

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use pipedag::logging::LOG_ENV;
use tracing_subscriber::EnvFilter;

/// Upper bound for a whole orchestrated run in tests.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Route `tracing` output into the test harness capture.
///
/// Filter comes from `PIPEDAG_LOG` (e.g. `PIPEDAG_LOG=pipedag=debug`),
/// defaulting to `warn` so passing runs stay quiet.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        // Another harness may have installed a subscriber first.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, panicking if it outlives [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("test did not finish within {TEST_TIMEOUT:?}"),
    }
}
