//! Shared helpers for the `buildgraph` integration tests.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Default budget for a single async test scenario.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Install a test-writer subscriber once per test binary.
///
/// Output is captured by the harness and shown for failing tests only.
/// `BUILDGRAPH_LOG` (or `RUST_LOG`) picks the level; `info` otherwise.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = std::env::var("BUILDGRAPH_LOG")
            .ok()
            .and_then(|v| EnvFilter::try_new(v).ok())
            .or_else(|| EnvFilter::try_from_default_env().ok())
            .unwrap_or_else(|| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Await `f`, panicking if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(value) => value,
        Err(_) => panic!("scenario did not finish within {TEST_TIMEOUT:?}"),
    }
}
