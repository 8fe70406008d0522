//! Shared helpers for the `recipeshard` integration tests: recipe tree and
//! config builders, plus recording fakes for every build collaborator.

pub mod builders;
pub mod fakes;

use std::sync::Once;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Route `tracing` output through the test harness so it only shows for
/// failing tests. `RECIPESHARD_LOG` picks the filter, default `debug`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_env("RECIPESHARD_LOG")
            .unwrap_or_else(|_| EnvFilter::new("recipeshard=debug"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
