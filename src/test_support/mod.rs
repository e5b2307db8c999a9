//! Internal helpers re-exported for integration tests.
//!
//! Log capture lets behavioural tests assert on warnings, and the fixtures
//! stand in for the release host and the gitops binary itself.

mod fixtures;
mod logging;

#[cfg(unix)]
pub use fixtures::write_script;
pub use fixtures::{fake_gitops_script, release_json, test_runtime};
pub use logging::{capture_logs, capture_warn_logs};
