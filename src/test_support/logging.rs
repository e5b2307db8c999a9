//! In-memory log capture for tests that assert on warnings.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::Level;
use tracing::subscriber::with_default;
use tracing_subscriber::fmt;

/// Shared byte sink handed to the subscriber as its writer.
#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl LogSink {
    fn lines(&self) -> Vec<String> {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Runs `action` with a thread-local subscriber recording events at `level`
/// and above. Returns the plain-text log lines and the closure result.
#[must_use]
pub fn capture_logs<F, R>(level: Level, action: F) -> (Vec<String>, R)
where
    F: FnOnce() -> R,
{
    let sink = LogSink::default();
    let writer = sink.clone();
    let subscriber = fmt()
        .with_max_level(level)
        .without_time()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let result = with_default(subscriber, action);
    (sink.lines(), result)
}

/// [`capture_logs`] at `WARN`.
///
/// # Examples
/// ```
/// use setup_gitops_cli::test_support::capture_warn_logs;
///
/// let (logs, value) = capture_warn_logs(|| {
///     tracing::warn!("cache entry missing");
///     41 + 1
/// });
/// assert!(logs.iter().any(|line| line.contains("cache entry missing")));
/// assert_eq!(value, 42);
/// ```
#[must_use]
pub fn capture_warn_logs<F, R>(action: F) -> (Vec<String>, R)
where
    F: FnOnce() -> R,
{
    capture_logs(Level::WARN, action)
}
