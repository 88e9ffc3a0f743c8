//! Log output for tests.

/// Route `tracing` output to the test writer, at `warn` and above.
///
/// Safe to call from every test; only the first call installs a subscriber.
pub fn init_test_logging() {
    init_test_logging_at(tracing::Level::WARN);
}

/// Like [`init_test_logging`], with an explicit level.
pub fn init_test_logging_at(level: tracing::Level) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_test_writer()
        .try_init();
}
