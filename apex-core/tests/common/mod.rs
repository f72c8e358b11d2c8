/// Initializes a `tracing_subscriber` so the `tracing` calls the engine
/// makes during a test run are visible with `cargo test -- --nocapture`.
/// Safe to call from every test: a second `try_init` after the first
/// just returns an error we discard.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::TRACE)
        .try_init();
}
