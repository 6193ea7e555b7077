//! Diagnostics go to stderr through `tracing`, filtered by `PROMPTMETER_LOG`
//! (default `warn`), e.g. `PROMPTMETER_LOG=debug` or
//! `PROMPTMETER_LOG=promptmeter::history=debug`.

use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub fn init(quiet: bool) {
    let default = if quiet { "error" } else { "warn" };
    let filter =
        EnvFilter::try_from_env("PROMPTMETER_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    // No-op when a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
