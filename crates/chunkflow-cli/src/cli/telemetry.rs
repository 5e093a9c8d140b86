//! Log subscriber setup.
//!
//! Logs always go to stderr: stdout carries the JSON result of a run and must
//! stay machine readable. The filter defaults to `info` and can be overridden
//! through `RUST_LOG`.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_telemetry(json: bool) -> anyhow::Result<()> {
    let human = (!json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
            .with_writer(std::io::stderr)
            .compact()
    });

    let machine = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::rfc_3339())
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(human)
        .with(machine)
        .try_init()?;

    Ok(())
}
