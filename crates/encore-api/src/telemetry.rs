//! Tracing setup for the API binary.

use tracing_subscriber::{
    fmt::format::Format, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default
/// filter; the console format is compact, without target or timestamps
/// (the process supervisor timestamps lines already).
pub fn init_telemetry() {
    let console_fmt = tracing_subscriber::fmt::layer().event_format(
        Format::default()
            .compact()
            .with_target(false)
            .without_time(),
    );
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "encore=debug,tower_http=debug".into()),
        )
        .with(console_fmt)
        .init();
}
