//! Tracing subscriber setup for the command-line harness.
//!
//! Priority: explicit level, then `RUST_LOG`, then `dremio_extractor=info`.
//! Output goes to stderr so stdout stays reserved for records.

use std::sync::OnceLock;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOGGING_INITIALIZED: OnceLock<()> = OnceLock::new();

fn filter_for(level: Option<&str>) -> Option<EnvFilter> {
    match level {
        Some(level) if level.eq_ignore_ascii_case("off") => None,
        Some(level) => Some(EnvFilter::new(format!(
            "dremio_extractor={}",
            level.to_lowercase()
        ))),
        None => Some(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("dremio_extractor=info")),
        ),
    }
}

/// Installs the global subscriber. Later calls are no-ops.
pub fn init_logging(level: Option<&str>) {
    LOGGING_INITIALIZED.get_or_init(|| {
        let Some(filter) = filter_for(level) else {
            return;
        };
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
            .try_init()
            .ok();
    });
}
