//! Tracing subscriber setup shared by the binaries

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

use crate::LoggingConfig;

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Install the global subscriber; `RUST_LOG` directives take precedence over `level`
pub fn init_tracing(cfg: &LoggingConfig) {
    let level = parse_level(&cfg.level);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()))
        .add_directive("hyper=warn".parse().unwrap_or_else(|_| level.into()))
        .add_directive("reqwest=warn".parse().unwrap_or_else(|_| level.into()));

    if cfg.format.eq_ignore_ascii_case("json") {
        let layer = fmt::layer()
            .with_ansi(false)
            .with_target(true)
            .with_level(true)
            .json()
            .flatten_event(true);

        Registry::default().with(filter).with(layer).init();
    } else {
        let layer = fmt::layer()
            .with_target(true)
            .with_thread_ids(false)
            .with_file(true)
            .with_line_number(true)
            .with_level(true);

        Registry::default().with(filter).with(layer).init();
    }
}
