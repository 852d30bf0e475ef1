// Logging module — powered by tracing-subscriber
//
// A compatibility bridge (`tracing_log::LogTracer`) captures the
// `log::*` macro calls from the library crates and routes them through
// the tracing subscriber.

use std::fs::{self, OpenOptions};
use std::path::Path;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Build the `EnvFilter` from the base level plus hardcoded
/// noisy-crate overrides.
fn build_env_filter(level: &str) -> anyhow::Result<EnvFilter> {
    let mut directives = vec![level.to_string()];

    // Suppress noisy third-party crates
    let noisy: &[(&str, &str)] = &[
        ("hyper", "warn"),
        ("hyper_util", "warn"),
        ("reqwest", "warn"),
        ("h2", "warn"),
        ("rustls", "warn"),
        ("tracing", "warn"),
    ];
    for (target, lvl) in noisy {
        directives.push(format!("{}={}", target, lvl));
    }

    let filter_str = directives.join(",");
    EnvFilter::try_new(&filter_str)
        .map_err(|e| anyhow::anyhow!("Invalid tracing filter '{}': {}", filter_str, e))
}

/// Initialize logging: an optional colored console layer plus a
/// compact text file layer, with the `log`-crate bridge installed.
pub fn init_logging(level: &str, file_path: &Path, log_to_console: bool) -> anyhow::Result<()> {
    if let Some(parent) = file_path.parent() {
        fs::create_dir_all(parent)?;
    }
    let log_file = OpenOptions::new().create(true).append(true).open(file_path)?;

    // Bridge `log` crate → tracing; ok() in case already initialized
    tracing_log::LogTracer::init().ok();

    let console_layer = if log_to_console {
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(true)
                .with_target(false)
                .with_filter(build_env_filter(level)?),
        )
    } else {
        None
    };

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(log_file)
        .with_target(true)
        .with_filter(build_env_filter(level)?);

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::trace!(
        "Logging initialized: level={}, console={}, file={}",
        level,
        log_to_console,
        file_path.display()
    );

    Ok(())
}
