//! Logging configuration using tracing.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// HTTP internals held at `warn` unless the node itself is quieter than that.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "h2"];

/// Initialize logging for the storage node.
///
/// A valid `RUST_LOG` replaces the configured level entirely. An unrecognized
/// level falls back to `info` and is reported once the subscriber is up.
pub fn init(level: &str) -> anyhow::Result<()> {
    let parsed = level.parse::<LevelFilter>().ok();
    let env = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(env.as_deref(), parsed.unwrap_or(LevelFilter::INFO));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;

    if parsed.is_none() {
        tracing::warn!(level, "Unrecognized log level, using info");
    }
    Ok(())
}

fn build_filter(env: Option<&str>, level: LevelFilter) -> EnvFilter {
    env.and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(directives(level)))
}

fn directives(level: LevelFilter) -> String {
    let mut out = level.to_string().to_ascii_lowercase();
    if level > LevelFilter::WARN {
        for target in QUIET_TARGETS {
            out.push_str(&format!(",{target}=warn"));
        }
    }
    out
}
