//! Logging setup for embeddings and the CLI.
//!
//! The library itself only emits `tracing` events; nothing is printed until
//! the embedding installs a subscriber, either its own or the one below.

use std::sync::Once;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::VisualFeatures;

static INIT: Once = Once::new();

/// Level used when `RUST_LOG` is unset
pub const DEFAULT_DIRECTIVE: &str = "warn";

/// Level used when `RUST_LOG` is unset and developer mode is on
pub const DEVELOPER_DIRECTIVE: &str = "debug";

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One JSON object per event
    Json,
    /// Multi-line, human readable
    #[default]
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Fallback filter directive for the given features
pub fn default_directive(features: &VisualFeatures) -> &'static str {
    if features.developer_mode {
        DEVELOPER_DIRECTIVE
    } else {
        DEFAULT_DIRECTIVE
    }
}

/// Install a global subscriber writing to stderr.
///
/// `RUST_LOG` wins over `default_directive` when set. Only the first call
/// has any effect.
pub fn init_logging(format: LogFormat, default_directive: &str) {
    INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive));
        let registry = tracing_subscriber::registry().with(env_filter);

        // A subscriber may already be installed by the embedding
        let installed = match format {
            LogFormat::Json => registry
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Pretty => registry
                .with(fmt::layer().pretty().with_writer(std::io::stderr))
                .try_init(),
            LogFormat::Compact => registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init(),
        };
        if installed.is_err() {
            tracing::debug!("Global subscriber already set; keeping it");
        }
    });
}
