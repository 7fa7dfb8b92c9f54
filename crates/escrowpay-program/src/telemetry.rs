//! Structured logging initialisation.
//!
//! Two output formats:
//! - [`LogFormat::Human`]: readable lines for local development
//! - [`LogFormat::Json`]: newline-delimited JSON for log pipelines
//!
//! `RUST_LOG` overrides the caller-supplied `level` when set.

use escrowpay_types::{EscrowError, Result};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Output format for structured logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = EscrowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(Self::Human),
            "json" => Ok(Self::Json),
            other => Err(EscrowError::Configuration(format!(
                "unknown log format '{other}'"
            ))),
        }
    }
}

/// Install the global tracing subscriber.
///
/// # Errors
/// `Configuration` if `level` is not a valid filter directive or a global
/// subscriber is already installed.
pub fn init_logging(format: LogFormat, level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level)
            .map_err(|e| EscrowError::Configuration(format!("log level '{level}': {e}")))?,
    };

    let installed = match format {
        LogFormat::Human => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .try_init(),
    };
    installed.map_err(|e| EscrowError::Configuration(format!("tracing subscriber: {e}")))
}
