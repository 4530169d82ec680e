//! Log output for the mavcam binaries.
//!
//! `RUST_LOG` always wins. Without it, workspace crates log at the configured
//! level and the `mavlink` codec is held at `warn`, since it reports every
//! undecodable byte on a noisy serial line.
//!
//! ```ignore
//! use mavcam_core::tracing::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::debug())?;
//! ```

use thiserror::Error;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const WORKSPACE_TARGETS: &[&str] = &[
    "mavcam",
    "mavcam_cli",
    "mavcam_bridge",
    "mavcam_protocol",
    "mavcam_core",
];

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("failed to set global tracing subscriber: {0}")]
    SetGlobalSubscriber(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("failed to parse env filter: {0}")]
    EnvFilter(#[from] tracing_subscriber::filter::ParseError),
}

/// Line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TracingOutputFormat {
    /// Multi-line, for a terminal.
    #[default]
    Pretty,
    Compact,
    /// JSON lines, for journald or a log shipper on the companion computer.
    Json,
}

/// How the subscriber is built.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub default_level: Level,
    pub output_format: TracingOutputFormat,
    /// Adds source location and thread names. The thread name tells the
    /// `mavlink-rx` receive thread apart from the runtime workers.
    pub verbose: bool,
    /// Explicit filter directive; replaces both `RUST_LOG` and the default.
    pub env_filter: Option<String>,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: Level::INFO,
            output_format: TracingOutputFormat::Pretty,
            verbose: false,
            env_filter: None,
        }
    }
}

impl TracingConfig {
    /// `--debug` on a bench: compact lines with locations and thread names.
    #[must_use]
    pub fn debug() -> Self {
        Self {
            default_level: Level::DEBUG,
            output_format: TracingOutputFormat::Compact,
            verbose: true,
            env_filter: None,
        }
    }

    /// Running as a supervised service.
    #[must_use]
    pub fn service() -> Self {
        Self {
            output_format: TracingOutputFormat::Json,
            verbose: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_level(mut self, level: Level) -> Self {
        self.default_level = level;
        self
    }

    #[must_use]
    pub fn with_format(mut self, format: TracingOutputFormat) -> Self {
        self.output_format = format;
        self
    }

    #[must_use]
    pub fn with_env_filter(mut self, filter: impl Into<String>) -> Self {
        self.env_filter = Some(filter.into());
        self
    }

    fn filter(&self) -> Result<EnvFilter, TracingError> {
        match self.env_filter {
            Some(ref directive) => Ok(EnvFilter::try_new(directive)?),
            None => Ok(EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_directive(self.default_level)))),
        }
    }
}

/// Filter used when neither `RUST_LOG` nor an explicit directive is given.
pub fn default_directive(level: Level) -> String {
    WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(std::iter::once("mavlink=warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Installs the global subscriber. Call once at process start.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the directive is invalid.
pub fn init_tracing(config: TracingConfig) -> Result<(), TracingError> {
    let filter = config.filter()?;
    let verbose = config.verbose;

    let layer = fmt::layer()
        .with_file(verbose)
        .with_line_number(verbose)
        .with_thread_names(verbose);

    let layer = match config.output_format {
        TracingOutputFormat::Pretty => layer.pretty().boxed(),
        TracingOutputFormat::Compact => layer.compact().boxed(),
        TracingOutputFormat::Json => layer.json().boxed(),
    };

    tracing::subscriber::set_global_default(tracing_subscriber::registry().with(filter).with(layer))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles() {
        let default = TracingConfig::default();
        assert_eq!(default.default_level, Level::INFO);
        assert_eq!(default.output_format, TracingOutputFormat::Pretty);
        assert!(!default.verbose);

        let debug = TracingConfig::debug();
        assert_eq!(debug.default_level, Level::DEBUG);
        assert_eq!(debug.output_format, TracingOutputFormat::Compact);
        assert!(debug.verbose);

        let service = TracingConfig::service();
        assert_eq!(service.default_level, Level::INFO);
        assert_eq!(service.output_format, TracingOutputFormat::Json);
    }

    #[test]
    fn builder_overrides() {
        let config = TracingConfig::service()
            .with_level(Level::DEBUG)
            .with_format(TracingOutputFormat::Compact)
            .with_env_filter("mavcam_bridge=trace");

        assert_eq!(config.default_level, Level::DEBUG);
        assert_eq!(config.output_format, TracingOutputFormat::Compact);
        assert_eq!(config.env_filter.as_deref(), Some("mavcam_bridge=trace"));
    }

    #[test]
    fn explicit_filter_must_parse() {
        let config = TracingConfig::default().with_env_filter("mavcam_bridge=loud");
        assert!(matches!(config.filter(), Err(TracingError::EnvFilter(_))));
    }

    #[test]
    fn default_directive_covers_workspace_and_quiets_codec() {
        let directive = default_directive(Level::DEBUG);
        assert!(directive.contains("mavcam_bridge=DEBUG"));
        assert!(directive.contains("mavcam=DEBUG"));
        assert!(directive.ends_with("mavlink=warn"));
        assert!(EnvFilter::try_new(&directive).is_ok());
    }
}
