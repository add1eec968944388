//! Subscriber setup for the engine's `tracing` output.
//!
//! The engine itself only emits events and spans; nothing is printed until
//! the application installs a subscriber. This helper installs a
//! `tracing-subscriber` registry for applications that have none of their
//! own.
//!
//! What the engine emits:
//! - `info`: machine initialization, committed state changes (via [`TracingObserver`])
//! - `debug`: discarded events, snapshots, dispatcher lifecycle
//! - `trace`: every exit, entry, guard rejection and queue push
//! - `warn`: callback failures
//!
//! Every processed event runs inside a `process_event` span carrying the
//! machine name and the event name.
//!
//! # Environment Variables
//!
//! - `HSM_LOG_LEVEL`: filter directive used when no level is passed
//! - `HSM_LOG_FORMAT`: `compact`, `pretty` or `json`
//! - `RUST_LOG`: standard `EnvFilter` directives; wins over the level
//!
//! ```bash
//! RUST_LOG="info,hsmcore::engine=trace" my-controller
//! ```
//!
//! [`TracingObserver`]: crate::engine::TracingObserver

use std::str::FromStr;
use thiserror::Error;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Registry,
};

const LEVEL_VAR: &str = "HSM_LOG_LEVEL";
const FORMAT_VAR: &str = "HSM_LOG_FORMAT";

/// Output format of the installed subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Single line per event
    #[default]
    Compact,
    /// Multi-line with source locations
    Pretty,
    /// One JSON object per event
    Json,
}

impl LogFormat {
    pub fn variants() -> &'static [&'static str] {
        &["compact", "pretty", "json"]
    }
}

impl FromStr for LogFormat {
    type Err = LoggingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(LoggingError::UnknownFormat(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Unknown log format '{0}', expected one of compact, pretty, json")]
    UnknownFormat(String),

    #[error("Failed to install subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Install a global subscriber.
///
/// `level` falls back to `HSM_LOG_LEVEL`, then `info`; `RUST_LOG` overrides
/// both when set. `format` falls back to `HSM_LOG_FORMAT`, then compact.
/// Fails if the format is unknown or a global subscriber already exists.
pub fn init_logging(level: Option<&str>, format: Option<&str>) -> Result<(), LoggingError> {
    let level = level
        .map(str::to_string)
        .or_else(|| std::env::var(LEVEL_VAR).ok())
        .unwrap_or_else(|| "info".to_string());
    let format = match format
        .map(str::to_string)
        .or_else(|| std::env::var(FORMAT_VAR).ok())
    {
        Some(name) => name.parse()?,
        None => LogFormat::default(),
    };

    let filter = build_filter(&level);
    let registry = Registry::default().with(filter);
    match format {
        LogFormat::Compact => registry
            .with(
                fmt::Layer::default()
                    .compact()
                    .with_target(false)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::NONE),
            )
            .try_init()?,
        LogFormat::Pretty => registry
            .with(
                fmt::Layer::default()
                    .pretty()
                    .with_file(true)
                    .with_line_number(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                fmt::Layer::default()
                    .json()
                    .with_current_span(true)
                    .with_thread_names(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?,
    }
    Ok(())
}

/// Install the default subscriber (info level, compact).
pub fn init_default_logging() -> Result<(), LoggingError> {
    init_logging(None, None)
}

fn build_filter(level: &str) -> EnvFilter {
    if level == "off" {
        return EnvFilter::new("off");
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parsing_ignores_case() {
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert_eq!("Pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
    }

    #[test]
    fn unknown_format_is_an_error() {
        let err = "xml".parse::<LogFormat>().unwrap_err();
        assert!(err.to_string().contains("'xml'"));
    }

    #[test]
    fn every_variant_name_parses() {
        for name in LogFormat::variants() {
            assert!(name.parse::<LogFormat>().is_ok());
        }
    }

    #[test]
    fn bad_format_fails_before_installing() {
        assert!(matches!(
            init_logging(Some("debug"), Some("yaml")),
            Err(LoggingError::UnknownFormat(_))
        ));
    }
}
