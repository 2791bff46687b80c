//! Child log forwarding and process-wide logging configuration.
//!
//! A container child writes line-delimited JSON records over a dedicated
//! pipe; the parent decodes them and re-emits each through its own
//! logging subsystem. The pipe is long-lived, so a malformed record is
//! logged and skipped — it must never silence everything after it.

use std::io::{BufRead, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};

use cordon_common::error::{CordonError, Result};
use serde::Deserialize;

/// Severity of a forwarded log record.
///
/// A closed set: the child's `panic` and `fatal` tags clamp to [`Error`]
/// because a forwarded record must never be able to terminate the
/// receiving process, and anything unrecognized falls back to
/// [`Severity::FALLBACK`].
///
/// [`Error`]: Severity::Error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Error conditions (also `panic` and `fatal` inputs).
    Error,
    /// Warnings.
    Warn,
    /// Informational messages.
    Info,
    /// Debug messages.
    Debug,
    /// Trace messages.
    Trace,
}

impl Severity {
    /// Severity used for records whose tag is not recognized.
    pub const FALLBACK: Self = Self::Warn;

    /// Parses a severity tag; `None` for unrecognized input.
    #[must_use]
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "panic" | "fatal" | "error" => Some(Self::Error),
            "warning" | "warn" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }
}

/// Counters describing one forwarding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForwardSummary {
    /// Records successfully forwarded.
    pub forwarded: usize,
    /// Lines that failed to decode and were skipped.
    pub decode_errors: usize,
    /// Records forwarded at the fallback severity.
    pub level_fallbacks: usize,
}

#[derive(Deserialize)]
struct LogRecord {
    level: String,
    msg: String,
}

/// Forwards structured log records from a child pipe until end-of-stream.
///
/// Decode failures and unknown severities are recoverable: the former are
/// logged and skipped, the latter forwarded at the fallback severity.
/// Reaching end-of-stream is the clean, expected way for forwarding to
/// end.
pub fn forward_logs(reader: impl BufRead) -> ForwardSummary {
    forward_with(reader, |severity, msg| match severity {
        Severity::Error => tracing::error!("{msg}"),
        Severity::Warn => tracing::warn!("{msg}"),
        Severity::Info => tracing::info!("{msg}"),
        Severity::Debug => tracing::debug!("{msg}"),
        Severity::Trace => tracing::trace!("{msg}"),
    })
}

fn forward_with(reader: impl BufRead, mut sink: impl FnMut(Severity, &str)) -> ForwardSummary {
    let mut summary = ForwardSummary::default();

    for line in reader.lines() {
        let line = match line {
            Ok(line) => line,
            // Invalid UTF-8 surfaces here after the offending bytes have
            // already been consumed from the pipe, so the next line is
            // still reachable.
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                tracing::error!(error = %e, "undecodable bytes in log pipe, skipping line");
                summary.decode_errors += 1;
                continue;
            }
            Err(e) => {
                tracing::error!(error = %e, "log pipe read error");
                return summary;
            }
        };

        let record: LogRecord = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(line = %line, error = %e, "failed to decode log record");
                summary.decode_errors += 1;
                continue;
            }
        };

        let severity = Severity::parse(&record.level).unwrap_or_else(|| {
            tracing::warn!(
                level = %record.level,
                "unknown log level, forwarding at fallback severity"
            );
            summary.level_fallbacks += 1;
            Severity::FALLBACK
        });
        sink(severity, &record.msg);
        summary.forwarded += 1;
    }

    tracing::debug!("log pipe closed");
    summary
}

/// Output format for the logging subsystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line output.
    #[default]
    Text,
    /// One JSON object per record.
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CordonError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(CordonError::InvalidArgument {
                message: format!("unknown log format {other:?}"),
            }),
        }
    }
}

/// Process-wide logging configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogConfig {
    /// Lower the level floor to debug.
    pub debug: bool,
    /// Output format.
    pub format: LogFormat,
}

static LOGGING_CONFIGURED: AtomicBool = AtomicBool::new(false);

/// Initializes the process-wide logging subsystem exactly once.
///
/// Repeated calls are no-ops, not errors; the first caller owns the
/// configuration.
///
/// # Errors
///
/// Currently infallible; the `Result` keeps the contract open for
/// destinations that can fail to open.
pub fn configure_logging(config: &LogConfig) -> Result<()> {
    if LOGGING_CONFIGURED.swap(true, Ordering::SeqCst) {
        tracing::debug!("logging already configured");
        return Ok(());
    }

    let filter = if config.debug {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::from_default_env()
    };
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    let outcome = match config.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    if let Err(e) = outcome {
        tracing::debug!(error = %e, "logging subscriber was already installed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn forward_collecting(input: &str) -> (Vec<(Severity, String)>, ForwardSummary) {
        let mut seen = Vec::new();
        let summary = forward_with(Cursor::new(input.to_string()), |severity, msg| {
            seen.push((severity, msg.to_string()));
        });
        (seen, summary)
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let input = "{\"level\":\"info\",\"msg\":\"kitten\"}\n\
                     not-json\n\
                     {\"level\":\"info\",\"msg\":\"puppy\"}\n";
        let (seen, summary) = forward_collecting(input);
        assert_eq!(
            seen,
            [
                (Severity::Info, "kitten".to_string()),
                (Severity::Info, "puppy".to_string())
            ]
        );
        assert_eq!(summary.forwarded, 2);
        assert_eq!(summary.decode_errors, 1);
        assert_eq!(summary.level_fallbacks, 0);
    }

    #[test]
    fn non_utf8_line_is_skipped_not_fatal() {
        let mut input = b"{\"level\":\"info\",\"msg\":\"kitten\"}\n".to_vec();
        input.extend_from_slice(&[0xff, 0xfe, 0xfd, b'\n']);
        input.extend_from_slice(b"{\"level\":\"info\",\"msg\":\"puppy\"}\n");

        let mut seen = Vec::new();
        let summary = forward_with(Cursor::new(input), |severity, msg| {
            seen.push((severity, msg.to_string()));
        });
        assert_eq!(
            seen,
            [
                (Severity::Info, "kitten".to_string()),
                (Severity::Info, "puppy".to_string())
            ]
        );
        assert_eq!(summary.forwarded, 2);
        assert_eq!(summary.decode_errors, 1);
    }

    #[test]
    fn unknown_severity_forwards_at_fallback() {
        let (seen, summary) = forward_collecting("{\"level\":\"shouting\",\"msg\":\"loud\"}\n");
        assert_eq!(seen, [(Severity::FALLBACK, "loud".to_string())]);
        assert_eq!(summary.forwarded, 1);
        assert_eq!(summary.level_fallbacks, 1);
    }

    #[test]
    fn terminating_severities_clamp_to_error() {
        assert_eq!(Severity::parse("panic"), Some(Severity::Error));
        assert_eq!(Severity::parse("fatal"), Some(Severity::Error));
        assert_eq!(Severity::parse("error"), Some(Severity::Error));
    }

    #[test]
    fn end_of_stream_is_clean() {
        let (seen, summary) = forward_collecting("");
        assert!(seen.is_empty());
        assert_eq!(summary, ForwardSummary::default());
    }

    #[test]
    fn configure_logging_is_idempotent() {
        let config = LogConfig::default();
        configure_logging(&config).expect("first call");
        configure_logging(&config).expect("second call is a no-op");
    }

    #[test]
    fn log_format_parses_known_values_only() {
        assert_eq!("text".parse::<LogFormat>().expect("text"), LogFormat::Text);
        assert_eq!("json".parse::<LogFormat>().expect("json"), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }
}
