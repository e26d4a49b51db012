//! Telemetry failures.

use prometheus::Error as PrometheusError;
use thiserror::Error;

/// Result alias for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Failures while installing logging or maintaining the metrics registry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A global subscriber was already installed.
    #[error("tracing subscriber already installed")]
    SubscriberInstall {
        /// Cause.
        source: tracing_subscriber::util::TryInitError,
    },
    /// A log format name was not recognised.
    #[error("unknown log format")]
    UnknownLogFormat {
        /// Rejected name.
        value: String,
    },
    /// A metric family could not be constructed.
    #[error("metric construction failed")]
    MetricsCollector {
        /// Metric family name.
        name: &'static str,
        /// Cause.
        source: PrometheusError,
    },
    /// A metric family could not be added to the registry.
    #[error("metric registration failed")]
    MetricsRegister {
        /// Metric family name.
        name: &'static str,
        /// Cause.
        source: PrometheusError,
    },
    /// The exposition text could not be produced.
    #[error("metric rendering failed")]
    MetricsEncode {
        /// Cause.
        source: PrometheusError,
    },
    /// The encoder produced bytes that are not UTF-8.
    #[error("rendered metrics not utf-8")]
    MetricsUtf8 {
        /// Cause.
        source: std::string::FromUtf8Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn registry_failures_name_the_metric() {
        let err = TelemetryError::MetricsRegister {
            name: "torrents_added_total",
            source: PrometheusError::AlreadyReg,
        };
        assert_eq!(err.to_string(), "metric registration failed");
        assert!(err.source().is_some());
        assert!(format!("{err:?}").contains("torrents_added_total"));
    }

    #[test]
    fn unknown_format_has_no_source() {
        let err = TelemetryError::UnknownLogFormat {
            value: "yaml".into(),
        };
        assert_eq!(err.to_string(), "unknown log format");
        assert!(err.source().is_none());
    }
}
