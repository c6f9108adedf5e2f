//! Request, response and error logging hooks.
//!
//! The default hooks emit `tracing` events; install custom ones on the
//! [`Logger`] to route them elsewhere.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::MalibuError;
use crate::request::{ContentType, Request, TransportRequest};
use crate::response::HttpResponse;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
/// Verbosity of the logging hooks.
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    None,
    Error,
    Info,
    Verbose,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogLevel::None => "none",
            LogLevel::Error => "error",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
        })
    }
}

impl FromStr for LogLevel {
    type Err = MalibuError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(LogLevel::None),
            "error" => Ok(LogLevel::Error),
            "info" => Ok(LogLevel::Info),
            "verbose" => Ok(LogLevel::Verbose),
            other => Err(MalibuError::Configuration(format!("unknown log level: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Hooks
// ---------------------------------------------------------------------------

/// Hook invoked with each sent request.
pub trait RequestLogging: Send + Sync {
    fn log_request(&self, level: LogLevel, request: &Request, sent: &TransportRequest);
}

/// Hook invoked with each received response.
pub trait ResponseLogging: Send + Sync {
    fn log_response(&self, level: LogLevel, response: &HttpResponse);
}

/// Hook invoked with each failed ride.
pub trait ErrorLogging: Send + Sync {
    fn log_error(&self, level: LogLevel, error: &MalibuError);
}

/// Request line at `info`; headers and body parameters at `debug` when the
/// level is [`LogLevel::Verbose`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogger;

impl RequestLogging for RequestLogger {
    fn log_request(&self, level: LogLevel, request: &Request, sent: &TransportRequest) {
        if level < LogLevel::Info {
            return;
        }
        tracing::info!(
            http_method = %request.method,
            url = %sent.url(),
            "Catching the wave"
        );

        if level < LogLevel::Verbose {
            return;
        }
        if !sent.headers().is_empty() {
            tracing::debug!(headers = ?sent.headers(), "Request headers");
        }
        if !request.message.parameters.is_empty() && request.content_type != ContentType::Query {
            let parameters = serde_json::Value::Object(request.message.parameters.clone());
            tracing::debug!(parameters = %parameters, "Request parameters");
        }
    }
}

/// Default response hook, emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseLogger;

impl ResponseLogging for ResponseLogger {
    fn log_response(&self, level: LogLevel, response: &HttpResponse) {
        if level < LogLevel::Info {
            return;
        }
        tracing::info!(http_status = response.status_code(), url = %response.url(), "Response");
    }
}

/// Default error hook, emitting `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorLogger;

impl ErrorLogging for ErrorLogger {
    fn log_error(&self, level: LogLevel, error: &MalibuError) {
        if level == LogLevel::None {
            return;
        }
        tracing::error!(error = %error, "Request failed");
    }
}

// ---------------------------------------------------------------------------
// Logger
// ---------------------------------------------------------------------------

/// Level plus the three hooks invoked by the engine after each execution.
#[derive(Clone)]
pub struct Logger {
    level: LogLevel,
    request_logger: Arc<dyn RequestLogging>,
    response_logger: Arc<dyn ResponseLogging>,
    error_logger: Arc<dyn ErrorLogging>,
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .finish_non_exhaustive()
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::None)
    }
}

impl Logger {
    /// Logger at `level` with the default `tracing` hooks.
    #[must_use]
    pub fn new(level: LogLevel) -> Self {
        Self {
            level,
            request_logger: Arc::new(RequestLogger),
            response_logger: Arc::new(ResponseLogger),
            error_logger: Arc::new(ErrorLogger),
        }
    }

    /// Replace the request hook.
    #[must_use]
    pub fn with_request_logger(mut self, logger: Arc<dyn RequestLogging>) -> Self {
        self.request_logger = logger;
        self
    }

    /// Replace the response hook.
    #[must_use]
    pub fn with_response_logger(mut self, logger: Arc<dyn ResponseLogging>) -> Self {
        self.response_logger = logger;
        self
    }

    /// Replace the error hook.
    #[must_use]
    pub fn with_error_logger(mut self, logger: Arc<dyn ErrorLogging>) -> Self {
        self.error_logger = logger;
        self
    }

    /// Configured log level.
    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Whether any hook fires, i.e. the level is not `None`.
    #[must_use]
    pub fn enabled(&self) -> bool {
        self.level != LogLevel::None
    }

    pub(crate) fn log_success(&self, request: &Request, sent: &TransportRequest, response: &HttpResponse) {
        if !self.enabled() {
            return;
        }
        self.request_logger.log_request(self.level, request, sent);
        self.response_logger.log_response(self.level, response);
    }

    pub(crate) fn log_error(&self, error: &MalibuError) {
        if !self.enabled() {
            return;
        }
        self.error_logger.log_error(self.level, error);
    }
}
