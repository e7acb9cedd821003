//! Normalized streaming events shared by every backend.

use std::fmt;
use std::pin::Pin;

use futures::Stream;

/// Why a stream ended in failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Unknown backend identifier; no network call was made.
    Configuration,
    /// The backend could not be reached (DNS, TCP, TLS).
    Connection,
    /// The backend answered with a non-success HTTP status.
    UpstreamStatus,
    /// An upstream data frame carried an explicit error field.
    UpstreamPayload,
    /// The response body became unreadable mid-stream.
    StreamRead,
    /// The backend stopped sending data for longer than the idle timeout.
    Timeout,
    /// The request was cancelled on the server side.
    Cancelled,
}

impl FailureKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration_error",
            Self::Connection => "connection_error",
            Self::UpstreamStatus => "upstream_status_error",
            Self::UpstreamPayload => "upstream_payload_error",
            Self::StreamRead => "stream_read_error",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of a normalized generation stream.
///
/// A well-formed stream is zero or more `Token`s followed by exactly one
/// terminal-class event (`Terminal` or `Failure`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NormalizedEvent {
    /// Incremental fragment of assistant output.
    Token(String),
    /// Generation finished normally.
    Terminal,
    /// Generation ended because of an error.
    Failure { kind: FailureKind, message: String },
}

impl NormalizedEvent {
    #[must_use]
    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failure {
            kind,
            message: message.into(),
        }
    }

    /// Returns `true` for `Terminal` and `Failure`.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal | Self::Failure { .. })
    }
}

/// Lazy, one-shot sequence of events produced for a single request.
pub type EventStream = Pin<Box<dyn Stream<Item = NormalizedEvent> + Send>>;
