//! Error types for the market-history client.

use std::time::Duration;

use crate::domain::envelope::PayloadError;
use crate::domain::query::ValidationError;
use crate::domain::time::TimeError;

/// Failures raised by a transport adapter.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The configured address is not a valid URI.
    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint {
        /// Address as configured.
        endpoint: String,
        /// Parser message.
        message: String,
    },

    /// Channel could not be established.
    #[error("connection failed: {0}")]
    Connect(#[from] tonic::transport::Error),

    /// Server answered with a non-OK status.
    #[error("gRPC status {}: {}", .0.code(), .0.message())]
    Status(#[from] tonic::Status),

    /// The call did not finish before its deadline.
    #[error("deadline of {timeout:?} exceeded")]
    DeadlineExceeded {
        /// Deadline that elapsed.
        timeout: Duration,
    },

    /// The caller's cancellation token fired.
    #[error("call cancelled")]
    Cancelled,
}

impl TransportError {
    /// Whether the failure was a timeout, local or reported by the server.
    #[must_use]
    pub fn is_deadline_exceeded(&self) -> bool {
        match self {
            Self::DeadlineExceeded { .. } => true,
            Self::Status(status) => status.code() == tonic::Code::DeadlineExceeded,
            _ => false,
        }
    }
}

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Rejected before any network call.
    InvalidArgument,
    /// Channel, status, deadline or cancellation failure.
    Transport,
    /// JSON could not be produced or parsed.
    Decode,
    /// JSON parsed but had the wrong shape.
    Schema,
}

impl ErrorKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::Transport => "transport",
            Self::Decode => "decode",
            Self::Schema => "schema",
        }
    }
}

/// Error returned by every client operation.
#[derive(Debug, thiserror::Error)]
pub enum MarketQueryError {
    /// A precondition failed; nothing was sent.
    #[error("invalid argument: {0}")]
    InvalidArgument(#[from] ValidationError),

    /// Request parameters could not be serialized.
    #[error("failed to encode request payload: {0}")]
    Encode(#[source] serde_json::Error),

    /// The transport call failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response payload is not valid JSON.
    #[error("failed to decode JSON from server response: {0}")]
    Decode(#[source] serde_json::Error),

    /// Response JSON is not an object with `data`.
    #[error("invalid response format: {reason}")]
    Schema {
        /// What was wrong with the document.
        reason: String,
    },

    /// Result rows did not match the requested row shape.
    #[error("failed to decode {row} rows: {source}")]
    RowDecode {
        /// Row shape name.
        row: &'static str,
        /// Underlying serde failure.
        #[source]
        source: serde_json::Error,
    },
}

impl MarketQueryError {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Encode(_) | Self::Decode(_) | Self::RowDecode { .. } => ErrorKind::Decode,
            Self::Schema { .. } => ErrorKind::Schema,
        }
    }
}

impl From<TimeError> for MarketQueryError {
    fn from(error: TimeError) -> Self {
        Self::InvalidArgument(ValidationError::InvalidTime(error))
    }
}

impl From<PayloadError> for MarketQueryError {
    fn from(error: PayloadError) -> Self {
        match error {
            PayloadError::Decode(source) => Self::Decode(source),
            PayloadError::Schema { reason } => Self::Schema { reason },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::query::RequiredField;

    #[test]
    fn kinds_follow_variants() {
        let invalid: MarketQueryError = ValidationError::EmptyField(RequiredField::Symbol).into();
        assert_eq!(invalid.kind(), ErrorKind::InvalidArgument);
        assert_eq!(invalid.to_string(), "invalid argument: symbol cannot be empty");

        let time: MarketQueryError = TimeError::Empty.into();
        assert_eq!(time.kind(), ErrorKind::InvalidArgument);

        let transport: MarketQueryError = TransportError::Cancelled.into();
        assert_eq!(transport.kind(), ErrorKind::Transport);

        let schema: MarketQueryError = PayloadError::Schema {
            reason: "missing 'data' key".into(),
        }
        .into();
        assert_eq!(schema.kind(), ErrorKind::Schema);
    }

    #[test]
    fn server_deadline_status_counts_as_deadline() {
        let err = TransportError::from(tonic::Status::deadline_exceeded("slow"));
        assert!(err.is_deadline_exceeded());
        assert!(!TransportError::Cancelled.is_deadline_exceeded());
    }
}
