//! Fetch pipeline error types.

use thiserror::Error;

/// Result type for fetch operations.
pub type FetchResult<T> = Result<T, FetchError>;

/// What went wrong during a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferErrorKind {
    /// Could not reach the server.
    Connect,
    /// Server answered with a non-success status.
    Status(u16),
    /// The configured timeout elapsed.
    Timeout,
    /// The response body could not be read.
    Body,
}

impl std::fmt::Display for TransferErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Status(code) => write!(f, "HTTP {code}"),
            Self::Timeout => write!(f, "timeout"),
            Self::Body => write!(f, "body"),
        }
    }
}

/// Fetch error variants.
///
/// All of them travel through the delivery callback; none cross a task
/// boundary as a panic.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[allow(missing_docs)]
pub enum FetchError {
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("transfer failed ({kind}): {message}")]
    Transfer {
        kind: TransferErrorKind,
        message: String,
    },

    #[error("decode failed: {message}")]
    Decode { message: String },

    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates invalid request error.
    #[must_use]
    pub fn invalid_request(reason: impl Into<String>) -> Self {
        Self::InvalidRequest {
            reason: reason.into(),
        }
    }

    /// Creates transfer error.
    #[must_use]
    pub fn transfer(kind: TransferErrorKind, message: impl Into<String>) -> Self {
        Self::Transfer {
            kind,
            message: message.into(),
        }
    }

    /// Creates decode error.
    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Returns whether the fetch was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns whether the error should be surfaced to the user.
    ///
    /// Cancellation only means the slot moved on.
    #[must_use]
    pub const fn is_user_visible(&self) -> bool {
        !self.is_cancelled()
    }

    /// Returns whether the error came from the transport timing out.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::Transfer {
                kind: TransferErrorKind::Timeout,
                ..
            }
        )
    }
}
