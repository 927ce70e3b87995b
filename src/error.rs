//! Typed failures for remote fetches and local cache access.

/// Message shown when the backend gives no reason for a failure.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Failed to load segment efforts";

/// Failure of a remote effort fetch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
  /// 401 with a reauthentication hint; the session has to be renewed.
  #[error("Session expired: {}", .message.as_deref().unwrap_or("reauthentication required"))]
  SessionExpired { message: Option<String> },

  /// 429 from the backend.
  #[error("{}", .message.as_deref().unwrap_or(DEFAULT_FAILURE_MESSAGE))]
  RateLimited { message: Option<String> },

  /// Any other non-2xx status, transport or decode failure.
  #[error("{}", .message.as_deref().unwrap_or(DEFAULT_FAILURE_MESSAGE))]
  Remote {
    status: Option<u16>,
    message: Option<String>,
  },
}

impl FetchError {
  pub fn remote(status: Option<u16>, message: Option<String>) -> Self {
    FetchError::Remote { status, message }
  }

  /// Classify an error response from its status and decoded body.
  pub fn from_response(status: u16, message: Option<String>, needs_reauth: bool) -> Self {
    match status {
      401 if needs_reauth => FetchError::SessionExpired { message },
      429 => FetchError::RateLimited { message },
      _ => FetchError::remote(Some(status), message),
    }
  }

  /// HTTP status associated with the failure, when there was a response.
  pub fn status(&self) -> Option<u16> {
    match self {
      FetchError::SessionExpired { .. } => Some(401),
      FetchError::RateLimited { .. } => Some(429),
      FetchError::Remote { status, .. } => *status,
    }
  }
}

/// Failure of the local cache; always recovered as a miss or a no-op.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
  /// Stored value is malformed, or the storage refused the read.
  #[error("Cached record {key} is unreadable: {reason}")]
  ReadCorrupt { key: String, reason: String },

  /// Serialization failed or the storage refused the write.
  #[error("Could not write cached record {key}: {reason}")]
  WriteFailure { key: String, reason: String },
}
