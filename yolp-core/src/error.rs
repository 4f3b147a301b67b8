//! Error types for Yolp client operations

use thiserror::Error;

/// Client-side form validation errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{field} is required")]
    RequiredFieldMissing { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        Self::RequiredFieldMissing {
            field: field.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the gateway, the cache and the UI-gating primitives.
///
/// Cloneable so a failed fetch can be stored on a cache entry and handed to
/// every reader of that entry.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClientError {
    /// Transport failure, no response was received.
    #[error("Network error: {reason}")]
    Network { reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A second confirmation was requested while one is still outstanding.
    #[error("Confirmation already pending")]
    ConfirmationConflict,

    /// The response body did not have the expected shape.
    #[error("Unexpected response body: {reason}")]
    Decode { reason: String },

    /// The request was abandoned before producing a result.
    #[error("Request aborted: {reason}")]
    Aborted { reason: String },
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    pub fn network(reason: impl Into<String>) -> Self {
        Self::Network {
            reason: reason.into(),
        }
    }

    pub fn aborted(reason: impl Into<String>) -> Self {
        Self::Aborted {
            reason: reason.into(),
        }
    }

    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// HTTP status of the failed request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self.status(), Some(401) | Some(403))
    }

    /// Text suitable for a user-facing notification.
    ///
    /// Server-provided messages win; validation errors describe themselves;
    /// everything else falls back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Http { message, .. } if !message.trim().is_empty() => message.clone(),
            Self::Validation(err) => capitalize(&err.to_string()),
            _ => fallback.to_string(),
        }
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_message() {
        let err = ClientError::http(409, "Restaurant already exists");
        assert_eq!(
            err.user_message("Error adding restaurant"),
            "Restaurant already exists"
        );

        let blank = ClientError::http(500, "  ");
        assert_eq!(blank.user_message("Error adding restaurant"), "Error adding restaurant");

        let network = ClientError::network("connection refused");
        assert_eq!(network.user_message("Error adding restaurant"), "Error adding restaurant");
    }

    #[test]
    fn test_validation_message() {
        let err = ClientError::from(ValidationError::required("name"));
        assert_eq!(err.to_string(), "name is required");
        assert_eq!(err.user_message("ignored"), "Name is required");
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[test]
    fn test_unauthorized_statuses() {
        assert!(ClientError::http(401, "").is_unauthorized());
        assert!(ClientError::http(403, "").is_unauthorized());
        assert!(!ClientError::http(404, "").is_unauthorized());
        assert!(!ClientError::network("down").is_unauthorized());
    }

    #[test]
    fn test_decode_from_serde() {
        let err = serde_json::from_str::<u64>("\"nope\"").unwrap_err();
        assert!(matches!(ClientError::from(err), ClientError::Decode { .. }));
    }
}
