//! Error types for the Jamf Pro client.
//!
//! # Design
//! One enum covers every failure a public operation can report. Non-2xx
//! responses land in `Http` with the raw status and body, since the upstream
//! API guarantees no structured error schema. Transport failures keep their
//! original error as the source so callers can downcast.

use thiserror::Error;

use crate::http::HttpMethod;

/// Boxed error produced by a `Transport`.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors returned by `JamfClient` and the resource services.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required argument was unusable; no request was sent.
    #[error("invalid argument {arg}: {reason}")]
    InvalidArgument { arg: &'static str, reason: String },

    /// Connection, timeout or protocol failure below HTTP.
    #[error("transport failure: {0}")]
    Transport(#[source] BoxError),

    /// The client's cancel token fired before or during the call.
    #[error("operation cancelled")]
    Cancelled,

    /// The server answered with a status outside 200-299.
    #[error("{method} {url}: {status} {body}")]
    Http {
        method: HttpMethod,
        url: String,
        status: u16,
        body: String,
    },

    /// The request payload could not be encoded.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be decoded into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The identity endpoint answered but yielded no usable bearer token.
    #[error("credential unavailable: {0}")]
    CredentialUnavailable(String),

    /// A lookup by name found nothing in the listing.
    #[error("resource not found: {0}")]
    NotFound(String),

    /// Reads kept observing the resource after it was deleted.
    #[error("failed to confirm deletion of {id} after {attempts} attempts")]
    DeletionNotConfirmed { id: String, attempts: u32 },

    /// Reads never reflected a create or update within the attempt budget.
    #[error("failed to observe write to {id} after {attempts} attempts")]
    ReconciliationExhausted { id: String, attempts: u32 },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    pub(crate) fn invalid_argument(arg: &'static str, reason: impl Into<String>) -> Self {
        ApiError::InvalidArgument { arg, reason: reason.into() }
    }

    /// HTTP status carried by an `Http` error.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_display_names_request_and_body() {
        let err = ApiError::Http {
            method: HttpMethod::Put,
            url: "https://example.jamfcloud.com/JSSResource/computers/id/7".to_string(),
            status: 409,
            body: "Conflict".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "PUT https://example.jamfcloud.com/JSSResource/computers/id/7: 409 Conflict"
        );
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_not_found());
    }

    #[test]
    fn deletion_error_names_id_and_attempts() {
        let err = ApiError::DeletionNotConfirmed { id: "42".to_string(), attempts: 5 };
        assert_eq!(err.to_string(), "failed to confirm deletion of 42 after 5 attempts");
    }

    #[test]
    fn non_http_errors_carry_no_status() {
        assert_eq!(ApiError::Cancelled.status(), None);
        assert!(!ApiError::NotFound("x".to_string()).is_not_found());
    }
}
