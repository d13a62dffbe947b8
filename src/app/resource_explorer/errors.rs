//! Error taxonomy for Azure management and directory API calls.
//!
//! Fetch errors ([`DashError`]) propagate to the caller unchanged. Deletion
//! failures are classified into [`DeleteError`] after the API-version retry
//! loop gives up. Directory lookups never produce an error at all; they
//! degrade to [`super::principals::PrincipalResolution::Unavailable`].

use serde::Deserialize;
use thiserror::Error;

/// Structured failure reported by the management or directory API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: u16,
    pub status_text: String,
    /// `error.code` from the response body, when present
    pub code: Option<String>,
    /// `error.message` from the response body, when present
    pub message: Option<String>,
}

/// Wire shape `{ "error": { "code": ..., "message": ... } }`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

impl ApiError {
    /// Build from a status code and the raw response body.
    ///
    /// The body is parsed leniently: anything that isn't the standard error
    /// envelope just leaves `code` and `message` empty.
    pub fn from_response(status: reqwest::StatusCode, body: &str) -> Self {
        let (code, message) = match serde_json::from_str::<ErrorEnvelope>(body) {
            Ok(ErrorEnvelope {
                error: Some(ErrorBody { code, message }),
            }) => (code, message),
            _ => (None, None),
        };

        Self {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            code,
            message,
        }
    }

    pub fn is_unauthenticated(&self) -> bool {
        self.status == 401
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    /// Best available description of the failure
    pub fn detail(&self) -> &str {
        self.message
            .as_deref()
            .or(self.code.as_deref())
            .unwrap_or(&self.status_text)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "HTTP {} {}", self.status, self.status_text)?;
        if let Some(message) = &self.message {
            write!(f, ": {}", message)?;
        }
        Ok(())
    }
}

/// Errors surfaced by the fetch side of the client.
#[derive(Debug, Error)]
pub enum DashError {
    /// Credential could not be obtained from the authentication provider
    #[error("failed to acquire access token: {0}")]
    Token(String),

    /// Request never produced an HTTP response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("request to {url} failed with {error}")]
    Api { url: String, error: ApiError },

    /// Response body did not match the expected envelope
    #[error("unexpected response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl DashError {
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            DashError::Api { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Message suitable for display, with a remediation hint for
    /// authorization failures
    pub fn user_message(&self) -> String {
        match self {
            DashError::Token(message) => {
                format!("Sign-in required: {}", message)
            }
            DashError::Transport { .. } => "Network error, check connectivity and retry".to_string(),
            DashError::Api { error, .. } if error.is_unauthenticated() => {
                format!("{} (session expired, sign in again)", error)
            }
            DashError::Api { error, .. } if error.is_forbidden() => {
                format!("{} (ask an administrator to grant the Reader role)", error)
            }
            DashError::Api { error, .. } => error.to_string(),
            DashError::Decode { message, .. } => format!("Unexpected response: {}", message),
        }
    }

    /// Short label for compact display
    pub fn short_label(&self) -> &'static str {
        match self {
            DashError::Token(_) => "auth",
            DashError::Transport { .. } => "network",
            DashError::Api { error, .. } if error.is_unauthenticated() || error.is_forbidden() => {
                "denied"
            }
            DashError::Api { .. } => "http",
            DashError::Decode { .. } => "decode",
        }
    }
}

/// Terminal classification of a failed resource deletion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeleteError {
    #[error("permission denied deleting {resource_id}: {message}")]
    PermissionDenied {
        resource_id: String,
        status: u16,
        message: String,
    },

    #[error("{resource_id} is locked: {message}")]
    Locked { resource_id: String, message: String },

    #[error("{resource_id} was not found: {message}")]
    NotFound { resource_id: String, message: String },

    #[error("no supported API version for {resource_type} (tried {})", .tried.join(", "))]
    VersionIncompatible {
        resource_id: String,
        resource_type: String,
        tried: Vec<String>,
    },

    #[error("failed to delete {resource_id}: {message}")]
    Failed { resource_id: String, message: String },
}

impl DeleteError {
    pub fn user_message(&self) -> String {
        match self {
            DeleteError::PermissionDenied { status: 401, .. } => {
                "Your session has expired. Sign in again and retry the deletion.".to_string()
            }
            DeleteError::PermissionDenied { .. } => {
                "You do not have permission to delete this resource. Owner or Contributor role is required.".to_string()
            }
            DeleteError::Locked { .. } => {
                "The resource is locked or in a conflicting state. Remove the lock and retry.".to_string()
            }
            DeleteError::NotFound { .. } => {
                "The resource no longer exists. Refresh the resource list.".to_string()
            }
            DeleteError::VersionIncompatible { resource_type, .. } => format!(
                "None of the known API versions can delete resources of type {}.",
                resource_type
            ),
            DeleteError::Failed { message, .. } => format!("Deletion failed: {}", message),
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            DeleteError::PermissionDenied { .. } => "denied",
            DeleteError::Locked { .. } => "locked",
            DeleteError::NotFound { .. } => "not-found",
            DeleteError::VersionIncompatible { .. } => "api-version",
            DeleteError::Failed { .. } => "error",
        }
    }
}
