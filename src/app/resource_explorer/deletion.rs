//! Resource deletion with API-version probing.
//!
//! Resource providers each accept their own set of API versions, and the
//! listing endpoint does not say which. The orchestrator starts from the
//! version table's entry for the resource type and walks a fixed fallback list
//! whenever the provider rejects the version itself. Any other failure stops
//! immediately.

use serde::Serialize;
use tracing::{info, warn};

use super::api_versions::ApiVersionTable;
use super::arm_client::{ArmClient, DeleteResponse};
use super::errors::{ApiError, DeleteError};
use super::resource_id::resource_type_from_id;

/// Successful deletion
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DeleteOutcome {
    /// 200 or 204: the resource is gone
    Completed { api_version: String },
    /// 202: accepted, deletion continues asynchronously. No completion
    /// notification is tracked.
    Accepted { api_version: String },
}

impl DeleteOutcome {
    pub fn api_version(&self) -> &str {
        match self {
            DeleteOutcome::Completed { api_version } | DeleteOutcome::Accepted { api_version } => {
                api_version
            }
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, DeleteOutcome::Accepted { .. })
    }
}

/// Does this failure mean the API version is unsupported for the type?
pub fn is_api_version_error(error: &ApiError) -> bool {
    if error.status != 400 {
        return false;
    }
    let code_matches = error.code.as_deref().is_some_and(|code| {
        code.eq_ignore_ascii_case("InvalidApiVersionParameter")
            || code.eq_ignore_ascii_case("NoRegisteredProviderFound")
    });
    let message_matches = error.message.as_deref().is_some_and(|message| {
        let message = message.to_ascii_lowercase();
        message.contains("api version") || message.contains("api-version")
    });
    code_matches || message_matches
}

/// Last failure seen by the retry loop
enum LastFailure {
    Http(ApiError),
    Transport(String),
}

pub struct DeletionOrchestrator<'a> {
    client: &'a ArmClient,
    versions: &'a ApiVersionTable,
}

impl<'a> DeletionOrchestrator<'a> {
    pub fn new(client: &'a ArmClient, versions: &'a ApiVersionTable) -> Self {
        Self { client, versions }
    }

    pub async fn delete(&self, resource_id: &str) -> Result<DeleteOutcome, DeleteError> {
        let resource_type =
            resource_type_from_id(resource_id).unwrap_or_else(|| "unknown".to_string());
        let candidates = self.versions.candidate_versions(&resource_type);

        let mut tried = Vec::with_capacity(candidates.len());
        let mut last_failure = None;

        for api_version in candidates {
            tried.push(api_version.clone());

            let response = match self
                .client
                .delete_resource_version(resource_id, &api_version)
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    warn!("DELETE {} (api-version {}) failed: {}", resource_id, api_version, e);
                    last_failure = Some(LastFailure::Transport(e.to_string()));
                    break;
                }
            };

            match response {
                DeleteResponse { status: 202, .. } => {
                    info!("Deletion of {} accepted (api-version {})", resource_id, api_version);
                    return Ok(DeleteOutcome::Accepted { api_version });
                }
                DeleteResponse {
                    status: 200 | 204, ..
                } => {
                    info!("Deleted {} (api-version {})", resource_id, api_version);
                    return Ok(DeleteOutcome::Completed { api_version });
                }
                DeleteResponse { status, error } => {
                    let error = error.unwrap_or_else(|| ApiError {
                        status,
                        status_text: String::new(),
                        code: None,
                        message: None,
                    });
                    let retry = is_api_version_error(&error);
                    warn!(
                        "DELETE {} (api-version {}) rejected: {}{}",
                        resource_id,
                        api_version,
                        error,
                        if retry { ", trying next version" } else { "" }
                    );
                    last_failure = Some(LastFailure::Http(error));
                    if !retry {
                        break;
                    }
                }
            }
        }

        Err(classify_failure(resource_id, &resource_type, tried, last_failure))
    }
}

fn classify_failure(
    resource_id: &str,
    resource_type: &str,
    tried: Vec<String>,
    last_failure: Option<LastFailure>,
) -> DeleteError {
    let resource_id = resource_id.to_string();
    match last_failure {
        Some(LastFailure::Http(error)) => {
            let message = error.detail().to_string();
            match error.status {
                401 | 403 => DeleteError::PermissionDenied {
                    resource_id,
                    status: error.status,
                    message,
                },
                409 => DeleteError::Locked {
                    resource_id,
                    message,
                },
                404 => DeleteError::NotFound {
                    resource_id,
                    message,
                },
                _ if is_api_version_error(&error) => DeleteError::VersionIncompatible {
                    resource_id,
                    resource_type: resource_type.to_string(),
                    tried,
                },
                _ => DeleteError::Failed {
                    resource_id,
                    message,
                },
            }
        }
        Some(LastFailure::Transport(message)) => DeleteError::Failed {
            resource_id,
            message,
        },
        None => DeleteError::Failed {
            resource_id,
            message: "no API versions to try".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16, code: Option<&str>, message: Option<&str>) -> ApiError {
        ApiError {
            status,
            status_text: String::new(),
            code: code.map(str::to_string),
            message: message.map(str::to_string),
        }
    }

    #[test]
    fn test_api_version_error_detection() {
        assert!(is_api_version_error(&api_error(
            400,
            Some("NoRegisteredProviderFound"),
            Some("No registered resource provider found for location 'westeurope' and API version '2023-03-01'")
        )));
        assert!(is_api_version_error(&api_error(
            400,
            None,
            Some("The api-version '2019-10-01' is invalid.")
        )));
        assert!(!is_api_version_error(&api_error(400, Some("BadRequest"), Some("Invalid name"))));
        assert!(!is_api_version_error(&api_error(
            409,
            None,
            Some("API version conflict")
        )));
    }

    #[test]
    fn test_classification_by_status() {
        let classify = |status| {
            classify_failure(
                "/x",
                "Microsoft.Foo/bars",
                vec!["2021-04-01".into()],
                Some(LastFailure::Http(api_error(status, None, Some("msg")))),
            )
        };

        assert_eq!(classify(403).short_label(), "denied");
        assert_eq!(classify(401).short_label(), "denied");
        assert_eq!(classify(409).short_label(), "locked");
        assert_eq!(classify(404).short_label(), "not-found");
        assert_eq!(classify(500).short_label(), "error");
    }

    #[test]
    fn test_transport_failure_is_generic() {
        let error = classify_failure(
            "/x",
            "t",
            vec![],
            Some(LastFailure::Transport("connection reset".to_string())),
        );
        assert_eq!(
            error,
            DeleteError::Failed {
                resource_id: "/x".to_string(),
                message: "connection reset".to_string()
            }
        );
    }

    #[test]
    fn test_outcome_accessors() {
        let accepted = DeleteOutcome::Accepted {
            api_version: "2021-04-01".to_string(),
        };
        assert!(accepted.is_pending());
        assert_eq!(accepted.api_version(), "2021-04-01");
    }
}
