//! HTTP client for the management and directory APIs.
//!
//! Every listing goes through [`ArmClient::get_paginated`], which follows
//! `nextLink` continuations until the server stops sending one. The first
//! non-success response aborts the whole listing and discards the pages
//! collected so far; callers never see a partial list from this layer.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

use super::errors::{ApiError, DashError};
use super::state::{ResourceRecord, Subscription, Tenant};
use crate::app::azure_identity::{TokenProvider, TokenScope};
use crate::app::config::DashConfig;

pub const SUBSCRIPTIONS_API_VERSION: &str = "2020-01-01";
pub const RESOURCES_API_VERSION: &str = "2021-04-01";

/// One page of a listing: `{ value: [...], nextLink?: string }`
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
    #[serde(default, rename = "nextLink", alias = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Raw result of a single DELETE attempt
#[derive(Debug, Clone)]
pub struct DeleteResponse {
    pub status: u16,
    pub error: Option<ApiError>,
}

impl DeleteResponse {
    /// 200 and 204 mean done, 202 means accepted for asynchronous deletion
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200 | 202 | 204)
    }
}

#[derive(Clone)]
pub struct ArmClient {
    http: reqwest::Client,
    tokens: Arc<dyn TokenProvider>,
    management_endpoint: String,
    graph_endpoint: String,
}

impl ArmClient {
    pub fn new(http: reqwest::Client, tokens: Arc<dyn TokenProvider>, config: &DashConfig) -> Self {
        Self {
            http,
            tokens,
            management_endpoint: config.management_endpoint.trim_end_matches('/').to_string(),
            graph_endpoint: config.graph_endpoint.trim_end_matches('/').to_string(),
        }
    }

    pub fn management_endpoint(&self) -> &str {
        &self.management_endpoint
    }

    pub fn graph_endpoint(&self) -> &str {
        &self.graph_endpoint
    }

    /// Absolute management URL for a path that already carries its query string
    pub fn management_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.management_endpoint, path_and_query)
    }

    async fn bearer(&self, scope: TokenScope) -> Result<String, DashError> {
        self.tokens.token(scope).await
    }

    /// Fetch every page starting at `url`, concatenating `value` arrays in order
    pub async fn get_paginated<T>(&self, url: &str, scope: TokenScope) -> Result<Vec<T>, DashError>
    where
        T: DeserializeOwned,
    {
        let token = self.bearer(scope).await?;
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut visited = HashSet::new();

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.clone()) {
                warn!("Continuation link repeated after {} page(s): {}", visited.len(), page_url);
                return Err(DashError::Decode {
                    url: page_url,
                    message: "continuation link repeats an earlier page".to_string(),
                });
            }
            let page: Page<T> = self.get_json(&page_url, &token).await?;
            items.extend(page.value);
            next = page.next_link.filter(|link| !link.is_empty());
        }
        let pages = visited.len();

        debug!("Fetched {} items in {} page(s) from {}", items.len(), pages, url);
        Ok(items)
    }

    async fn get_json<T>(&self, url: &str, token: &str) -> Result<T, DashError>
    where
        T: DeserializeOwned,
    {
        debug!("GET {}", url);
        let response = self
            .http
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| DashError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|source| DashError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            let error = ApiError::from_response(status, &body);
            warn!("GET {} failed: {}", url, error);
            return Err(DashError::Api {
                url: url.to_string(),
                error,
            });
        }

        serde_json::from_str(&body).map_err(|e| DashError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    /// POST a JSON body and decode the JSON response
    pub async fn post_json<B, T>(&self, url: &str, scope: TokenScope, body: &B) -> Result<T, DashError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let token = self.bearer(scope).await?;
        debug!("POST {}", url);
        let response = self
            .http
            .post(url)
            .bearer_auth(&token)
            .json(body)
            .send()
            .await
            .map_err(|source| DashError::Transport {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|source| DashError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(DashError::Api {
                url: url.to_string(),
                error: ApiError::from_response(status, &text),
            });
        }

        serde_json::from_str(&text).map_err(|e| DashError::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }

    pub async fn list_subscriptions(&self) -> Result<Vec<Subscription>, DashError> {
        let url = self.management_url(&format!(
            "/subscriptions?api-version={}",
            SUBSCRIPTIONS_API_VERSION
        ));
        self.get_paginated(&url, TokenScope::Management).await
    }

    pub async fn list_tenants(&self) -> Result<Vec<Tenant>, DashError> {
        let url = self.management_url(&format!("/tenants?api-version={}", SUBSCRIPTIONS_API_VERSION));
        self.get_paginated(&url, TokenScope::Management).await
    }

    /// Every resource in a subscription
    pub async fn list_resources(&self, subscription_id: &str) -> Result<Vec<ResourceRecord>, DashError> {
        let url = self.management_url(&format!(
            "/subscriptions/{}/resources?api-version={}",
            subscription_id, RESOURCES_API_VERSION
        ));
        self.get_paginated(&url, TokenScope::Management).await
    }

    /// Resources in one resource group
    pub async fn list_resource_group_resources(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<Vec<ResourceRecord>, DashError> {
        let url = self.management_url(&format!(
            "/subscriptions/{}/resourceGroups/{}/resources?api-version={}",
            subscription_id, resource_group, RESOURCES_API_VERSION
        ));
        self.get_paginated(&url, TokenScope::Management).await
    }

    /// Issue one DELETE with the given API version.
    ///
    /// Only transport and token failures are errors here; HTTP failures come
    /// back in [`DeleteResponse`] so the caller can decide whether to retry.
    pub async fn delete_resource_version(
        &self,
        resource_id: &str,
        api_version: &str,
    ) -> Result<DeleteResponse, DashError> {
        let token = self.bearer(TokenScope::Management).await?;
        let url = self.management_url(resource_id);
        debug!("DELETE {} (api-version {})", url, api_version);

        let response = self
            .http
            .request(Method::DELETE, &url)
            .query(&[("api-version", api_version)])
            .bearer_auth(&token)
            .send()
            .await
            .map_err(|source| DashError::Transport {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if matches!(
            status,
            StatusCode::OK | StatusCode::ACCEPTED | StatusCode::NO_CONTENT
        ) {
            return Ok(DeleteResponse {
                status: status.as_u16(),
                error: None,
            });
        }

        let body = error_body_or_empty(&url, response.text().await);
        Ok(DeleteResponse {
            status: status.as_u16(),
            error: Some(ApiError::from_response(status, &body)),
        })
    }
}

/// Error body of a failed DELETE. An unreadable body is logged and treated as
/// empty so classification falls back to the status line.
fn error_body_or_empty<E: std::fmt::Display>(url: &str, body: Result<String, E>) -> String {
    match body {
        Ok(body) => body,
        Err(e) => {
            warn!("Could not read DELETE error body from {}: {}", url, e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_accepts_both_continuation_spellings() {
        let arm: Page<u32> =
            serde_json::from_str(r#"{"value":[1,2],"nextLink":"https://next"}"#).unwrap();
        assert_eq!(arm.value, vec![1, 2]);
        assert_eq!(arm.next_link.as_deref(), Some("https://next"));

        let graph: Page<u32> =
            serde_json::from_str(r#"{"value":[3],"@odata.nextLink":"https://graph-next"}"#).unwrap();
        assert_eq!(graph.next_link.as_deref(), Some("https://graph-next"));
    }

    #[test]
    fn test_page_without_value_is_empty() {
        let page: Page<u32> = serde_json::from_str(r#"{}"#).unwrap();
        assert!(page.value.is_empty());
        assert!(page.next_link.is_none());
    }

    #[test]
    fn test_delete_success_statuses() {
        for status in [200, 202, 204] {
            assert!(DeleteResponse { status, error: None }.is_success());
        }
        assert!(!DeleteResponse { status: 201, error: None }.is_success());
    }

    #[test]
    fn test_unreadable_delete_body_falls_back_to_status_text() {
        let body = error_body_or_empty("https://arm/x", Err::<String, _>("connection reset"));
        assert_eq!(body, "");

        let error = ApiError::from_response(StatusCode::CONFLICT, &body);
        assert_eq!(error.message, None);
        assert_eq!(error.detail(), "Conflict");

        let body = error_body_or_empty::<&str>(
            "https://arm/x",
            Ok(r#"{"error":{"code":"ScopeLocked","message":"locked"}}"#.to_string()),
        );
        assert_eq!(ApiError::from_response(StatusCode::CONFLICT, &body).detail(), "locked");
    }
}
