//! # Access token acquisition
//!
//! The dashboard never manages sign-in itself. It asks a [`TokenProvider`] for a
//! bearer token for one of two audiences: the management API (resources, role
//! assignments, deletion) or the directory API (principal lookups).
//!
//! Two providers ship with the crate:
//!
//! - [`StaticTokenProvider`] wraps tokens acquired elsewhere, e.g. from
//!   `az account get-access-token`. Useful for scripting and tests.
//! - [`ClientSecretTokenProvider`] runs the OAuth 2.0 client-credentials flow
//!   against the login endpoint and caches one token per audience until it is
//!   within five minutes of expiring.
//!
//! Interactive flows (popups, device codes) belong to the caller; implement
//! the trait to plug one in.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::app::config::DashConfig;
use crate::app::resource_explorer::errors::DashError;

/// Audience a token is requested for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenScope {
    Management,
    Directory,
}

impl TokenScope {
    pub fn label(&self) -> &'static str {
        match self {
            TokenScope::Management => "management",
            TokenScope::Directory => "directory",
        }
    }
}

/// Supplies short-lived bearer tokens
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self, scope: TokenScope) -> Result<String, DashError>;
}

/// Tokens acquired outside the process
#[derive(Clone)]
pub struct StaticTokenProvider {
    management: String,
    directory: Option<String>,
}

impl StaticTokenProvider {
    pub fn new(management: impl Into<String>, directory: Option<String>) -> Self {
        Self {
            management: management.into(),
            directory,
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("management", &"<redacted>")
            .field("directory", &self.directory.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn token(&self, scope: TokenScope) -> Result<String, DashError> {
        match scope {
            TokenScope::Management => Ok(self.management.clone()),
            TokenScope::Directory => self.directory.clone().ok_or_else(|| {
                DashError::Token("no directory token configured (set AZDASH_GRAPH_TOKEN)".to_string())
            }),
        }
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Expired, or expiring within the next 5 minutes
    fn is_expired(&self) -> bool {
        Utc::now() + Duration::minutes(5) >= self.expires_at
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// OAuth 2.0 client-credentials flow for a service principal
pub struct ClientSecretTokenProvider {
    client: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scopes: HashMap<TokenScope, String>,
    cache: Arc<RwLock<HashMap<TokenScope, CachedToken>>>,
}

impl ClientSecretTokenProvider {
    pub fn new(
        client: reqwest::Client,
        config: &DashConfig,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
    ) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            config.login_endpoint.trim_end_matches('/'),
            tenant_id
        );

        let mut scopes = HashMap::new();
        scopes.insert(
            TokenScope::Management,
            format!("{}/.default", config.management_endpoint.trim_end_matches('/')),
        );
        scopes.insert(
            TokenScope::Directory,
            format!("{}/.default", config.graph_endpoint.trim_end_matches('/')),
        );

        Self {
            client,
            token_url,
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scopes,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn cached(&self, scope: TokenScope) -> Option<String> {
        let cache = self.cache.read().await;
        cache
            .get(&scope)
            .filter(|token| !token.is_expired())
            .map(|token| token.access_token.clone())
    }

    async fn request_token(&self, scope: TokenScope) -> Result<CachedToken, DashError> {
        let audience = self
            .scopes
            .get(&scope)
            .ok_or_else(|| DashError::Token(format!("no audience for {} scope", scope.label())))?;

        debug!("Requesting {} token from {}", scope.label(), self.token_url);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", audience.as_str()),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| DashError::Token(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token endpoint returned {}: {}", status, body);
            return Err(DashError::Token(format!(
                "token endpoint returned {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| DashError::Token(format!("invalid token response: {}", e)))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in.unwrap_or(3600)),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientSecretTokenProvider {
    async fn token(&self, scope: TokenScope) -> Result<String, DashError> {
        if let Some(token) = self.cached(scope).await {
            return Ok(token);
        }

        let fresh = self.request_token(scope).await?;
        let access_token = fresh.access_token.clone();
        self.cache.write().await.insert(scope, fresh);
        debug!("Cached {} token", scope.label());
        Ok(access_token)
    }
}

/// Pick a provider from configuration: static tokens win, then client
/// credentials.
pub fn provider_from_config(
    client: reqwest::Client,
    config: &DashConfig,
) -> anyhow::Result<Arc<dyn TokenProvider>> {
    if let Some(management) = &config.management_token {
        return Ok(Arc::new(StaticTokenProvider::new(
            management.clone(),
            config.directory_token.clone(),
        )));
    }

    match (&config.tenant_id, &config.client_id, &config.client_secret) {
        (Some(tenant_id), Some(client_id), Some(client_secret)) => Ok(Arc::new(
            ClientSecretTokenProvider::new(client, config, tenant_id, client_id, client_secret),
        )),
        _ => anyhow::bail!(
            "no credentials configured: set AZDASH_ARM_TOKEN, or tenant_id/client_id with AZDASH_CLIENT_SECRET"
        ),
    }
}
