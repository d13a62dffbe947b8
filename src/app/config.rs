//! Configuration loader.
//!
//! Settings come from a TOML file (explicit path, or `azdash.toml` in the
//! platform config directory) and are then overridden by environment
//! variables. Secrets are only ever read from the environment.
//!
//! # azdash.toml
//!
//! ```toml
//! tenant_id = "00000000-0000-0000-0000-000000000000"
//! client_id = "11111111-1111-1111-1111-111111111111"
//! subscriptions = ["22222222-2222-2222-2222-222222222222"]
//! failure_policy = "isolate_subscriptions"
//! request_timeout_secs = 60
//!
//! [api_versions]
//! "Microsoft.Cache/redis" = "2023-04-01"
//! ```

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::app::resource_explorer::query_engine::FailurePolicy;

pub const CONFIG_FILE_NAME: &str = "azdash.toml";

#[derive(Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashConfig {
    pub management_endpoint: String,
    pub graph_endpoint: String,
    pub login_endpoint: String,

    pub tenant_id: Option<String>,
    pub client_id: Option<String>,

    /// Subscriptions queried when none are given on the command line
    pub subscriptions: Vec<String>,
    pub failure_policy: FailurePolicy,
    pub request_timeout_secs: u64,

    /// Extra resource type → API version entries for deletion
    pub api_versions: BTreeMap<String, String>,

    #[serde(skip)]
    pub client_secret: Option<String>,
    #[serde(skip)]
    pub management_token: Option<String>,
    #[serde(skip)]
    pub directory_token: Option<String>,
}

impl Default for DashConfig {
    fn default() -> Self {
        Self {
            management_endpoint: "https://management.azure.com".to_string(),
            graph_endpoint: "https://graph.microsoft.com".to_string(),
            login_endpoint: "https://login.microsoftonline.com".to_string(),
            tenant_id: None,
            client_id: None,
            subscriptions: Vec::new(),
            failure_policy: FailurePolicy::default(),
            request_timeout_secs: 60,
            api_versions: BTreeMap::new(),
            client_secret: None,
            management_token: None,
            directory_token: None,
        }
    }
}

impl std::fmt::Debug for DashConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("DashConfig")
            .field("management_endpoint", &self.management_endpoint)
            .field("graph_endpoint", &self.graph_endpoint)
            .field("login_endpoint", &self.login_endpoint)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("subscriptions", &self.subscriptions)
            .field("failure_policy", &self.failure_policy)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("api_versions", &self.api_versions)
            .field("client_secret", &redact(&self.client_secret))
            .field("management_token", &redact(&self.management_token))
            .field("directory_token", &redact(&self.directory_token))
            .finish()
    }
}

impl DashConfig {
    /// Platform config location, e.g. `~/.config/azdash/azdash.toml`
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "", "azdash")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Load from `path` (which must exist) or from the default location (which
    /// may not), then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_from_path(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::load_from_path(&default)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply `AZDASH_*` overrides from an environment lookup
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("AZDASH_MANAGEMENT_ENDPOINT") {
            self.management_endpoint = v;
        }
        if let Some(v) = non_empty("AZDASH_GRAPH_ENDPOINT") {
            self.graph_endpoint = v;
        }
        if let Some(v) = non_empty("AZDASH_LOGIN_ENDPOINT") {
            self.login_endpoint = v;
        }
        if let Some(v) = non_empty("AZDASH_TENANT_ID") {
            self.tenant_id = Some(v);
        }
        if let Some(v) = non_empty("AZDASH_CLIENT_ID") {
            self.client_id = Some(v);
        }
        if let Some(v) = non_empty("AZDASH_CLIENT_SECRET") {
            self.client_secret = Some(v);
        }
        if let Some(v) = non_empty("AZDASH_ARM_TOKEN") {
            self.management_token = Some(v);
        }
        if let Some(v) = non_empty("AZDASH_GRAPH_TOKEN") {
            self.directory_token = Some(v);
        }
    }

    pub fn validate(&self) -> Result<()> {
        for (name, endpoint) in [
            ("management_endpoint", &self.management_endpoint),
            ("graph_endpoint", &self.graph_endpoint),
            ("login_endpoint", &self.login_endpoint),
        ] {
            url::Url::parse(endpoint)
                .with_context(|| format!("{} is not a valid URL: {}", name, endpoint))?;
        }

        if self.request_timeout_secs == 0 {
            anyhow::bail!("request_timeout_secs must be greater than zero");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Shared HTTP client honoring the configured timeout
    pub fn http_client(&self) -> Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.request_timeout())
            .user_agent(concat!("azdash/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")
    }
}
