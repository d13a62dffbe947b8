//! Multi-subscription resource query.
//!
//! For each subscription the resource listing and the Owner assignment listing
//! run concurrently; subscriptions run concurrently with each other. Once all
//! of them are in, principal IDs from every subscription are resolved in one
//! directory lookup and joined onto the resources.
//!
//! ```text
//! sub A: list_resources ─┐
//!        list_owners    ─┤
//! sub B: list_resources ─┼─▶ resolve principals (once) ─▶ aggregate owners
//!        list_owners    ─┘
//! ```

use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::arm_client::ArmClient;
use super::errors::DashError;
use super::owners::aggregate_owners;
use super::principals::{dedupe_ids, PrincipalResolution, PrincipalResolver};
use super::role_assignments::list_owner_assignments;
use super::state::{OwnedResource, ResourceRecord, RoleAssignment};

/// What to do when one subscription's fetch fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Any failure aborts the whole query
    #[default]
    AbortOnError,
    /// Report failed subscriptions and return the rest
    IsolateSubscriptions,
}

/// Non-fatal problem attached to a query result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum QueryWarning {
    /// Directory lookup failed; owners are shown as principal IDs
    #[serde(rename_all = "camelCase")]
    DirectoryUnavailable { reason: String },
    #[serde(rename_all = "camelCase")]
    SubscriptionFailed {
        subscription_id: String,
        error: String,
    },
}

impl fmt::Display for QueryWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryWarning::DirectoryUnavailable { reason } => {
                write!(f, "Owner names unavailable, showing principal IDs ({})", reason)
            }
            QueryWarning::SubscriptionFailed {
                subscription_id,
                error,
            } => write!(f, "Subscription {} could not be queried: {}", subscription_id, error),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryReport {
    /// Subscriptions that contributed resources
    pub subscriptions: Vec<String>,
    pub resources: Vec<OwnedResource>,
    pub completed_at: DateTime<Utc>,
}

impl QueryReport {
    pub fn new(subscriptions: Vec<String>, resources: Vec<OwnedResource>) -> Self {
        Self {
            subscriptions,
            resources,
            completed_at: Utc::now(),
        }
    }
}

/// Query result, with warnings made explicit rather than swallowed
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutcome {
    Ok(QueryReport),
    PartialOk(QueryReport, Vec<QueryWarning>),
}

impl QueryOutcome {
    pub fn from_parts(report: QueryReport, warnings: Vec<QueryWarning>) -> Self {
        if warnings.is_empty() {
            QueryOutcome::Ok(report)
        } else {
            QueryOutcome::PartialOk(report, warnings)
        }
    }

    pub fn report(&self) -> &QueryReport {
        match self {
            QueryOutcome::Ok(report) | QueryOutcome::PartialOk(report, _) => report,
        }
    }

    pub fn warnings(&self) -> &[QueryWarning] {
        match self {
            QueryOutcome::Ok(_) => &[],
            QueryOutcome::PartialOk(_, warnings) => warnings,
        }
    }

    pub fn is_partial(&self) -> bool {
        matches!(self, QueryOutcome::PartialOk(..))
    }

    pub fn into_parts(self) -> (QueryReport, Vec<QueryWarning>) {
        match self {
            QueryOutcome::Ok(report) => (report, Vec::new()),
            QueryOutcome::PartialOk(report, warnings) => (report, warnings),
        }
    }
}

struct SubscriptionFetch {
    subscription_id: String,
    resources: Vec<ResourceRecord>,
    owners: Vec<RoleAssignment>,
}

pub struct QueryEngine {
    client: ArmClient,
    policy: FailurePolicy,
}

impl QueryEngine {
    pub fn new(client: ArmClient, policy: FailurePolicy) -> Self {
        Self { client, policy }
    }

    pub fn client(&self) -> &ArmClient {
        &self.client
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    async fn fetch_subscription(&self, subscription_id: &str) -> Result<SubscriptionFetch, DashError> {
        let (resources, owners) = tokio::try_join!(
            self.client.list_resources(subscription_id),
            list_owner_assignments(&self.client, subscription_id)
        )?;

        log_debug!(
            "Subscription {}: {} resources, {} owner assignments",
            subscription_id,
            resources.len(),
            owners.len()
        );

        Ok(SubscriptionFetch {
            subscription_id: subscription_id.to_string(),
            resources,
            owners,
        })
    }

    /// Query resources and owners across `subscriptions`
    pub async fn query(&self, subscriptions: &[String]) -> Result<QueryOutcome, DashError> {
        let subscriptions = dedupe_ids(subscriptions);
        let mut warnings = Vec::new();

        log_info!(
            "Querying {} subscription(s) with policy {:?}",
            subscriptions.len(),
            self.policy
        );

        let fetches = match self.policy {
            FailurePolicy::AbortOnError => {
                try_join_all(subscriptions.iter().map(|s| self.fetch_subscription(s))).await?
            }
            FailurePolicy::IsolateSubscriptions => {
                let results =
                    join_all(subscriptions.iter().map(|s| self.fetch_subscription(s))).await;

                let mut fetches = Vec::with_capacity(results.len());
                for (subscription_id, result) in subscriptions.iter().zip(results) {
                    match result {
                        Ok(fetch) => fetches.push(fetch),
                        Err(e) => {
                            log_warn!("Subscription {} failed: {}", subscription_id, e);
                            warnings.push(QueryWarning::SubscriptionFailed {
                                subscription_id: subscription_id.clone(),
                                error: e.user_message(),
                            });
                        }
                    }
                }
                fetches
            }
        };

        let mut queried = Vec::with_capacity(fetches.len());
        let mut resources = Vec::new();
        let mut owners = Vec::new();
        for fetch in fetches {
            queried.push(fetch.subscription_id);
            resources.extend(fetch.resources);
            owners.extend(fetch.owners);
        }

        Ok(self.join_owners(queried, resources, owners, warnings).await)
    }

    /// Query one resource group. Owner assignments still come from the whole
    /// subscription, so subscription-root owners apply as usual.
    pub async fn query_resource_group(
        &self,
        subscription_id: &str,
        resource_group: &str,
    ) -> Result<QueryOutcome, DashError> {
        let (resources, owners) = tokio::try_join!(
            self.client
                .list_resource_group_resources(subscription_id, resource_group),
            list_owner_assignments(&self.client, subscription_id)
        )?;

        Ok(self
            .join_owners(vec![subscription_id.to_string()], resources, owners, Vec::new())
            .await)
    }

    async fn join_owners(
        &self,
        queried: Vec<String>,
        resources: Vec<ResourceRecord>,
        owners: Vec<RoleAssignment>,
        mut warnings: Vec<QueryWarning>,
    ) -> QueryOutcome {
        let principals = PrincipalResolver::new(&self.client)
            .resolve(owners.iter().map(|assignment| assignment.principal_id.as_str()))
            .await;
        if let PrincipalResolution::Unavailable { reason } = &principals {
            warnings.push(QueryWarning::DirectoryUnavailable {
                reason: reason.clone(),
            });
        }

        let resources = aggregate_owners(resources, &owners, &principals);
        log_info!(
            "Query complete: {} resources across {} subscription(s), {} warning(s)",
            resources.len(),
            queried.len(),
            warnings.len()
        );

        QueryOutcome::from_parts(QueryReport::new(queried, resources), warnings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_parts() {
        let report = QueryReport::new(vec![], vec![]);
        assert!(!QueryOutcome::from_parts(report.clone(), vec![]).is_partial());

        let outcome = QueryOutcome::from_parts(
            report,
            vec![QueryWarning::DirectoryUnavailable {
                reason: "403".to_string(),
            }],
        );
        assert!(outcome.is_partial());
        assert_eq!(outcome.warnings().len(), 1);
    }

    #[test]
    fn test_failure_policy_config_names() {
        let policy: FailurePolicy = serde_json::from_str("\"isolate_subscriptions\"").unwrap();
        assert_eq!(policy, FailurePolicy::IsolateSubscriptions);
        assert_eq!(FailurePolicy::default(), FailurePolicy::AbortOnError);
    }

    #[test]
    fn test_warning_display() {
        let warning = QueryWarning::SubscriptionFailed {
            subscription_id: "s1".to_string(),
            error: "HTTP 403 Forbidden".to_string(),
        };
        assert_eq!(
            warning.to_string(),
            "Subscription s1 could not be queried: HTTP 403 Forbidden"
        );
    }
}
