use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::query_engine::{QueryOutcome, QueryWarning};

/// A managed resource as returned by the resource listing endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Fully-qualified ID, e.g. /subscriptions/{sub}/resourceGroups/{rg}/providers/...
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub resource_type: String, // Microsoft.Compute/virtualMachines
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

impl ResourceRecord {
    /// Tags as key/value pairs, empty when the resource carries none
    pub fn tag_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags
            .iter()
            .flat_map(|tags| tags.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn has_tags(&self) -> bool {
        self.tags.as_ref().is_some_and(|tags| !tags.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrincipalType {
    User,
    Group,
    ServicePrincipal,
    ForeignGroup,
    Device,
    #[serde(untagged)]
    Other(String),
}

impl PrincipalType {
    pub fn parse(value: &str) -> Self {
        match value {
            "User" => PrincipalType::User,
            "Group" => PrincipalType::Group,
            "ServicePrincipal" => PrincipalType::ServicePrincipal,
            "ForeignGroup" => PrincipalType::ForeignGroup,
            "Device" => PrincipalType::Device,
            other => PrincipalType::Other(other.to_string()),
        }
    }

    /// Map a directory `@odata.type` discriminator (`#microsoft.graph.user`)
    pub fn from_odata_type(odata_type: &str) -> Self {
        match odata_type.trim_start_matches("#microsoft.graph.") {
            "user" => PrincipalType::User,
            "group" => PrincipalType::Group,
            "servicePrincipal" => PrincipalType::ServicePrincipal,
            "device" => PrincipalType::Device,
            other => PrincipalType::Other(other.to_string()),
        }
    }
}

/// Grant of a role definition to a principal at a scope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignment {
    pub id: String,
    pub name: String,
    pub principal_id: String,
    pub principal_type: PrincipalType,
    pub role_definition_id: String,
    pub scope: String,
}

/// Minimal directory entry for a principal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub principal_type: Option<PrincipalType>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Path form: /subscriptions/{subscriptionId}
    pub id: String,
    pub subscription_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<String>,
}

impl Subscription {
    pub fn is_enabled(&self) -> bool {
        self.state
            .as_deref()
            .map_or(true, |state| state.eq_ignore_ascii_case("Enabled"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub tenant_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_domain: Option<String>,
}

/// Resource enriched with its derived display fields and owners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedResource {
    #[serde(flatten)]
    pub resource: ResourceRecord,
    pub subscription_id: Option<String>,
    pub resource_group: Option<String>,
    pub owners: Vec<String>,
}

/// Caller-owned dashboard state.
///
/// Holds the subscription list, the current selection and the last query
/// result. Nothing here is global: each caller constructs its own and replaces
/// the result on every query.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    subscriptions: Vec<Subscription>,
    selected: BTreeSet<String>,
    resources: Vec<OwnedResource>,
    warnings: Vec<QueryWarning>,
    last_error: Option<String>,
    last_updated: Option<DateTime<Utc>>,
}

impl DashboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the known subscriptions, dropping selections that vanished
    pub fn set_subscriptions(&mut self, subscriptions: Vec<Subscription>) {
        self.selected.retain(|id| {
            subscriptions
                .iter()
                .any(|subscription| &subscription.subscription_id == id)
        });
        self.subscriptions = subscriptions;
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Select a subscription for querying. Returns false if it is unknown.
    pub fn select_subscription(&mut self, subscription_id: &str) -> bool {
        let known = self
            .subscriptions
            .iter()
            .any(|subscription| subscription.subscription_id == subscription_id);
        if known {
            self.selected.insert(subscription_id.to_string());
        }
        known
    }

    pub fn deselect_subscription(&mut self, subscription_id: &str) {
        self.selected.remove(subscription_id);
    }

    pub fn select_all(&mut self) {
        self.selected = self
            .subscriptions
            .iter()
            .filter(|subscription| subscription.is_enabled())
            .map(|subscription| subscription.subscription_id.clone())
            .collect();
    }

    pub fn selected_subscriptions(&self) -> Vec<String> {
        self.selected.iter().cloned().collect()
    }

    /// Replace the current result with a finished query
    pub fn record_outcome(&mut self, outcome: QueryOutcome) {
        let (report, warnings) = outcome.into_parts();
        self.last_updated = Some(report.completed_at);
        self.resources = report.resources;
        self.warnings = warnings;
        self.last_error = None;
    }

    /// Record a failed query; the previous result is kept so the user can retry
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.last_error = Some(message.into());
    }

    pub fn resources(&self) -> &[OwnedResource] {
        &self.resources
    }

    pub fn warnings(&self) -> &[QueryWarning] {
        &self.warnings
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.last_updated
    }

    /// Drop a resource from the current result after a successful deletion
    pub fn remove_resource(&mut self, resource_id: &str) -> bool {
        let before = self.resources.len();
        self.resources
            .retain(|owned| !owned.resource.id.eq_ignore_ascii_case(resource_id));
        self.resources.len() != before
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
