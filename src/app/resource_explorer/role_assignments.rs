use serde::Deserialize;
use tracing::info;

use super::arm_client::ArmClient;
use super::errors::DashError;
use super::resource_id::subscription_scope;
use super::state::{PrincipalType, RoleAssignment};
use crate::app::azure_identity::TokenScope;

pub const ROLE_ASSIGNMENTS_API_VERSION: &str = "2022-04-01";

/// Built-in Owner role definition
pub const OWNER_ROLE_DEFINITION_GUID: &str = "8e3af657-a8ff-443c-a75c-2fe8c4bcb635";

/// Fully-qualified Owner role definition ID within a subscription
pub fn owner_role_definition_id(subscription_id: &str) -> String {
    format!(
        "{}/providers/Microsoft.Authorization/roleDefinitions/{}",
        subscription_scope(subscription_id),
        OWNER_ROLE_DEFINITION_GUID
    )
}

#[derive(Debug, Deserialize)]
struct RoleAssignmentWire {
    id: String,
    name: String,
    properties: RoleAssignmentProperties,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RoleAssignmentProperties {
    principal_id: String,
    #[serde(default)]
    principal_type: Option<String>,
    role_definition_id: String,
    scope: String,
}

impl From<RoleAssignmentWire> for RoleAssignment {
    fn from(wire: RoleAssignmentWire) -> Self {
        let principal_type = wire
            .properties
            .principal_type
            .as_deref()
            .map(PrincipalType::parse)
            .unwrap_or_else(|| PrincipalType::Other(String::new()));

        RoleAssignment {
            id: wire.id,
            name: wire.name,
            principal_id: wire.properties.principal_id,
            principal_type,
            role_definition_id: wire.properties.role_definition_id,
            scope: wire.properties.scope,
        }
    }
}

/// Keep only assignments of the subscription's Owner role definition.
///
/// The comparison is exact: role definition IDs from other subscriptions or
/// other roles are dropped.
pub fn filter_owner_assignments(
    assignments: Vec<RoleAssignment>,
    subscription_id: &str,
) -> Vec<RoleAssignment> {
    let owner_role = owner_role_definition_id(subscription_id);
    assignments
        .into_iter()
        .filter(|assignment| assignment.role_definition_id == owner_role)
        .collect()
}

/// Every role assignment visible at the subscription scope (`atScope()`).
///
/// Returned scopes are not necessarily the subscription root.
pub async fn list_role_assignments(
    client: &ArmClient,
    subscription_id: &str,
) -> Result<Vec<RoleAssignment>, DashError> {
    let url = client.management_url(&format!(
        "{}/providers/Microsoft.Authorization/roleAssignments?api-version={}&$filter=atScope()",
        subscription_scope(subscription_id),
        ROLE_ASSIGNMENTS_API_VERSION
    ));

    let wire: Vec<RoleAssignmentWire> = client.get_paginated(&url, TokenScope::Management).await?;
    Ok(wire.into_iter().map(RoleAssignment::from).collect())
}

/// Owner-role assignments for a subscription
pub async fn list_owner_assignments(
    client: &ArmClient,
    subscription_id: &str,
) -> Result<Vec<RoleAssignment>, DashError> {
    let all = list_role_assignments(client, subscription_id).await?;
    let total = all.len();
    let owners = filter_owner_assignments(all, subscription_id);
    info!(
        "Subscription {}: {} of {} role assignments are Owner grants",
        subscription_id,
        owners.len(),
        total
    );
    Ok(owners)
}
