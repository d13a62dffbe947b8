//! Resource → owners join.
//!
//! Owners of a resource are the principals holding an Owner assignment scoped
//! exactly to the resource ID. When there are none, the subscription root's
//! Owner assignments are used instead. Resource-group scoped grants are not
//! inherited.

use std::collections::HashMap;

use super::principals::PrincipalResolution;
use super::resource_id::{resource_group_from_id, subscription_id_from_id, subscription_scope};
use super::state::{OwnedResource, ResourceRecord, RoleAssignment};

/// Scope → owner display names
#[derive(Debug, Clone, Default)]
pub struct OwnerIndex {
    by_scope: HashMap<String, Vec<String>>,
}

impl OwnerIndex {
    /// One pass over the assignments. Unresolved principals show as raw IDs.
    pub fn build(assignments: &[RoleAssignment], principals: &PrincipalResolution) -> Self {
        let mut by_scope: HashMap<String, Vec<String>> = HashMap::new();

        for assignment in assignments {
            let name = principals
                .display_name(&assignment.principal_id)
                .unwrap_or(&assignment.principal_id)
                .to_string();

            let owners = by_scope.entry(assignment.scope.clone()).or_default();
            if !owners.contains(&name) {
                owners.push(name);
            }
        }

        Self { by_scope }
    }

    pub fn owners_at(&self, scope: &str) -> &[String] {
        self.by_scope.get(scope).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resource-level owners, else the subscription root's
    pub fn owners_for(&self, resource_id: &str, subscription_root: Option<&str>) -> Vec<String> {
        let direct = self.owners_at(resource_id);
        if !direct.is_empty() {
            return direct.to_vec();
        }
        subscription_root
            .map(|root| self.owners_at(root).to_vec())
            .unwrap_or_default()
    }

    pub fn scope_count(&self) -> usize {
        self.by_scope.len()
    }
}

/// Attach derived fields and owners to each resource
pub fn aggregate_owners(
    resources: Vec<ResourceRecord>,
    assignments: &[RoleAssignment],
    principals: &PrincipalResolution,
) -> Vec<OwnedResource> {
    let index = OwnerIndex::build(assignments, principals);

    resources
        .into_iter()
        .map(|resource| {
            let subscription_id = subscription_id_from_id(&resource.id);
            let root = subscription_id.as_deref().map(subscription_scope);
            let owners = index.owners_for(&resource.id, root.as_deref());
            let resource_group = resource_group_from_id(&resource.id);

            OwnedResource {
                resource,
                subscription_id,
                resource_group,
                owners,
            }
        })
        .collect()
}
