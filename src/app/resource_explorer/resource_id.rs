//! Helpers for picking apart fully-qualified resource IDs.

use once_cell::sync::Lazy;
use regex::Regex;

static RESOURCE_GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)/resourceGroups/([^/]+)").expect("valid resource group regex"));

static SUBSCRIPTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^/subscriptions/([^/]+)").expect("valid subscription regex"));

/// Type reported for a bare resource group path
pub const RESOURCE_GROUP_TYPE: &str = "Microsoft.Resources/resourceGroups";

/// Resource group name embedded in a resource ID, if any
pub fn resource_group_from_id(resource_id: &str) -> Option<String> {
    RESOURCE_GROUP_RE
        .captures(resource_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Subscription ID a resource ID lives under
pub fn subscription_id_from_id(resource_id: &str) -> Option<String> {
    SUBSCRIPTION_RE
        .captures(resource_id)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Subscription root scope (`/subscriptions/{id}`)
pub fn subscription_scope(subscription_id: &str) -> String {
    format!("/subscriptions/{}", subscription_id)
}

/// Resource type encoded in an ID.
///
/// `/subscriptions/s/resourceGroups/rg/providers/Microsoft.Sql/servers/a/databases/b`
/// yields `Microsoft.Sql/servers/databases`. Only the last `providers` segment
/// counts, which handles extension resources.
pub fn resource_type_from_id(resource_id: &str) -> Option<String> {
    let segments: Vec<&str> = resource_id
        .trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();

    let providers = segments
        .iter()
        .rposition(|s| s.eq_ignore_ascii_case("providers"));

    match providers {
        Some(idx) => {
            let namespace = segments.get(idx + 1)?;
            // Remaining segments alternate type/name
            let types: Vec<&str> = segments[idx + 2..].iter().step_by(2).copied().collect();
            if types.is_empty() {
                return None;
            }
            Some(format!("{}/{}", namespace, types.join("/")))
        }
        None => {
            let is_group = segments.len() == 4
                && segments[0].eq_ignore_ascii_case("subscriptions")
                && segments[2].eq_ignore_ascii_case("resourceGroups");
            is_group.then(|| RESOURCE_GROUP_TYPE.to_string())
        }
    }
}
