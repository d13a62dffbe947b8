use std::collections::{BTreeMap, HashMap};

/// Version used when a resource type has no entry
pub const DEFAULT_API_VERSION: &str = "2021-04-01";

/// Generic versions tried, in order, after the primary one is rejected
pub const FALLBACK_API_VERSIONS: [&str; 3] = ["2021-04-01", "2020-06-01", "2019-10-01"];

/// Resource type → API version lookup for DELETE requests.
///
/// Keys are compared case-insensitively, matching how resource providers treat
/// type names.
#[derive(Debug, Clone)]
pub struct ApiVersionTable {
    versions: HashMap<String, String>,
}

impl Default for ApiVersionTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiVersionTable {
    pub fn new() -> Self {
        let mut table = Self {
            versions: HashMap::new(),
        };

        // Compute
        table.insert("Microsoft.Compute/virtualMachines", "2023-03-01");
        table.insert("Microsoft.Compute/virtualMachineScaleSets", "2023-03-01");
        table.insert("Microsoft.Compute/disks", "2023-04-02");
        table.insert("Microsoft.Compute/snapshots", "2023-04-02");
        table.insert("Microsoft.Compute/availabilitySets", "2023-03-01");

        // Networking
        table.insert("Microsoft.Network/virtualNetworks", "2023-04-01");
        table.insert("Microsoft.Network/networkInterfaces", "2023-04-01");
        table.insert("Microsoft.Network/networkSecurityGroups", "2023-04-01");
        table.insert("Microsoft.Network/publicIPAddresses", "2023-04-01");
        table.insert("Microsoft.Network/loadBalancers", "2023-04-01");
        table.insert("Microsoft.Network/privateEndpoints", "2023-04-01");
        table.insert("Microsoft.Network/privateDnsZones", "2020-06-01");

        // Storage and data
        table.insert("Microsoft.Storage/storageAccounts", "2023-01-01");
        table.insert("Microsoft.Sql/servers", "2021-11-01");
        table.insert("Microsoft.Sql/servers/databases", "2021-11-01");
        table.insert("Microsoft.DocumentDB/databaseAccounts", "2023-04-15");
        table.insert("Microsoft.Cache/Redis", "2023-04-01");

        // App platform
        table.insert("Microsoft.Web/sites", "2022-03-01");
        table.insert("Microsoft.Web/serverFarms", "2022-03-01");
        table.insert("Microsoft.ContainerService/managedClusters", "2023-05-01");
        table.insert("Microsoft.ContainerRegistry/registries", "2023-01-01-preview");
        table.insert("Microsoft.ContainerInstance/containerGroups", "2023-05-01");

        // Security and identity
        table.insert("Microsoft.KeyVault/vaults", "2023-02-01");
        table.insert("Microsoft.ManagedIdentity/userAssignedIdentities", "2023-01-31");

        // Monitoring
        table.insert("Microsoft.Insights/components", "2020-02-02");
        table.insert("Microsoft.OperationalInsights/workspaces", "2022-10-01");

        table.insert("Microsoft.Resources/resourceGroups", "2021-04-01");

        table
    }

    /// Default table extended with (or overridden by) extra entries
    pub fn with_overrides(overrides: &BTreeMap<String, String>) -> Self {
        let mut table = Self::new();
        for (resource_type, version) in overrides {
            table.insert(resource_type, version);
        }
        table
    }

    pub fn insert(&mut self, resource_type: &str, api_version: &str) {
        self.versions
            .insert(resource_type.to_ascii_lowercase(), api_version.to_string());
    }

    /// Primary version for a type, or the generic default
    pub fn primary_version(&self, resource_type: &str) -> &str {
        self.versions
            .get(&resource_type.to_ascii_lowercase())
            .map(String::as_str)
            .unwrap_or(DEFAULT_API_VERSION)
    }

    pub fn is_known(&self, resource_type: &str) -> bool {
        self.versions
            .contains_key(&resource_type.to_ascii_lowercase())
    }

    /// Ordered, de-duplicated versions to try for a type
    pub fn candidate_versions(&self, resource_type: &str) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::with_capacity(1 + FALLBACK_API_VERSIONS.len());
        candidates.push(self.primary_version(resource_type).to_string());
        for version in FALLBACK_API_VERSIONS {
            if !candidates.iter().any(|c| c == version) {
                candidates.push(version.to_string());
            }
        }
        candidates
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
