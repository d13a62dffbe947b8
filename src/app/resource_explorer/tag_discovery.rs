use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

use super::state::OwnedResource;

/// Metadata about a discovered tag key
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMetadata {
    pub key: String,
    /// Unique values seen for this key
    pub values: BTreeSet<String>,
    /// Resources carrying this key
    pub resource_count: usize,
}

impl TagMetadata {
    pub fn new(key: String) -> Self {
        Self {
            key,
            values: BTreeSet::new(),
            resource_count: 0,
        }
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    pub fn has_multiple_values(&self) -> bool {
        self.values.len() > 1
    }
}

/// Overall tag statistics for a result set
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallTagStats {
    pub total_resources: usize,
    pub tagged_resources: usize,
    pub untagged_resources: usize,
    pub unique_keys: usize,
    pub coverage_percentage: f64,
}

/// Summarizes tags across a set of resources
#[derive(Debug, Default, Clone)]
pub struct TagDiscovery {
    tag_metadata: HashMap<String, TagMetadata>,
    total_resources: usize,
    tagged_resource_count: usize,
}

impl TagDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the summary from `resources`
    pub fn discover_tags(&mut self, resources: &[OwnedResource]) {
        self.tag_metadata.clear();
        self.total_resources = resources.len();
        self.tagged_resource_count = 0;

        for owned in resources {
            if !owned.resource.has_tags() {
                continue;
            }
            self.tagged_resource_count += 1;

            // Tag maps have unique keys, so each key counts once per resource
            for (key, value) in owned.resource.tag_pairs() {
                let metadata = self
                    .tag_metadata
                    .entry(key.to_string())
                    .or_insert_with(|| TagMetadata::new(key.to_string()));
                metadata.values.insert(value.to_string());
                metadata.resource_count += 1;
            }
        }

        tracing::info!(
            "Tag discovery complete: {} unique tag keys, {} tagged resources of {} total",
            self.tag_metadata.len(),
            self.tagged_resource_count,
            self.total_resources
        );
    }

    pub fn get_tag_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tag_metadata.keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn get_tag_metadata(&self, key: &str) -> Option<&TagMetadata> {
        self.tag_metadata.get(key)
    }

    /// Tag values for a key, alphabetical
    pub fn get_tag_values(&self, key: &str) -> Vec<String> {
        self.tag_metadata
            .get(key)
            .map(|metadata| metadata.values.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys ordered by how many resources carry them, ties alphabetical
    pub fn get_tag_keys_by_popularity(&self) -> Vec<(String, usize)> {
        let mut keys: Vec<(String, usize)> = self
            .tag_metadata
            .values()
            .map(|metadata| (metadata.key.clone(), metadata.resource_count))
            .collect();
        keys.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        keys
    }

    /// Metadata for every key, ordered by popularity
    pub fn get_all_metadata(&self) -> Vec<&TagMetadata> {
        self.get_tag_keys_by_popularity()
            .iter()
            .filter_map(|(key, _)| self.tag_metadata.get(key))
            .collect()
    }

    pub fn tag_coverage_percentage(&self) -> f64 {
        if self.total_resources == 0 {
            return 0.0;
        }
        (self.tagged_resource_count as f64 / self.total_resources as f64) * 100.0
    }

    pub fn get_overall_stats(&self) -> OverallTagStats {
        OverallTagStats {
            total_resources: self.total_resources,
            tagged_resources: self.tagged_resource_count,
            untagged_resources: self.total_resources - self.tagged_resource_count,
            unique_keys: self.tag_metadata.len(),
            coverage_percentage: self.tag_coverage_percentage(),
        }
    }
}
