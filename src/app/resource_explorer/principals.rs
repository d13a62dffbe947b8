//! Principal ID → display name resolution via the directory API.
//!
//! The identity running the dashboard may not be allowed to read the
//! directory. Resolution therefore never fails: on any error it returns
//! [`PrincipalResolution::Unavailable`], whose lookup map is empty, and the
//! caller falls back to showing raw principal IDs.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::arm_client::ArmClient;
use super::errors::DashError;
use super::state::{PrincipalRecord, PrincipalType};
use crate::app::azure_identity::TokenScope;

/// Directory limit on IDs per `getByIds` request
pub const MAX_IDS_PER_REQUEST: usize = 1000;

const DIRECTORY_OBJECT_TYPES: [&str; 4] = ["user", "group", "servicePrincipal", "device"];

#[derive(Debug, Serialize)]
struct GetByIdsRequest<'a> {
    ids: &'a [String],
    types: &'a [&'a str],
}

#[derive(Debug, Deserialize)]
struct GetByIdsResponse {
    #[serde(default)]
    value: Vec<DirectoryObject>,
}

#[derive(Debug, Deserialize)]
struct DirectoryObject {
    id: String,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
    #[serde(default, rename = "@odata.type")]
    odata_type: Option<String>,
}

impl From<DirectoryObject> for PrincipalRecord {
    fn from(object: DirectoryObject) -> Self {
        PrincipalRecord {
            id: object.id,
            display_name: object.display_name,
            principal_type: object.odata_type.as_deref().map(PrincipalType::from_odata_type),
        }
    }
}

/// Outcome of a principal lookup
#[derive(Debug, Clone, PartialEq)]
pub enum PrincipalResolution {
    Resolved(HashMap<String, PrincipalRecord>),
    /// Lookup failed; names degrade to raw IDs
    Unavailable { reason: String },
}

impl PrincipalResolution {
    pub fn empty() -> Self {
        PrincipalResolution::Resolved(HashMap::new())
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self, PrincipalResolution::Unavailable { .. })
    }

    /// Lookup map; empty when resolution was unavailable
    pub fn principals(&self) -> &HashMap<String, PrincipalRecord> {
        static EMPTY: once_cell::sync::Lazy<HashMap<String, PrincipalRecord>> =
            once_cell::sync::Lazy::new(HashMap::new);
        match self {
            PrincipalResolution::Resolved(map) => map,
            PrincipalResolution::Unavailable { .. } => &EMPTY,
        }
    }

    pub fn into_principals(self) -> HashMap<String, PrincipalRecord> {
        match self {
            PrincipalResolution::Resolved(map) => map,
            PrincipalResolution::Unavailable { .. } => HashMap::new(),
        }
    }

    pub fn display_name(&self, principal_id: &str) -> Option<&str> {
        self.principals()
            .get(principal_id)
            .and_then(|record| record.display_name.as_deref())
    }
}

/// Deduplicate preserving first-seen order
pub fn dedupe_ids<I, S>(ids: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    ids.into_iter()
        .filter_map(|id| {
            let id = id.as_ref();
            (!id.is_empty() && seen.insert(id.to_string())).then(|| id.to_string())
        })
        .collect()
}

pub struct PrincipalResolver<'a> {
    client: &'a ArmClient,
}

impl<'a> PrincipalResolver<'a> {
    pub fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    /// Resolve principal IDs to directory records. Never fails.
    pub async fn resolve<I, S>(&self, ids: I) -> PrincipalResolution
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = dedupe_ids(ids);
        if ids.is_empty() {
            return PrincipalResolution::empty();
        }

        match self.fetch(&ids).await {
            Ok(principals) => {
                debug!("Resolved {} of {} principals", principals.len(), ids.len());
                PrincipalResolution::Resolved(principals)
            }
            Err(e) => {
                warn!(
                    "Directory lookup for {} principals failed, showing raw IDs: {}",
                    ids.len(),
                    e
                );
                PrincipalResolution::Unavailable {
                    reason: e.user_message(),
                }
            }
        }
    }

    async fn fetch(&self, ids: &[String]) -> Result<HashMap<String, PrincipalRecord>, DashError> {
        let url = format!("{}/v1.0/directoryObjects/getByIds", self.client.graph_endpoint());
        let mut principals = HashMap::with_capacity(ids.len());

        for chunk in ids.chunks(MAX_IDS_PER_REQUEST) {
            let request = GetByIdsRequest {
                ids: chunk,
                types: &DIRECTORY_OBJECT_TYPES,
            };
            let response: GetByIdsResponse = self
                .client
                .post_json(&url, TokenScope::Directory, &request)
                .await?;

            principals.extend(
                response
                    .value
                    .into_iter()
                    .map(|object| (object.id.clone(), PrincipalRecord::from(object))),
            );
        }

        Ok(principals)
    }
}
