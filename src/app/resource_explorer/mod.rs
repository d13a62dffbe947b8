//! Resource and owner discovery across Azure subscriptions.
//!
//! - [`arm_client`] fetches paginated collections from Resource Manager and Graph
//! - [`role_assignments`] and [`principals`] find Owner assignments and name them
//! - [`owners`] joins both onto the resource list
//! - [`query_engine`] runs the above across subscriptions
//! - [`deletion`] deletes a resource, probing API versions from [`api_versions`]

pub mod api_versions;
pub mod arm_client;
pub mod deletion;
pub mod errors;
pub mod owners;
pub mod principals;
pub mod query_engine;
pub mod resource_id;
pub mod role_assignments;
pub mod state;
pub mod tag_discovery;

pub use api_versions::ApiVersionTable;
pub use arm_client::ArmClient;
pub use deletion::{DeleteOutcome, DeletionOrchestrator};
pub use errors::{ApiError, DashError, DeleteError};
pub use owners::{aggregate_owners, OwnerIndex};
pub use principals::{PrincipalResolution, PrincipalResolver};
pub use query_engine::{FailurePolicy, QueryEngine, QueryOutcome, QueryReport, QueryWarning};
pub use resource_id::{resource_group_from_id, subscription_id_from_id};
pub use role_assignments::{filter_owner_assignments, list_owner_assignments};
pub use state::{
    DashboardState, OwnedResource, PrincipalRecord, PrincipalType, ResourceRecord, RoleAssignment,
    Subscription, Tenant,
};
pub use tag_discovery::TagDiscovery;
