//! Core modules for Azure Dash.
//!
//! - [`config`] loads settings from `azdash.toml` and `AZDASH_*` variables
//! - [`azure_identity`] supplies bearer tokens for Resource Manager and Graph
//! - [`resource_explorer`] queries resources, owners and deletes resources

pub mod azure_identity;
pub mod config;
pub mod resource_explorer;
