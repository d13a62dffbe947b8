//! Azure Dash - resource and owner dashboard for Azure subscriptions
//!
//! Lists every resource across the selected subscriptions together with the
//! principals holding the built-in Owner role on it, and deletes resources
//! without the caller having to know which API version the resource
//! provider accepts.
//!
//! # Architecture Overview
//!
//! - **Configuration** ([`app::config`]): TOML file plus environment overrides
//! - **Identity** ([`app::azure_identity`]): token providers behind one trait
//! - **Discovery** ([`app::resource_explorer`]): paginated Resource Manager
//!   reads, Owner assignment filtering, directory lookups and the owner join
//! - **Deletion** ([`app::resource_explorer::deletion`]): API-version probing
//!   with classified failures
//!
//! The `azdash` binary is a thin command-line front end over [`app`].

#![warn(clippy::all, rust_2018_idioms)]

// Include logging macros first
#[macro_use]
pub mod logging_macros;

pub mod app;

use once_cell::sync::OnceCell;
use tracing_subscriber::{reload, EnvFilter, Registry};

pub type TracingReloadHandle = reload::Handle<EnvFilter, Registry>;

static TRACING_RELOAD_HANDLE: OnceCell<TracingReloadHandle> = OnceCell::new();

/// Store the filter handle created at logging start-up. Only the first call wins.
pub fn set_tracing_reload_handle(handle: TracingReloadHandle) {
    if TRACING_RELOAD_HANDLE.set(handle).is_err() {
        tracing::warn!("Tracing reload handle already set");
    }
}

/// Swap the active log filter, e.g. `"azdash=debug"`
pub fn set_log_filter(directives: &str) -> anyhow::Result<()> {
    let handle = TRACING_RELOAD_HANDLE
        .get()
        .ok_or_else(|| anyhow::anyhow!("logging has not been initialized"))?;
    let filter = EnvFilter::builder().parse(directives)?;
    handle.reload(filter)?;
    tracing::info!("Log filter changed to {}", directives);
    Ok(())
}
