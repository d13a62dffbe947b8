#![warn(clippy::all, rust_2018_idioms)]

use std::path::PathBuf;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::prelude::*;

use azdash::app::azure_identity::provider_from_config;
use azdash::app::config::DashConfig;
use azdash::app::resource_explorer::{
    ApiVersionTable, ArmClient, DashboardState, DeletionOrchestrator, FailurePolicy,
    OwnedResource, QueryEngine, TagDiscovery,
};

const DEFAULT_LOG_FILTER: &str = "azdash=info,reqwest=warn,hyper=warn";
const VERBOSE_LOG_FILTER: &str = "azdash=debug,reqwest=info,hyper=warn";

#[derive(Parser, Debug)]
#[command(
    name = "azdash",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_BRANCH"), "@", env!("GIT_COMMIT"), ")"),
    about = "List Azure resources with their owners, and delete them"
)]
struct Cli {
    /// Config file (default: platform config dir/azdash.toml)
    #[arg(long, global = true, env = "AZDASH_CONFIG")]
    config: Option<PathBuf>,

    /// Print JSON instead of tables
    #[arg(long, global = true)]
    json: bool,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone)]
struct QueryArgs {
    /// Subscription to query; repeat for several (default: config, then all enabled)
    #[arg(short, long = "subscription")]
    subscriptions: Vec<String>,

    /// Restrict to one resource group (requires exactly one subscription)
    #[arg(short = 'g', long)]
    resource_group: Option<String>,

    /// Keep going when a subscription fails
    #[arg(long)]
    isolate_failures: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List accessible subscriptions
    Subscriptions,
    /// List accessible tenants
    Tenants,
    /// List resources with their owners
    Resources(QueryArgs),
    /// Summarize tags across resources
    Tags(QueryArgs),
    /// Delete a resource by ID
    Delete {
        /// Full resource ID, e.g. /subscriptions/.../resourceGroups/rg/providers/...
        resource_id: String,
    },
}

fn init_logging() {
    let Some(proj_dirs) = directories::ProjectDirs::from("com", "", "azdash") else {
        return;
    };

    let log_dir = proj_dirs.data_dir().join("logs");
    let _ = std::fs::create_dir_all(&log_dir);
    let log_path = log_dir.join("azdash.log");

    let file = match std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Logging disabled, cannot open {}: {}", log_path.display(), e);
            return;
        }
    };

    // Set restrictive permissions (owner read/write only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = file.metadata() {
            let mut perms = metadata.permissions();
            perms.set_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&log_path, perms) {
                eprintln!("[SECURITY] Failed to set log file permissions: {}", e);
            }
        }
    }

    // RUST_LOG wins over the built-in filter
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(DEFAULT_LOG_FILTER)
    });
    let (filter, reload_handle) = tracing_subscriber::reload::Layer::new(filter);

    let subscriber = tracing_subscriber::registry().with(filter).with(
        tracing_subscriber::fmt::layer()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false),
    );

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return;
    }

    // reqwest 0.11 logs through the `log` crate
    if let Err(e) = tracing_log::LogTracer::init() {
        eprintln!("Failed to initialize log-to-tracing bridge: {}", e);
    }

    azdash::set_tracing_reload_handle(reload_handle);
    tracing::info!("Logging initialized to: {:?}", log_path);
}

fn panic_message(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    match info.location() {
        Some(at) => format!("{} at {}:{}:{}", message, at.file(), at.line(), at.column()),
        None => message.to_string(),
    }
}

/// Append panics to `<data_dir>/logs/crash.log` and echo them to stderr
fn setup_panic_handler() {
    std::panic::set_hook(Box::new(|info| {
        let report = format!(
            "azdash panicked: {}\n{}",
            panic_message(info),
            std::backtrace::Backtrace::force_capture()
        );
        eprintln!("\n{}", report);

        let Some(dirs) = directories::ProjectDirs::from("com", "", "azdash") else {
            return;
        };
        let crash_log = dirs.data_dir().join("logs").join("crash.log");
        let written = crash_log
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| {
                std::fs::OpenOptions::new()
                    .append(true)
                    .create(true)
                    .open(&crash_log)
            })
            .and_then(|mut file| {
                use std::io::Write;
                writeln!(file, "\n=== {} ===\n{}", chrono::Local::now().to_rfc3339(), report)
            });
        if written.is_ok() {
            eprintln!("Crash report appended to {}", crash_log.display());
        }
    }));
}

fn main() -> anyhow::Result<()> {
    setup_panic_handler();

    let cli = Cli::parse();
    init_logging();
    if cli.verbose {
        if let Err(e) = azdash::set_log_filter(VERBOSE_LOG_FILTER) {
            eprintln!("Verbose logging unavailable: {}", e);
        }
    }
    tracing::info!("azdash {} starting: {:?}", env!("CARGO_PKG_VERSION"), cli.command);

    let config = DashConfig::load(cli.config.as_deref())?;

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let result = runtime.block_on(run(cli, config));
    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}

async fn run(cli: Cli, config: DashConfig) -> anyhow::Result<()> {
    let http = config.http_client()?;
    let tokens = provider_from_config(http.clone(), &config)?;
    let client = ArmClient::new(http, tokens, &config);

    match cli.command {
        Command::Subscriptions => {
            let subscriptions = client
                .list_subscriptions()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&subscriptions)?);
            } else {
                println!("{:<38} {:<10} NAME", "SUBSCRIPTION ID", "STATE");
                for subscription in &subscriptions {
                    println!(
                        "{:<38} {:<10} {}",
                        subscription.subscription_id,
                        subscription.state.as_deref().unwrap_or("-"),
                        subscription.display_name
                    );
                }
            }
        }
        Command::Tenants => {
            let tenants = client
                .list_tenants()
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message()))?;
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&tenants)?);
            } else {
                println!("{:<38} {:<30} DOMAIN", "TENANT ID", "NAME");
                for tenant in &tenants {
                    println!(
                        "{:<38} {:<30} {}",
                        tenant.tenant_id,
                        tenant.display_name.as_deref().unwrap_or("-"),
                        tenant.default_domain.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Command::Resources(args) => {
            let state = query(client, &config, &args).await?;
            print_warnings(&state);
            if cli.json {
                let body = serde_json::json!({
                    "resources": state.resources(),
                    "warnings": state.warnings(),
                    "lastUpdated": state.last_updated(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                print_resources(state.resources());
            }
        }
        Command::Tags(args) => {
            let state = query(client, &config, &args).await?;
            print_warnings(&state);

            let mut discovery = TagDiscovery::new();
            discovery.discover_tags(state.resources());
            if cli.json {
                let body = serde_json::json!({
                    "stats": discovery.get_overall_stats(),
                    "tags": discovery.get_all_metadata(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                let stats = discovery.get_overall_stats();
                println!(
                    "{} of {} resources tagged ({:.1}%), {} keys",
                    stats.tagged_resources,
                    stats.total_resources,
                    stats.coverage_percentage,
                    stats.unique_keys
                );
                for metadata in discovery.get_all_metadata() {
                    let values: Vec<&str> = metadata.values.iter().map(String::as_str).collect();
                    println!(
                        "{:<30} {:>5}  {}",
                        metadata.key,
                        metadata.resource_count,
                        values.join(", ")
                    );
                }
            }
        }
        Command::Delete { resource_id } => {
            let versions = ApiVersionTable::with_overrides(&config.api_versions);
            let outcome = DeletionOrchestrator::new(&client, &versions)
                .delete(&resource_id)
                .await
                .map_err(|e| {
                    tracing::warn!("Delete failed ({}): {}", e.short_label(), e);
                    anyhow::anyhow!(e.user_message())
                })?;

            if cli.json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else if outcome.is_pending() {
                println!(
                    "Deletion of {} accepted (api-version {}), it will finish in the background",
                    resource_id,
                    outcome.api_version()
                );
            } else {
                println!("Deleted {} (api-version {})", resource_id, outcome.api_version());
            }
        }
    }

    Ok(())
}

/// Resolve the subscription selection and run the query into a fresh state
async fn query(
    client: ArmClient,
    config: &DashConfig,
    args: &QueryArgs,
) -> anyhow::Result<DashboardState> {
    let mut state = DashboardState::new();
    let policy = if args.isolate_failures {
        FailurePolicy::IsolateSubscriptions
    } else {
        config.failure_policy
    };
    let engine = QueryEngine::new(client, policy);

    let subscriptions = if !args.subscriptions.is_empty() {
        args.subscriptions.clone()
    } else if !config.subscriptions.is_empty() {
        config.subscriptions.clone()
    } else {
        let subscriptions = engine
            .client()
            .list_subscriptions()
            .await
            .map_err(|e| anyhow::anyhow!(e.user_message()))?;
        state.set_subscriptions(subscriptions);
        state.select_all();
        state.selected_subscriptions()
    };

    if subscriptions.is_empty() {
        anyhow::bail!("no subscriptions to query");
    }

    let outcome = match &args.resource_group {
        Some(resource_group) => {
            let [subscription_id] = subscriptions.as_slice() else {
                anyhow::bail!("--resource-group needs exactly one --subscription");
            };
            engine
                .query_resource_group(subscription_id, resource_group)
                .await
        }
        None => engine.query(&subscriptions).await,
    };

    let outcome = outcome.map_err(|e| anyhow::anyhow!(e.user_message()))?;
    state.record_outcome(outcome);

    Ok(state)
}

fn print_warnings(state: &DashboardState) {
    for warning in state.warnings() {
        eprintln!("warning: {}", warning);
    }
}

fn print_resources(resources: &[OwnedResource]) {
    println!(
        "{:<40} {:<45} {:<25} OWNERS",
        "NAME", "TYPE", "RESOURCE GROUP"
    );
    for owned in resources {
        let owners = if owned.owners.is_empty() {
            "-".to_string()
        } else {
            owned.owners.join(", ")
        };
        println!(
            "{:<40} {:<45} {:<25} {}",
            owned.resource.name,
            owned.resource.resource_type,
            owned.resource_group.as_deref().unwrap_or("-"),
            owners
        );
    }
    println!("{} resources", resources.len());
}
