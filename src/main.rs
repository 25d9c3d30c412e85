//! chaosctl - inspect and clean up Chaos Mesh experiments

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use chaos_harness::client::{ChaosApi, KubeChaosClient};
use chaos_harness::config::ChaosConfig;
use chaos_harness::controller::cleanup_orphaned;
use chaos_harness::crd::ResourceKind;
use chaos_harness::manager::{status_of, ChaosManager};
use chaos_harness::telemetry;

/// chaosctl - inspect and clean up Chaos Mesh experiments
#[derive(Parser, Debug)]
#[command(name = "chaosctl", version, about, long_about = None)]
struct Cli {
    /// Kubeconfig to use when not running in-cluster
    #[arg(long, global = true, env = "KUBECONFIG_PATH")]
    kubeconfig: Option<PathBuf>,

    /// YAML config file; CHAOS_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print an experiment's status as JSON
    Status {
        /// Chaos kind (e.g. PodChaos, networkchaos)
        kind: ResourceKind,
        /// Experiment name
        name: String,
        /// Namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,
    },

    /// Delete an experiment
    Delete {
        /// Chaos kind (e.g. PodChaos, networkchaos)
        kind: ResourceKind,
        /// Experiment name
        name: String,
        /// Namespace
        #[arg(short, long, default_value = "default")]
        namespace: String,
        /// Wait until the resource is gone
        #[arg(long)]
        wait: bool,
    },

    /// Delete experiments left behind by crashed runs
    Cleanup {
        /// Namespace to sweep
        #[arg(short, long, default_value = "default")]
        namespace: String,
        /// Only consider experiments matching this label selector
        #[arg(short = 'l', long)]
        selector: Option<String>,
        /// List what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    telemetry::init_logging(cli.json_logs)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    let mut config = match &cli.config {
        Some(path) => ChaosConfig::from_file(path)?,
        None => ChaosConfig::default(),
    }
    .with_overrides(|key| std::env::var(key).ok())?;
    if cli.kubeconfig.is_some() {
        config.kubeconfig_path = cli.kubeconfig.clone();
    }

    let client = KubeChaosClient::connect(config).await?;

    match cli.command {
        Commands::Status {
            kind,
            name,
            namespace,
        } => run_status(&client, kind, &namespace, &name).await,
        Commands::Delete {
            kind,
            name,
            namespace,
            wait,
        } => run_delete(client, kind, &namespace, &name, wait).await,
        Commands::Cleanup {
            namespace,
            selector,
            dry_run,
        } => {
            let count = cleanup_orphaned(&client, &namespace, selector.as_deref(), dry_run).await;
            if dry_run {
                println!("{count} orphaned experiment(s) would be deleted");
            } else {
                println!("{count} orphaned experiment(s) deleted");
            }
            Ok(())
        }
    }
}

async fn run_status(
    client: &KubeChaosClient,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
) -> anyhow::Result<()> {
    let obj = client.get(kind, namespace, name).await?;
    let status = status_of(&obj)?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

async fn run_delete(
    client: KubeChaosClient,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    wait: bool,
) -> anyhow::Result<()> {
    let config = client.config().clone();
    let manager = ChaosManager::new(Arc::new(client), config);

    // Selector of the live resource, reported if the wait times out
    let selector = match manager.client().get(kind, namespace, name).await {
        Ok(obj) => obj.data["spec"]["selector"].to_string(),
        Err(e) if e.is_not_found() => {
            println!("{kind}/{name} not found in {namespace}");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    manager.client().delete(kind, namespace, name).await?;
    if wait {
        manager
            .wait_until_gone(kind, namespace, name, &selector, None, None)
            .await?;
    }

    println!("{kind}/{name} deleted");
    Ok(())
}
