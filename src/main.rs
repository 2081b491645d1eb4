/// kindup - local kind clusters for integration tests
///
/// Creates or reuses a kind cluster wired to a local docker registry, and keeps
/// its kube-config at a fixed path next to the project.
mod config;
mod error;
mod k8s;
mod kind;
mod registry;
mod template;
mod tools;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::HarnessConfig;
use crate::kind::{ClusterAction, ClusterController};
use crate::tools::{Tool, ToolInstaller, Toolchain};

#[derive(Parser)]
#[command(name = "kindup")]
#[command(about = "Provision a local kind cluster and registry for integration tests", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Cluster name (defaults to KIND_NAME, then "kindup")
    #[arg(short, long, global = true)]
    name: Option<String>,

    /// kind config template (defaults to KIND_CFG_TEMPLATE, then the built-in one)
    #[arg(long, global = true)]
    config_template: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Reuse the test cluster if it exists, create it otherwise
    Ensure,

    /// Create the test cluster
    Create,

    /// Delete the test cluster
    Delete,

    /// Show whether the test cluster exists
    Status,

    /// Install a required tool if it is missing
    Install {
        #[arg(value_enum)]
        tool: ToolArg,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ToolArg {
    Kubectl,
    Kind,
}

impl From<ToolArg> for Tool {
    fn from(arg: ToolArg) -> Self {
        match arg {
            ToolArg::Kubectl => Tool::Kubectl,
            ToolArg::Kind => Tool::Kind,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("kindup={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = run(cli).await {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = HarnessConfig::from_env()
        .context("Failed to determine working directory")?
        .with_cluster_name(cli.name)
        .with_template_path(cli.config_template);

    let installer = ToolInstaller::new(config.bin_dir.clone());
    let controller = ClusterController::new(config, Toolchain::new(installer.clone()));

    match cli.command {
        Commands::Ensure => ensure_cluster(&controller).await,
        Commands::Create => create_cluster(&controller).await,
        Commands::Delete => delete_cluster(&controller).await,
        Commands::Status => show_status(&controller).await,
        Commands::Install { tool } => install_tool(&installer, tool.into()).await,
    }
}

/// Ensure the test cluster is up
async fn ensure_cluster(controller: &ClusterController) -> Result<()> {
    let name = &controller.config().cluster_name;

    let action = controller
        .ensure_cluster()
        .await
        .with_context(|| format!("Failed to ensure cluster {}", name))?;

    match action {
        ClusterAction::Adopt { .. } => info!("✓ Using existing cluster {}", name),
        ClusterAction::Create => info!("✓ Created cluster {}", name),
    }
    print_kubeconfig_hint(controller);

    Ok(())
}

/// Create the test cluster
async fn create_cluster(controller: &ClusterController) -> Result<()> {
    let name = &controller.config().cluster_name;
    info!("Creating cluster {}...", name);

    controller
        .create_cluster()
        .await
        .with_context(|| format!("Failed to create cluster {}", name))?;

    info!("✓ Cluster {} created", name);
    print_kubeconfig_hint(controller);

    Ok(())
}

/// Delete the test cluster
async fn delete_cluster(controller: &ClusterController) -> Result<()> {
    let name = &controller.config().cluster_name;

    controller
        .delete_cluster()
        .await
        .with_context(|| format!("Failed to delete cluster {}", name))?;

    info!("✓ Cluster {} deleted", name);
    Ok(())
}

/// Show cluster status
async fn show_status(controller: &ClusterController) -> Result<()> {
    let status = controller.status().await;

    if !status.state.is_present() {
        info!("Cluster {} does not exist", status.name);
        return Ok(());
    }

    info!("Cluster {} is running", status.name);
    if let Some(summary) = &status.summary {
        info!("  Context: {}", summary.current_context);
        info!("  API server: {}", summary.server);
    }

    Ok(())
}

/// Install a tool into the bin directory
async fn install_tool(installer: &ToolInstaller, tool: Tool) -> Result<()> {
    let path = installer
        .ensure_installed(tool)
        .await
        .with_context(|| format!("Failed to install {}", tool))?;

    info!("✓ {} available at {}", tool, path.display());
    if path.starts_with(installer.bin_dir()) {
        info!("Make sure {} is on your PATH", installer.bin_dir().display());
    }

    Ok(())
}

fn print_kubeconfig_hint(controller: &ClusterController) {
    info!("");
    info!("To access your cluster:");
    info!(
        "  export KUBECONFIG={}",
        controller.config().kubeconfig_path.display()
    );
    info!("  kubectl get nodes");
}
