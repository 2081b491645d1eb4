/// kind CLI operations
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::Result;
use crate::utils::command::CommandBuilder;

/// Tells kind which docker network the node containers join
pub const KIND_NETWORK_ENV: &str = "KIND_EXPERIMENTAL_DOCKER_NETWORK";

/// Kind client for cluster operations
pub struct KindClient {
    kind: PathBuf,
}

impl KindClient {
    /// Create a new kind client running the given binary
    pub fn new(kind: PathBuf) -> Self {
        Self { kind }
    }

    /// Fetch the kube-config of a running cluster
    pub async fn get_kubeconfig(&self, name: &str) -> Result<String> {
        CommandBuilder::new(&self.kind)
            .args(["get", "kubeconfig", "--name", name])
            .run()
            .await
    }

    /// Create a cluster from a rendered config, writing its kube-config to `kubeconfig_path`
    pub async fn create_cluster(
        &self,
        name: &str,
        config_path: &Path,
        kubeconfig_path: &Path,
        network: &str,
    ) -> Result<()> {
        info!("Creating kind cluster {} on network {}", name, network);

        CommandBuilder::new(&self.kind)
            .args(["create", "cluster", "--name", name, "--config"])
            .arg(config_path)
            .arg("--kubeconfig")
            .arg(kubeconfig_path)
            .env(KIND_NETWORK_ENV, network)
            .run_silent()
            .await?;

        info!("Kind cluster {} created", name);
        Ok(())
    }

    /// Delete a cluster by name, pruning its context from `kubeconfig_path`
    pub async fn delete_cluster(&self, name: &str, kubeconfig_path: &Path) -> Result<()> {
        info!("Deleting kind cluster {}", name);

        CommandBuilder::new(&self.kind)
            .args(["delete", "cluster", "--name", name, "--kubeconfig"])
            .arg(kubeconfig_path)
            .run_silent()
            .await
    }
}
