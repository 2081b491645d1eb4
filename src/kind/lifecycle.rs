/// Reuse-or-create lifecycle of the kind test cluster
use std::path::{Component, Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use super::client::KindClient;
use crate::config::{HarnessConfig, ENV_KUBECONFIG};
use crate::error::{Error, Result};
use crate::k8s::{KubeConfigSummary, ResourceManager};
use crate::registry::RegistryManager;
use crate::template::{detect_host_ip, render_cluster_config, render_registry_manifest};
use crate::tools::Toolchain;

/// Whether the named cluster exists, as far as kind can tell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterState {
    Absent,
    Present { kubeconfig: String },
}

/// What `ensure_cluster` does for a given state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAction {
    Adopt { kubeconfig: String },
    Create,
}

impl ClusterState {
    pub fn plan(self) -> ClusterAction {
        match self {
            ClusterState::Present { kubeconfig } => ClusterAction::Adopt { kubeconfig },
            ClusterState::Absent => ClusterAction::Create,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, ClusterState::Present { .. })
    }
}

/// Result of `status`
#[derive(Debug, Clone)]
pub struct ClusterStatus {
    pub name: String,
    pub state: ClusterState,
    pub summary: Option<KubeConfigSummary>,
}

/// Rendered kind config on disk, removed when dropped
struct RenderedConfig {
    path: PathBuf,
}

impl RenderedConfig {
    async fn write(path: &Path, contents: &str) -> Result<Self> {
        write_private(path, contents).await?;
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for RenderedConfig {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Could not remove {}: {}", self.path.display(), e);
            }
        }
    }
}

/// Drives create, reuse and delete of the test cluster
pub struct ClusterController {
    config: HarnessConfig,
    tools: Toolchain,
}

impl ClusterController {
    /// Create a new controller
    pub fn new(config: HarnessConfig, tools: Toolchain) -> Self {
        Self { config, tools }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    fn registry(&self) -> RegistryManager {
        RegistryManager::new(self.tools.docker(), self.config.registry.clone())
    }

    /// Make sure the test cluster and registry are up, reusing what exists
    pub async fn ensure_cluster(&self) -> Result<ClusterAction> {
        self.tools.kubectl().await?;

        let action = self.probe_cluster().await.plan();
        match &action {
            ClusterAction::Adopt { kubeconfig } => self.adopt_cluster(kubeconfig).await?,
            ClusterAction::Create => self.create_cluster().await?,
        }

        self.registry().start().await?;
        Ok(action)
    }

    /// Ask kind for the cluster's kube-config; any failure means absent
    pub async fn probe_cluster(&self) -> ClusterState {
        let Some(kind) = self.tools.find_kind() else {
            debug!("kind is not installed, treating cluster as absent");
            return ClusterState::Absent;
        };

        match KindClient::new(kind)
            .get_kubeconfig(&self.config.cluster_name)
            .await
        {
            Ok(kubeconfig) if !kubeconfig.trim().is_empty() => {
                ClusterState::Present { kubeconfig }
            }
            Ok(_) => ClusterState::Absent,
            Err(e) => {
                debug!("Cluster {} not available: {}", self.config.cluster_name, e);
                ClusterState::Absent
            }
        }
    }

    /// Point this project at an existing cluster
    pub async fn adopt_cluster(&self, kubeconfig: &str) -> Result<()> {
        info!("Reusing existing kind cluster {}", self.config.cluster_name);

        let target = &self.config.kubeconfig_path;
        if let Some(advice) =
            kubeconfig_advisory(self.config.previous_kubeconfig.as_deref(), target)
        {
            warn!("{}", advice);
        }

        write_private(target, kubeconfig).await?;
        self.export_kubeconfig();

        Ok(())
    }

    /// Create the cluster from the rendered kind config
    pub async fn create_cluster(&self) -> Result<()> {
        let kind = self.tools.kind().await?;
        self.registry().restart().await?;

        let host_ip = detect_host_ip()?
            .map(|ip| ip.to_string())
            .unwrap_or_default();

        self.export_kubeconfig();
        let template = self.config.template_source()?;
        let rendered = render_cluster_config(&template, &host_ip)?;

        {
            let config_file =
                RenderedConfig::write(&self.config.kind_config_path, &rendered).await?;
            KindClient::new(kind)
                .create_cluster(
                    &self.config.cluster_name,
                    config_file.path(),
                    &self.config.kubeconfig_path,
                    &self.config.registry.network,
                )
                .await?;
        }

        // Document the local registry
        let manifest = render_registry_manifest(self.config.registry.port)?;
        let kubectl = self.tools.kubectl().await?;
        ResourceManager::new(kubectl, self.config.kubeconfig_path.clone())
            .apply_manifest(&manifest)
            .await
    }

    /// Delete the cluster
    pub async fn delete_cluster(&self) -> Result<()> {
        let kind = self.tools.kind().await?;
        KindClient::new(kind)
            .delete_cluster(&self.config.cluster_name, &self.config.kubeconfig_path)
            .await
    }

    /// Report whether the cluster exists and where its API server is
    pub async fn status(&self) -> ClusterStatus {
        let state = self.probe_cluster().await;
        let summary = match &state {
            ClusterState::Present { kubeconfig } => KubeConfigSummary::parse(kubeconfig),
            ClusterState::Absent => None,
        };

        ClusterStatus {
            name: self.config.cluster_name.clone(),
            state,
            summary,
        }
    }

    fn export_kubeconfig(&self) {
        std::env::set_var(ENV_KUBECONFIG, &self.config.kubeconfig_path);
    }
}

/// Write a file only the owner can read, since it may hold cluster credentials
async fn write_private(path: &Path, contents: &str) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o600);

    let mut file = options
        .open(path)
        .await
        .map_err(|e| Error::file_write(path, e))?;

    // mode only applies on creation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        file.set_permissions(std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| Error::file_write(path, e))?;
    }

    file.write_all(contents.as_bytes())
        .await
        .map_err(|e| Error::file_write(path, e))?;
    file.flush().await.map_err(|e| Error::file_write(path, e))
}

/// Absolute form of `path` with `.` and `..` resolved lexically
fn normalize(path: &Path) -> Option<PathBuf> {
    let absolute = std::path::absolute(path).ok()?;
    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    Some(normalized)
}

/// Message telling the operator to repoint KUBECONFIG, if it is elsewhere
fn kubeconfig_advisory(previous: Option<&str>, target: &Path) -> Option<String> {
    let previous = previous.and_then(|p| normalize(Path::new(p)));
    if previous.is_some() && previous == normalize(target) {
        return None;
    }

    Some(format!(
        "ATTENTION! You should set your KUBECONFIG to match the cluster used by this project\n\n\texport KUBECONFIG={}\n",
        target.display()
    ))
}
