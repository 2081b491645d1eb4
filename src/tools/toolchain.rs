/// Resolved locations of the external tools a lifecycle operation runs
use std::path::PathBuf;

use super::installer::{Tool, ToolInstaller};
use crate::error::Result;

/// kind, kubectl and docker as kindup will invoke them
///
/// kind and kubectl are installed on demand unless pinned to a path.
/// docker is never installed.
#[derive(Clone)]
pub struct Toolchain {
    installer: ToolInstaller,
    kind: Option<PathBuf>,
    kubectl: Option<PathBuf>,
    docker: PathBuf,
}

impl Toolchain {
    pub fn new(installer: ToolInstaller) -> Self {
        Self {
            installer,
            kind: None,
            kubectl: None,
            docker: PathBuf::from("docker"),
        }
    }

    /// Always run kind from `path`
    #[allow(dead_code)]
    pub fn with_kind(mut self, path: PathBuf) -> Self {
        self.kind = Some(path);
        self
    }

    /// Always run kubectl from `path`
    #[allow(dead_code)]
    pub fn with_kubectl(mut self, path: PathBuf) -> Self {
        self.kubectl = Some(path);
        self
    }

    /// Run docker from `path` instead of PATH
    #[allow(dead_code)]
    pub fn with_docker(mut self, path: PathBuf) -> Self {
        self.docker = path;
        self
    }

    /// kind, installing it first if needed
    pub async fn kind(&self) -> Result<PathBuf> {
        self.resolve(Tool::Kind).await
    }

    /// kubectl, installing it first if needed
    pub async fn kubectl(&self) -> Result<PathBuf> {
        self.resolve(Tool::Kubectl).await
    }

    pub fn docker(&self) -> PathBuf {
        self.docker.clone()
    }

    /// kind without installing it, `None` when it is nowhere to be found
    pub fn find_kind(&self) -> Option<PathBuf> {
        self.kind
            .clone()
            .or_else(|| self.installer.locate(Tool::Kind))
    }

    async fn resolve(&self, tool: Tool) -> Result<PathBuf> {
        let pinned = match tool {
            Tool::Kind => &self.kind,
            Tool::Kubectl => &self.kubectl,
        };

        match pinned {
            Some(path) => Ok(path.clone()),
            None => self.installer.ensure_installed(tool).await,
        }
    }
}
