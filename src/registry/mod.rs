/// Local docker registry the test cluster pulls images from
use std::path::PathBuf;

use tracing::info;

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::utils::command::CommandBuilder;

/// What docker knows about the registry container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerState {
    Running,
    Stopped,
    Missing,
}

/// Registry container manager
pub struct RegistryManager {
    docker: PathBuf,
    config: RegistryConfig,
}

impl RegistryManager {
    /// Create a new registry manager
    pub fn new(docker: PathBuf, config: RegistryConfig) -> Self {
        Self { docker, config }
    }

    /// Start the registry if it is not already running
    pub async fn start(&self) -> Result<()> {
        self.ensure_network().await?;

        match self.container_state().await {
            ContainerState::Running => {
                info!("Registry {} is already running", self.config.name);
            }
            ContainerState::Stopped => {
                info!("Starting stopped registry {}", self.config.name);
                CommandBuilder::new(&self.docker)
                    .args(["start", &self.config.name])
                    .run_silent()
                    .await?;
            }
            ContainerState::Missing => self.run_container().await?,
        }

        self.connect_network().await
    }

    /// Remove any existing registry container and start a fresh one
    pub async fn restart(&self) -> Result<()> {
        info!("Restarting registry {}", self.config.name);

        let output = CommandBuilder::new(&self.docker)
            .args(["rm", "-f", &self.config.name])
            .output()
            .await?;
        if !output.success && !output.stderr.contains("No such container") {
            return Err(self.failure(&["rm", "-f", &self.config.name], output.stderr));
        }

        self.ensure_network().await?;
        self.run_container().await?;
        self.connect_network().await
    }

    /// Inspect the registry container, treating any failure as missing
    pub async fn container_state(&self) -> ContainerState {
        let output = CommandBuilder::new(&self.docker)
            .args(["inspect", "-f", "{{.State.Running}}", &self.config.name])
            .output()
            .await;

        match output {
            Ok(out) if out.success && out.stdout.trim() == "true" => ContainerState::Running,
            Ok(out) if out.success => ContainerState::Stopped,
            _ => ContainerState::Missing,
        }
    }

    async fn run_container(&self) -> Result<()> {
        info!(
            "Starting registry {} on localhost:{}",
            self.config.name, self.config.port
        );

        let publish = format!("127.0.0.1:{}:5000", self.config.port);
        CommandBuilder::new(&self.docker)
            .args([
                "run",
                "-d",
                "--restart=always",
                "-p",
                &publish,
                "--name",
                &self.config.name,
                &self.config.image,
            ])
            .run_silent()
            .await
    }

    /// Create the docker network shared with the kind nodes if missing
    async fn ensure_network(&self) -> Result<()> {
        let exists = CommandBuilder::new(&self.docker)
            .args(["network", "inspect", &self.config.network])
            .output()
            .await
            .map(|out| out.success)
            .unwrap_or(false);

        if !exists {
            info!("Creating docker network {}", self.config.network);
            CommandBuilder::new(&self.docker)
                .args(["network", "create", &self.config.network])
                .run_silent()
                .await?;
        }

        Ok(())
    }

    async fn connect_network(&self) -> Result<()> {
        let args = ["network", "connect", &self.config.network, &self.config.name];
        let output = CommandBuilder::new(&self.docker).args(args).output().await?;

        // Already attached is the common case after the first start
        if !output.success && !output.stderr.contains("already exists") {
            return Err(self.failure(&args, output.stderr));
        }

        Ok(())
    }

    fn failure(&self, args: &[&str], stderr: String) -> Error {
        Error::ToolInvocation {
            program: self.docker.display().to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            status: "non-zero exit".to_string(),
            stderr,
        }
    }
}
