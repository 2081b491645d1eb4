/// Generic Kubernetes resource operations
use std::path::PathBuf;

use tracing::info;

use crate::error::Result;
use crate::utils::command::CommandBuilder;

/// Applies manifests against one cluster
pub struct ResourceManager {
    kubectl: PathBuf,
    kubeconfig_path: PathBuf,
}

impl ResourceManager {
    pub fn new(kubectl: PathBuf, kubeconfig_path: PathBuf) -> Self {
        Self {
            kubectl,
            kubeconfig_path,
        }
    }

    /// Apply a manifest piped through stdin
    pub async fn apply_manifest(&self, manifest: &str) -> Result<()> {
        info!("Applying Kubernetes manifest");

        let stdout = CommandBuilder::new(&self.kubectl)
            .args(["apply", "-f", "-"])
            .kubeconfig(&self.kubeconfig_path)
            .stdin(manifest)
            .run()
            .await?;

        info!("{}", stdout.trim());

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::utils::testing::{fake_tool, read_log};
    use serial_test::serial;

    #[tokio::test]
    #[serial]
    async fn test_apply_pipes_manifest_with_kubeconfig() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("kubectl.log");
        let kubectl = fake_tool(
            dir.path(),
            "kubectl",
            &format!(
                r#"echo "$* KUBECONFIG=$KUBECONFIG" >> {log}
cat >> {log}
echo "configmap/local-registry-hosting created""#,
                log = log.display()
            ),
        );

        ResourceManager::new(kubectl, PathBuf::from("/work/kind.config"))
            .apply_manifest("kind: ConfigMap\n")
            .await
            .unwrap();

        assert_eq!(
            read_log(&log),
            "apply -f - KUBECONFIG=/work/kind.config\nkind: ConfigMap\n"
        );
    }

    #[tokio::test]
    #[serial]
    async fn test_apply_failure() {
        let dir = tempfile::tempdir().unwrap();
        let kubectl = fake_tool(
            dir.path(),
            "kubectl",
            "cat > /dev/null; echo 'connection refused' >&2; exit 1",
        );

        let err = ResourceManager::new(kubectl, PathBuf::from("/work/kind.config"))
            .apply_manifest("kind: ConfigMap\n")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
