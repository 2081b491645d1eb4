/// Configuration for kindup, resolved once from the environment
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::template::DEFAULT_KIND_CONFIG_TEMPLATE;

/// Name of the kind cluster used for testing
pub const DEFAULT_CLUSTER_NAME: &str = "kindup";

/// Relative location of the KUBECONFIG for the test cluster
pub const KUBECONFIG_FILE: &str = "kind.config";

/// Relative location of the rendered kind config, removed after each create
pub const KIND_CONFIG_FILE: &str = "kind.config.yaml";

pub const ENV_CLUSTER_NAME: &str = "KIND_NAME";
pub const ENV_CONFIG_TEMPLATE: &str = "KIND_CFG_TEMPLATE";
pub const ENV_KUBECONFIG: &str = "KUBECONFIG";
pub const ENV_BIN_DIR: &str = "KINDUP_BIN_DIR";

/// Everything the lifecycle operations need, passed explicitly
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Name of the kind cluster to create, reuse or delete
    pub cluster_name: String,

    /// Override for the kind config template, embedded default when unset
    pub template_path: Option<PathBuf>,

    /// Absolute path of the authoritative kube-config
    pub kubeconfig_path: PathBuf,

    /// Absolute path of the transient rendered kind config
    pub kind_config_path: PathBuf,

    /// KUBECONFIG as the operator had it before we ran
    pub previous_kubeconfig: Option<String>,

    /// Where downloaded tools are installed
    pub bin_dir: PathBuf,

    /// Local registry the cluster pulls from
    pub registry: RegistryConfig,
}

/// Local container registry settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Container name, also the hostname nodes use to reach it
    pub name: String,

    /// Port published on localhost
    pub port: u16,

    /// Registry image
    pub image: String,

    /// Docker network shared with the kind nodes
    pub network: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            name: "registry".to_string(),
            port: 5000,
            image: "registry:2".to_string(),
            network: "kindup".to_string(),
        }
    }
}

impl HarnessConfig {
    /// Build the configuration from the process environment and working directory
    pub fn from_env() -> std::io::Result<Self> {
        let work_dir = std::env::current_dir()?;
        Ok(Self::from_lookup(&work_dir, |key| std::env::var(key).ok()))
    }

    /// Build the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(work_dir: &Path, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let bin_dir = non_empty(&lookup, ENV_BIN_DIR)
            .map(PathBuf::from)
            .or_else(|| dirs::home_dir().map(|home| home.join(".local").join("bin")))
            .unwrap_or_else(|| work_dir.join("bin"));

        Self {
            cluster_name: resolve_cluster_name(&lookup),
            template_path: lookup(ENV_CONFIG_TEMPLATE).map(PathBuf::from),
            kubeconfig_path: work_dir.join(KUBECONFIG_FILE),
            kind_config_path: work_dir.join(KIND_CONFIG_FILE),
            previous_kubeconfig: lookup(ENV_KUBECONFIG),
            bin_dir,
            registry: RegistryConfig::default(),
        }
    }

    /// Override the cluster name from the command line
    pub fn with_cluster_name(mut self, name: Option<String>) -> Self {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            self.cluster_name = name;
        }
        self
    }

    /// Override the template path from the command line
    pub fn with_template_path(mut self, path: Option<PathBuf>) -> Self {
        if path.is_some() {
            self.template_path = path;
        }
        self
    }

    /// Contents of the kind config template to render
    pub fn template_source(&self) -> Result<String> {
        match &self.template_path {
            Some(path) => std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
                path: path.clone(),
                source,
            }),
            None => Ok(DEFAULT_KIND_CONFIG_TEMPLATE.to_string()),
        }
    }
}

/// Cluster name from KIND_NAME, or the default when it is unset or empty
pub fn resolve_cluster_name<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    non_empty(&lookup, ENV_CLUSTER_NAME).unwrap_or_else(|| DEFAULT_CLUSTER_NAME.to_string())
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_cluster_name_override() {
        let name = resolve_cluster_name(lookup_from(&[("KIND_NAME", "test-create-cluster")]));
        assert_eq!(name, "test-create-cluster");
    }

    #[test]
    fn test_cluster_name_default() {
        assert_eq!(resolve_cluster_name(lookup_from(&[])), DEFAULT_CLUSTER_NAME);
        assert_eq!(
            resolve_cluster_name(lookup_from(&[("KIND_NAME", "")])),
            DEFAULT_CLUSTER_NAME
        );
    }

    #[test]
    fn test_paths_are_relative_to_work_dir() {
        let config = HarnessConfig::from_lookup(Path::new("/work"), lookup_from(&[]));

        assert_eq!(config.kubeconfig_path, PathBuf::from("/work/kind.config"));
        assert_eq!(config.kind_config_path, PathBuf::from("/work/kind.config.yaml"));
        assert!(config.template_path.is_none());
        assert!(config.previous_kubeconfig.is_none());
    }

    #[test]
    fn test_bin_dir_override() {
        let config = HarnessConfig::from_lookup(
            Path::new("/work"),
            lookup_from(&[("KINDUP_BIN_DIR", "/opt/tools")]),
        );
        assert_eq!(config.bin_dir, PathBuf::from("/opt/tools"));
    }

    #[test]
    fn test_cli_overrides() {
        let config = HarnessConfig::from_lookup(
            Path::new("/work"),
            lookup_from(&[("KIND_NAME", "from-env")]),
        )
        .with_cluster_name(Some("from-cli".to_string()))
        .with_template_path(Some(PathBuf::from("custom.yaml.hbs")));

        assert_eq!(config.cluster_name, "from-cli");
        assert_eq!(config.template_path, Some(PathBuf::from("custom.yaml.hbs")));

        let config = config.with_cluster_name(None).with_template_path(None);
        assert_eq!(config.cluster_name, "from-cli");
        assert!(config.template_path.is_some());
    }

    #[test]
    fn test_template_source_embedded_default() {
        let config = HarnessConfig::from_lookup(Path::new("/work"), lookup_from(&[]));
        assert_eq!(config.template_source().unwrap(), DEFAULT_KIND_CONFIG_TEMPLATE);
    }

    #[test]
    fn test_template_source_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kind.test.yaml.hbs");
        std::fs::write(&path, "address: {{address}}\n").unwrap();

        let config = HarnessConfig::from_lookup(
            dir.path(),
            lookup_from(&[("KIND_CFG_TEMPLATE", path.to_str().unwrap())]),
        );
        assert_eq!(config.template_source().unwrap(), "address: {{address}}\n");
    }

    #[test]
    fn test_template_source_missing_file() {
        let config = HarnessConfig::from_lookup(
            Path::new("/work"),
            lookup_from(&[("KIND_CFG_TEMPLATE", "/definitely/not/here.hbs")]),
        );

        let err = config.template_source().unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }

    #[test]
    fn test_template_source_set_but_empty() {
        let config = HarnessConfig::from_lookup(
            Path::new("/work"),
            lookup_from(&[("KIND_CFG_TEMPLATE", "")]),
        );

        let err = config.template_source().unwrap_err();
        assert!(matches!(err, Error::ConfigRead { .. }));
    }
}
