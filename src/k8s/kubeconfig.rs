/// Minimal view of a kube-config, enough to report which cluster it points at
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawKubeConfig {
    #[serde(rename = "current-context", default)]
    current_context: Option<String>,
    #[serde(default)]
    clusters: Vec<NamedCluster>,
    #[serde(default)]
    contexts: Vec<NamedContext>,
}

#[derive(Debug, Deserialize)]
struct NamedCluster {
    name: String,
    cluster: ClusterEntry,
}

#[derive(Debug, Deserialize)]
struct ClusterEntry {
    server: String,
}

#[derive(Debug, Deserialize)]
struct NamedContext {
    name: String,
    context: ContextEntry,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
}

/// Current context and the API server it talks to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KubeConfigSummary {
    pub current_context: String,
    pub server: String,
}

impl KubeConfigSummary {
    /// Parse kube-config YAML, `None` if it has no usable current context
    pub fn parse(contents: &str) -> Option<Self> {
        let raw: RawKubeConfig = serde_yaml::from_str(contents).ok()?;
        let current = raw.current_context?;

        let cluster_name = raw
            .contexts
            .iter()
            .find(|c| c.name == current)
            .map(|c| c.context.cluster.as_str())?;
        let server = raw
            .clusters
            .iter()
            .find(|c| c.name == cluster_name)
            .map(|c| c.cluster.server.clone())?;

        Some(Self {
            current_context: current,
            server,
        })
    }
}
