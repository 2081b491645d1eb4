/// Kind config and manifest templating
pub mod host;
pub mod renderer;

pub use host::detect_host_ip;
pub use renderer::{render_cluster_config, render_registry_manifest};

/// Default kind cluster config, wired to the local registry
pub const DEFAULT_KIND_CONFIG_TEMPLATE: &str =
    include_str!("../../templates/kind.config.yaml.hbs");

/// ConfigMap documenting the local registry to cluster workloads
pub const LOCAL_REGISTRY_TEMPLATE: &str = include_str!("../../templates/local-registry.yaml.hbs");
