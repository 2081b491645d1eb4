/// Kubernetes-side helpers driven through kubectl
pub mod kubeconfig;
pub mod resources;

pub use kubeconfig::KubeConfigSummary;
pub use resources::ResourceManager;
