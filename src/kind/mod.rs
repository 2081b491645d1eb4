/// kind cluster management
pub mod client;
pub mod lifecycle;

pub use lifecycle::{ClusterAction, ClusterController};
