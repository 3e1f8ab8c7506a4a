//! Library side of `kubectl-oadp`: the Velero and OADP non-admin resource
//! types, the builders turning command line flags into them, and the request
//! protocols (download requests, server status requests, storage location
//! approvals) the plugin runs against the cluster.

pub mod approval;
pub mod builder;
pub mod client;
pub mod config;
pub mod context;
pub mod correlation;
pub mod crd;
pub mod describe;
pub mod download;
pub mod errors;
pub mod server_status;
pub mod wait;

#[cfg(test)]
pub(crate) mod testing;

// External re-exports
pub use k8s_openapi;
pub use kube;
// Internal re-exports
pub use oadp_shared as shared;
