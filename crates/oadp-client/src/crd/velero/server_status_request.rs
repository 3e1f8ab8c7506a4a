use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{CustomResource, api::ObjectMeta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::download::{Observation, Observe};

/// Asks the Velero server to report its version and installed plugins.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "ServerStatusRequest",
    namespaced,
    status = "ServerStatusRequestStatus"
)]
pub struct ServerStatusRequestSpec {}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerStatusRequestStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<PluginInfo>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginInfo {
    pub name: String,
    pub kind: String,
}

/// What a processed [`ServerStatusRequest`] reports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ServerStatus {
    pub server_version: String,
    pub plugins: Vec<PluginInfo>,
}

impl ServerStatusRequest {
    pub fn with_name(name: &str, namespace: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                ..ObjectMeta::default()
            },
            spec: ServerStatusRequestSpec {},
            status: None,
        }
    }
}

impl Observe for ServerStatusRequest {
    type Output = ServerStatus;

    fn observe(&self) -> Observation<ServerStatus> {
        match &self.status {
            Some(status) if status.phase.as_deref() == Some("Processed") => {
                Observation::Processed(ServerStatus {
                    server_version: status.server_version.clone().unwrap_or_default(),
                    plugins: status.plugins.clone(),
                })
            }
            _ => Observation::Pending,
        }
    }
}
