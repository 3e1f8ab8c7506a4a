use k8s_openapi::{
    api::core::v1::ObjectReference, apimachinery::pkg::apis::meta::v1::Time,
};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A file system backup of one pod volume, created by Velero for every volume
/// backed up with the node agent.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "PodVolumeBackup",
    namespaced,
    status = "PodVolumeOperationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PodVolumeBackupSpec {
    #[serde(default)]
    pub node: String,

    #[serde(default)]
    pub pod: ObjectReference,

    #[serde(default)]
    pub volume: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_storage_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_type: Option<String>,
}

/// The file system restore of one pod volume.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "PodVolumeRestore",
    namespaced,
    status = "PodVolumeOperationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PodVolumeRestoreSpec {
    #[serde(default)]
    pub pod: ObjectReference,

    #[serde(default)]
    pub volume: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_storage_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_type: Option<String>,
}

/// Status shared by pod volume backups and restores.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PodVolumeOperationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<DataProgress>,
}

/// Bytes moved so far by a pod volume or data mover operation.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_bytes: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes_done: Option<i64>,
}
