use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::DataProgress;

/// Moves the data of a CSI snapshot into the backup storage location.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v2alpha1",
    kind = "DataUpload",
    namespaced,
    status = "DataMovementStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DataUploadSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_type: Option<String>,

    #[serde(rename = "sourcePVC", default)]
    pub source_pvc: String,

    #[serde(default)]
    pub source_namespace: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_storage_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datamover: Option<String>,
}

/// Restores the data of a data mover backup into a new volume.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v2alpha1",
    kind = "DataDownload",
    namespaced,
    status = "DataMovementStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DataDownloadSpec {
    #[serde(default)]
    pub target_volume: TargetVolumeSpec,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_storage_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub datamover: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetVolumeSpec {
    #[serde(rename = "pvc", default)]
    pub pvc: String,

    #[serde(default)]
    pub namespace: String,
}

/// Status shared by data uploads and downloads.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataMovementStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<DataProgress>,
}
