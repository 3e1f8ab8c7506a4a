use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use oadp_shared::time::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Where Velero stores backups. Non-admin users request one through a
/// [`NonAdminBackupStorageLocation`](crate::crd::nonadmin::NonAdminBackupStorageLocation).
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "BackupStorageLocation",
    namespaced,
    status = "BackupStorageLocationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BackupStorageLocationSpec {
    pub provider: String,

    pub object_storage: ObjectStorageLocation,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credential: Option<SecretKeyReference>,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub default: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_mode: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_sync_period: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation_frequency: Option<Duration>,
}

/// A key inside a Secret in the namespace of the storage location.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
pub struct SecretKeyReference {
    pub name: String,
    pub key: String,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageLocation {
    pub bucket: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_cert: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStorageLocationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_synced_time: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_validation_time: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
