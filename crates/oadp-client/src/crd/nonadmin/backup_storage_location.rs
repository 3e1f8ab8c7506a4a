use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Condition, NonAdminPhase};
use crate::crd::velero::{BackupStorageLocationSpec, BackupStorageLocationStatus};

/// A backup storage location requested by a non-admin user. Depending on the
/// controller configuration an admin has to approve it first, see
/// [`NonAdminBackupStorageLocationRequest`](super::NonAdminBackupStorageLocationRequest).
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "oadp.openshift.io",
    version = "v1alpha1",
    kind = "NonAdminBackupStorageLocation",
    plural = "nonadminbackupstoragelocations",
    shortname = "nabsl",
    namespaced,
    status = "NonAdminBackupStorageLocationStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminBackupStorageLocationSpec {
    pub backup_storage_location_spec: BackupStorageLocationSpec,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminBackupStorageLocationStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<NonAdminPhase>,

    #[serde(rename = "veleroBackupStorageLocation", skip_serializing_if = "Option::is_none")]
    pub velero_backup_storage_location: Option<VeleroBackupStorageLocationReference>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeleroBackupStorageLocationReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nacuuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BackupStorageLocationStatus>,
}

impl NonAdminBackupStorageLocation {
    pub fn velero_status(&self) -> Option<&BackupStorageLocationStatus> {
        self.status
            .as_ref()
            .and_then(|status| status.velero_backup_storage_location.as_ref())
            .and_then(|velero| velero.status.as_ref())
    }
}
