use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Condition, NonAdminPhase, QueueInfo};
use crate::crd::velero::{BackupSpec, BackupStatus};

/// A backup of the user's own namespace.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "oadp.openshift.io",
    version = "v1alpha1",
    kind = "NonAdminBackup",
    plural = "nonadminbackups",
    shortname = "nab",
    namespaced,
    status = "NonAdminBackupStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminBackupSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_spec: Option<BackupSpec>,

    /// Asks the controller to delete the Velero backup and its data, and then
    /// this object.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_backup: Option<bool>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminBackupStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<NonAdminPhase>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub velero_backup: Option<VeleroBackupReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_info: Option<QueueInfo>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

/// The Velero backup created for a [`NonAdminBackup`] in the admin namespace.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeleroBackupReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nacuuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<BackupStatus>,
}

impl NonAdminBackup {
    pub fn velero_status(&self) -> Option<&BackupStatus> {
        self.status
            .as_ref()
            .and_then(|status| status.velero_backup.as_ref())
            .and_then(|velero| velero.status.as_ref())
    }
}
