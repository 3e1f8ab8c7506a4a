use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, Time};
use kube::CustomResource;
use oadp_shared::time::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The desired state of a Velero backup. This is also the template of a
/// [`Schedule`](super::Schedule) and the payload of a non-admin backup.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "Backup",
    namespaced,
    status = "BackupStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_cluster_scoped_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_cluster_scoped_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespace_scoped_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_namespace_scoped_resources: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or_label_selectors: Vec<LabelSelector>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_volumes: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_cluster_resources: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volume_snapshot_locations: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_volumes_to_fs_backup: Option<bool>,

    /// Maps a resource kind to a comma separated list of `namespace/name`
    /// entries that are backed up first, in that order.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub ordered_resources: BTreeMap<String, String>,

    #[serde(rename = "csiSnapshotTimeout", skip_serializing_if = "Option::is_none")]
    pub csi_snapshot_timeout: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_operation_timeout: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_policy: Option<ResourcePolicyReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot_move_data: Option<bool>,

    #[serde(rename = "datamover", skip_serializing_if = "Option::is_none")]
    pub data_mover: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_config: Option<UploaderConfigForBackup>,
}

/// Points at the ConfigMap holding the resource policies of a backup.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePolicyReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_group: Option<String>,
    pub kind: String,
    pub name: String,
}

impl ResourcePolicyReference {
    pub fn config_map(name: impl Into<String>) -> Self {
        Self {
            api_group: None,
            kind: "configmap".to_owned(),
            name: name.into(),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderConfigForBackup {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_files_upload: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<BackupPhase>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format_version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Time>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_snapshots_attempted: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_snapshots_completed: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<BackupProgress>,

    #[serde(rename = "csiVolumeSnapshotsAttempted", skip_serializing_if = "Option::is_none")]
    pub csi_volume_snapshots_attempted: Option<i32>,

    #[serde(rename = "csiVolumeSnapshotsCompleted", skip_serializing_if = "Option::is_none")]
    pub csi_volume_snapshots_completed: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_item_operations_attempted: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_item_operations_completed: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_item_operations_failed: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_backed_up: Option<i32>,
}

/// Lifecycle phases of a Velero backup.
#[derive(
    Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize, strum::Display,
)]
pub enum BackupPhase {
    New,
    FailedValidation,
    InProgress,
    WaitingForPluginOperations,
    WaitingForPluginOperationsPartiallyFailed,
    Finalizing,
    FinalizingPartiallyFailed,
    Completed,
    PartiallyFailed,
    Failed,
    Deleting,

    #[serde(other)]
    Unknown,
}

impl BackupPhase {
    /// Returns `true` once the backup controller will not touch the backup
    /// anymore (apart from deleting it).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Failed | Self::FailedValidation
        )
    }
}

impl Backup {
    pub fn phase(&self) -> Option<BackupPhase> {
        self.status.as_ref().and_then(|status| status.phase)
    }
}
