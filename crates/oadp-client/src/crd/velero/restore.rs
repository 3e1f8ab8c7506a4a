use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, Time};
use kube::CustomResource;
use oadp_shared::time::Duration;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The desired state of a Velero restore, also the payload of a non-admin
/// restore.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "Restore",
    namespaced,
    status = "RestoreStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct RestoreSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule_name: Option<String>,

    /// With a schedule as source, also restore from the latest partially
    /// failed backup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_partially_failed: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_namespaces: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub namespace_mapping: BTreeMap<String, String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_selector: Option<LabelSelector>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub or_label_selectors: Vec<LabelSelector>,

    #[serde(rename = "restorePVs", skip_serializing_if = "Option::is_none")]
    pub restore_pvs: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_status: Option<RestoreStatusSpec>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_node_ports: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub include_cluster_resources: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub existing_resource_policy: Option<ExistingResourcePolicy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub item_operation_timeout: Option<Duration>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploader_config: Option<UploaderConfigForRestore>,
}

/// Which resources get their status restored as well.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStatusSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub included_resources: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_resources: Vec<String>,
}

/// What Velero does with a resource that already exists in the cluster.
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    JsonSchema,
    PartialEq,
    Eq,
    Serialize,
    clap::ValueEnum,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ExistingResourcePolicy {
    None,
    Update,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploaderConfigForRestore {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub write_sparse_files: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_files_download: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<RestorePhase>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validation_errors: Vec<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub warnings: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completion_timestamp: Option<Time>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<RestoreProgress>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_item_operations_attempted: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_item_operations_completed: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub restore_item_operations_failed: Option<i32>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestoreProgress {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub items_restored: Option<i32>,
}

/// Lifecycle phases of a Velero restore.
#[derive(
    Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize, strum::Display,
)]
pub enum RestorePhase {
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

    #[serde(other)]
    Unknown,
}

impl RestorePhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::PartiallyFailed | Self::Failed | Self::FailedValidation
        )
    }
}

impl Restore {
    pub fn phase(&self) -> Option<RestorePhase> {
        self.status.as_ref().and_then(|status| status.phase)
    }
}
