use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Condition, NonAdminPhase, QueueInfo};
use crate::crd::velero::{RestoreSpec, RestoreStatus};

/// A restore of a [`NonAdminBackup`](super::NonAdminBackup) into the user's
/// own namespace.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Serialize)]
#[kube(
    group = "oadp.openshift.io",
    version = "v1alpha1",
    kind = "NonAdminRestore",
    plural = "nonadminrestores",
    shortname = "nar",
    namespaced,
    status = "NonAdminRestoreStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminRestoreSpec {
    pub restore_spec: RestoreSpec,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminRestoreStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<NonAdminPhase>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub velero_restore: Option<VeleroRestoreReference>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub queue_info: Option<QueueInfo>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeleroRestoreReference {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nacuuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<RestoreStatus>,
}

impl NonAdminRestore {
    pub fn velero_status(&self) -> Option<&RestoreStatus> {
        self.status
            .as_ref()
            .and_then(|status| status.velero_restore.as_ref())
            .and_then(|velero| velero.status.as_ref())
    }
}
