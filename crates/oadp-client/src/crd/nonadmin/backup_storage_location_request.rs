use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::crd::velero::BackupStorageLocationSpec;

/// Created by the non-admin controller in the admin namespace for every
/// [`NonAdminBackupStorageLocation`](super::NonAdminBackupStorageLocation)
/// that needs approval. The name is generated, admins usually refer to it by
/// the name of the source location instead.
#[derive(CustomResource, Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "oadp.openshift.io",
    version = "v1alpha1",
    kind = "NonAdminBackupStorageLocationRequest",
    plural = "nonadminbackupstoragelocationrequests",
    shortname = "nabslrequest",
    namespaced,
    status = "NonAdminBackupStorageLocationRequestStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminBackupStorageLocationRequestSpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_decision: Option<ApprovalDecision>,
}

/// Decision an admin takes on a storage location request. An unset decision
/// means the same as [`ApprovalDecision::Pending`].
#[derive(
    Clone,
    Copy,
    Debug,
    Deserialize,
    JsonSchema,
    PartialEq,
    Eq,
    Serialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ApprovalDecision {
    Approve,
    Reject,
    Pending,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminBackupStorageLocationRequestStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<ApprovalPhase>,

    #[serde(rename = "nonAdminBackupStorageLocation", skip_serializing_if = "Option::is_none")]
    pub source_non_admin_bsl: Option<SourceNonAdminBsl>,
}

#[derive(
    Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize, strum::Display,
)]
pub enum ApprovalPhase {
    Pending,
    Approved,
    Rejected,

    #[serde(other)]
    Unknown,
}

/// Back reference to the storage location the request was created for.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceNonAdminBsl {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub namespace: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nacuuid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub requested_spec: Option<BackupStorageLocationSpec>,
}

impl NonAdminBackupStorageLocationRequest {
    pub fn source(&self) -> Option<&SourceNonAdminBsl> {
        self.status
            .as_ref()
            .and_then(|status| status.source_non_admin_bsl.as_ref())
    }

    /// The stored decision, with an unset field reported as pending.
    pub fn decision(&self) -> ApprovalDecision {
        self.spec
            .approval_decision
            .unwrap_or(ApprovalDecision::Pending)
    }
}
