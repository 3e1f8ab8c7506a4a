//! Custom resources of the OADP non-admin controller (`oadp.openshift.io`).
//!
//! Non-admin users create these in their own namespace. The controller copies
//! them into Velero resources in the admin namespace and reports the Velero
//! status back.

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod backup;
mod backup_storage_location;
mod backup_storage_location_request;
mod download_request;
mod restore;

pub use backup::*;
pub use backup_storage_location::*;
pub use backup_storage_location_request::*;
pub use download_request::*;
pub use restore::*;

/// A status condition as reported by the non-admin controller.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    #[serde(rename = "type")]
    pub type_: String,

    pub status: ConditionStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<Time>,
}

impl Condition {
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

#[derive(
    Clone, Copy, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize, strum::Display,
)]
pub enum ConditionStatus {
    True,
    False,

    #[default]
    #[serde(other)]
    Unknown,
}

/// The request phase every non-admin object goes through.
#[derive(
    Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize, strum::Display,
)]
pub enum NonAdminPhase {
    New,
    BackingOff,
    Created,
    Deleting,

    #[serde(other)]
    Unknown,
}

/// Position of the Velero object in the server work queue.
#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueInfo {
    #[serde(default)]
    pub estimated_queue_position: i32,
}

/// Finds the condition of the given type.
pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|condition| condition.type_ == type_)
}
