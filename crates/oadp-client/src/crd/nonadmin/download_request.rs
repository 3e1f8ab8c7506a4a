use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{CustomResource, api::ObjectMeta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::{Condition, NonAdminPhase, find_condition};
use crate::{
    crd::velero::{DownloadRequestPhase, DownloadTarget},
    download::{DownloadRequestObject, DownloadTargetKind, Observation, Observe},
};

const PROCESSED_CONDITION: &str = "Processed";
const ERROR_REASON: &str = "Error";

/// The non-admin flavour of a Velero download request. The controller creates
/// the Velero request on behalf of the user and mirrors its status.
#[derive(CustomResource, Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "oadp.openshift.io",
    version = "v1alpha1",
    kind = "NonAdminDownloadRequest",
    plural = "nonadmindownloadrequests",
    shortname = "nadr",
    namespaced,
    status = "NonAdminDownloadRequestStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminDownloadRequestSpec {
    pub target: DownloadTarget,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NonAdminDownloadRequestStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<NonAdminPhase>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub velero: Option<VeleroDownloadRequest>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeleroDownloadRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<VeleroDownloadRequestStatus>,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VeleroDownloadRequestStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<DownloadRequestPhase>,

    #[serde(rename = "downloadURL", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Time>,
}

impl Observe for NonAdminDownloadRequest {
    type Output = String;

    fn observe(&self) -> Observation<String> {
        let Some(status) = &self.status else {
            return Observation::Pending;
        };

        if let Some(failed) = status
            .conditions
            .iter()
            .find(|condition| condition.is_true() && condition.reason.as_deref() == Some(ERROR_REASON))
        {
            return Observation::Failed {
                condition_type: failed.type_.clone(),
                message: failed.message.clone().unwrap_or_default(),
            };
        }

        let processed = find_condition(&status.conditions, PROCESSED_CONDITION)
            .is_some_and(Condition::is_true);
        let url = status
            .velero
            .as_ref()
            .and_then(|velero| velero.status.as_ref())
            .and_then(|velero| velero.download_url.as_deref())
            .filter(|url| !url.is_empty());

        match (processed, url) {
            (true, Some(url)) => Observation::Processed(url.to_owned()),
            _ => Observation::Pending,
        }
    }
}

impl DownloadRequestObject for NonAdminDownloadRequest {
    fn for_target(name: &str, namespace: &str, kind: DownloadTargetKind, target: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                ..ObjectMeta::default()
            },
            spec: NonAdminDownloadRequestSpec {
                target: DownloadTarget {
                    kind,
                    name: target.to_owned(),
                },
            },
            status: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::nonadmin::ConditionStatus;

    fn condition(type_: &str, status: ConditionStatus, reason: &str, message: &str) -> Condition {
        Condition {
            type_: type_.to_owned(),
            status,
            reason: Some(reason.to_owned()),
            message: Some(message.to_owned()),
            last_transition_time: None,
        }
    }

    fn request(conditions: Vec<Condition>, url: Option<&str>) -> NonAdminDownloadRequest {
        let mut request = NonAdminDownloadRequest::for_target(
            "nightly-backupresults-x1y2z",
            "team-a",
            DownloadTargetKind::BackupResults,
            "nightly",
        );
        request.status = Some(NonAdminDownloadRequestStatus {
            phase: Some(NonAdminPhase::Created),
            velero: Some(VeleroDownloadRequest {
                status: Some(VeleroDownloadRequestStatus {
                    phase: url.map(|_| DownloadRequestPhase::Processed),
                    download_url: url.map(str::to_owned),
                    expiration: None,
                }),
            }),
            conditions,
        });
        request
    }

    #[test]
    fn pending_without_status() {
        let request = NonAdminDownloadRequest::for_target(
            "r",
            "team-a",
            DownloadTargetKind::BackupLog,
            "nightly",
        );
        assert_eq!(request.observe(), Observation::Pending);
    }

    #[test]
    fn processed_needs_condition_and_url() {
        let processed = condition("Processed", ConditionStatus::True, "Success", "");

        assert_eq!(
            request(vec![processed.clone()], None).observe(),
            Observation::Pending
        );
        assert_eq!(
            request(vec![], Some("https://s3/z")).observe(),
            Observation::Pending
        );
        assert_eq!(
            request(vec![processed], Some("https://s3/z")).observe(),
            Observation::Processed("https://s3/z".to_owned())
        );
    }

    #[test]
    fn error_condition_fails_with_type_and_message() {
        let failed = condition(
            "Accepted",
            ConditionStatus::True,
            "Error",
            "backup nightly does not exist",
        );

        assert_eq!(
            request(vec![failed], Some("https://s3/z")).observe(),
            Observation::Failed {
                condition_type: "Accepted".to_owned(),
                message: "backup nightly does not exist".to_owned(),
            }
        );
    }

    #[test]
    fn false_error_condition_is_ignored() {
        let stale = condition("Accepted", ConditionStatus::False, "Error", "old");
        assert_eq!(request(vec![stale], None).observe(), Observation::Pending);
    }
}
