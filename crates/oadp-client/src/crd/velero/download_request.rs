use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::{CustomResource, api::ObjectMeta};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::download::{DownloadRequestObject, DownloadTargetKind, Observation, Observe};

/// Asks the Velero server for a signed URL to one artifact of a backup or
/// restore. Only admins can create these, non-admin users go through
/// [`NonAdminDownloadRequest`](crate::crd::nonadmin::NonAdminDownloadRequest).
#[derive(CustomResource, Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[kube(
    group = "velero.io",
    version = "v1",
    kind = "DownloadRequest",
    namespaced,
    status = "DownloadRequestStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequestSpec {
    pub target: DownloadTarget,
}

/// The artifact a download request points at.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadTarget {
    pub kind: DownloadTargetKind,
    pub name: String,
}

#[derive(Clone, Debug, Default, Deserialize, JsonSchema, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadRequestStatus {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phase: Option<DownloadRequestPhase>,

    #[serde(rename = "downloadURL", skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<Time>,
}

#[derive(Clone, Copy, Debug, Deserialize, JsonSchema, PartialEq, Eq, Serialize, strum::Display)]
pub enum DownloadRequestPhase {
    New,
    Processed,

    #[serde(other)]
    Unknown,
}

impl Observe for DownloadRequest {
    type Output = String;

    // Velero has no error condition here, a broken request simply never
    // reaches Processed and runs into the deadline.
    fn observe(&self) -> Observation<String> {
        let Some(status) = &self.status else {
            return Observation::Pending;
        };

        match (&status.phase, &status.download_url) {
            (Some(DownloadRequestPhase::Processed), Some(url)) if !url.is_empty() => {
                Observation::Processed(url.clone())
            }
            _ => Observation::Pending,
        }
    }
}

impl DownloadRequestObject for DownloadRequest {
    fn for_target(name: &str, namespace: &str, kind: DownloadTargetKind, target: &str) -> Self {
        Self {
            metadata: ObjectMeta {
                name: Some(name.to_owned()),
                namespace: Some(namespace.to_owned()),
                ..ObjectMeta::default()
            },
            spec: DownloadRequestSpec {
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
    use rstest::rstest;

    use super::*;

    fn with_status(phase: Option<DownloadRequestPhase>, url: Option<&str>) -> DownloadRequest {
        let mut request =
            DownloadRequest::for_target("r", "ns", DownloadTargetKind::BackupLog, "nightly");
        request.status = Some(DownloadRequestStatus {
            phase,
            download_url: url.map(str::to_owned),
            expiration: None,
        });
        request
    }

    #[test]
    fn for_target_sets_spec() {
        let request = DownloadRequest::for_target(
            "nightly-backuplog-abcde",
            "openshift-adp",
            DownloadTargetKind::BackupLog,
            "nightly",
        );

        assert_eq!(request.metadata.name.as_deref(), Some("nightly-backuplog-abcde"));
        assert_eq!(request.metadata.namespace.as_deref(), Some("openshift-adp"));
        assert_eq!(request.spec.target.kind, DownloadTargetKind::BackupLog);
        assert_eq!(request.spec.target.name, "nightly");
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(DownloadRequestPhase::New), None)]
    #[case(Some(DownloadRequestPhase::Processed), None)]
    #[case(Some(DownloadRequestPhase::Processed), Some(""))]
    fn pending_until_url_is_set(
        #[case] phase: Option<DownloadRequestPhase>,
        #[case] url: Option<&str>,
    ) {
        assert_eq!(with_status(phase, url).observe(), Observation::Pending);
    }

    #[test]
    fn processed_with_url() {
        let request = with_status(Some(DownloadRequestPhase::Processed), Some("https://s3/x"));
        assert_eq!(
            request.observe(),
            Observation::Processed("https://s3/x".to_owned())
        );
    }

    #[test]
    fn deserializes_status() {
        let request: DownloadRequest = serde_json::from_value(serde_json::json!({
            "apiVersion": "velero.io/v1",
            "kind": "DownloadRequest",
            "metadata": { "name": "r", "namespace": "openshift-adp" },
            "spec": { "target": { "kind": "CSIBackupVolumeSnapshots", "name": "nightly" } },
            "status": { "phase": "Processed", "downloadURL": "https://s3/y" }
        }))
        .unwrap();

        assert_eq!(
            request.spec.target.kind,
            DownloadTargetKind::CsiBackupVolumeSnapshots
        );
        assert_eq!(request.observe(), Observation::Processed("https://s3/y".to_owned()));
    }
}
