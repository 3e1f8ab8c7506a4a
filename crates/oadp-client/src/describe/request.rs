use k8s_openapi::jiff::Timestamp;

use super::{Describer, format_optional, format_time, nonadmin::describe_location_spec};
use crate::{
    approval::{APPROVAL_REASON_ANNOTATION, REJECTION_REASON_ANNOTATION},
    crd::nonadmin::NonAdminBackupStorageLocationRequest,
};

pub fn describe_request(request: &NonAdminBackupStorageLocationRequest, now: Timestamp) -> String {
    let mut describer = Describer::new();
    let metadata = &request.metadata;
    let annotation = |key: &str| {
        metadata
            .annotations
            .as_ref()
            .and_then(|annotations| annotations.get(key))
    };

    describer
        .field("Name", metadata.name.as_deref().unwrap_or_default())
        .field("Namespace", metadata.namespace.as_deref().unwrap_or_default())
        .field("Created", format_time(metadata.creation_timestamp.as_ref(), now))
        .blank()
        .field("Decision", request.decision())
        .field(
            "Phase",
            format_optional(request.status.as_ref().and_then(|status| status.phase)),
        );
    if let Some(reason) = annotation(APPROVAL_REASON_ANNOTATION) {
        describer.field("Approval Reason", reason);
    }
    if let Some(reason) = annotation(REJECTION_REASON_ANNOTATION) {
        describer.field("Rejection Reason", reason);
    }

    match request.source() {
        Some(source) => {
            describer.section("Requested by", |d| {
                d.field("Name", &source.name)
                    .field("Namespace", &source.namespace)
                    .field("NACUUID", format_optional(source.nacuuid.as_deref()));
            });
            if let Some(spec) = &source.requested_spec {
                describer.section("Requested Storage Location", |d| {
                    describe_location_spec(d, spec);
                });
            }
        }
        None => {
            describer.section("Requested by", |d| {
                d.line("<unknown>");
            });
        }
    }

    describer.finish()
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use kube::api::ObjectMeta;

    use super::*;
    use crate::crd::{
        nonadmin::{
            ApprovalDecision, ApprovalPhase, NonAdminBackupStorageLocationRequestSpec,
            NonAdminBackupStorageLocationRequestStatus, SourceNonAdminBsl,
        },
        velero::{BackupStorageLocationSpec, ObjectStorageLocation},
    };

    #[test]
    fn shows_source_and_reason() {
        let request = NonAdminBackupStorageLocationRequest {
            metadata: ObjectMeta {
                name: Some("team-a-shop-bsl-0f1e2d".to_owned()),
                namespace: Some("openshift-adp".to_owned()),
                annotations: Some(BTreeMap::from([(
                    REJECTION_REASON_ANNOTATION.to_owned(),
                    "bucket is not encrypted".to_owned(),
                )])),
                ..ObjectMeta::default()
            },
            spec: NonAdminBackupStorageLocationRequestSpec {
                approval_decision: Some(ApprovalDecision::Reject),
            },
            status: Some(NonAdminBackupStorageLocationRequestStatus {
                phase: Some(ApprovalPhase::Rejected),
                source_non_admin_bsl: Some(SourceNonAdminBsl {
                    name: "shop-bsl".to_owned(),
                    namespace: "team-a".to_owned(),
                    nacuuid: None,
                    requested_spec: Some(BackupStorageLocationSpec {
                        provider: "aws".to_owned(),
                        object_storage: ObjectStorageLocation {
                            bucket: "team-a-backups".to_owned(),
                            ..ObjectStorageLocation::default()
                        },
                        ..BackupStorageLocationSpec::default()
                    }),
                }),
            }),
        };

        let output = describe_request(&request, "2024-06-01T10:00:00Z".parse().unwrap());

        assert!(output.contains("Decision:                 reject\n"));
        assert!(output.contains("Phase:                    Rejected\n"));
        assert!(output.contains("Rejection Reason:         bucket is not encrypted\n"));
        assert!(output.contains("Requested by:\n  Name:                   shop-bsl\n"));
        assert!(output.contains("\n  Bucket:                 team-a-backups\n"));
    }
}
