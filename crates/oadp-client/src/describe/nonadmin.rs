use k8s_openapi::jiff::Timestamp;

use super::{
    Describer,
    backup::{describe_backup_spec, describe_backup_status},
    describe_conditions, describe_metadata, describe_sections, format_credential,
    format_optional, format_time,
    restore::{describe_restore_spec, describe_restore_status},
};
use crate::{
    crd::{
        nonadmin::{NonAdminBackup, NonAdminBackupStorageLocation, NonAdminRestore, QueueInfo},
        velero::BackupStorageLocationSpec,
    },
    download::Section,
};

pub fn describe_non_admin_backup(
    backup: &NonAdminBackup,
    sections: &[Section],
    now: Timestamp,
) -> String {
    let mut describer = Describer::new();
    describe_metadata(&mut describer, &backup.metadata);

    let status = backup.status.as_ref();
    let velero = status.and_then(|status| status.velero_backup.as_ref());
    describer
        .blank()
        .field(
            "Request Phase",
            format_optional(status.and_then(|status| status.phase)),
        )
        .field(
            "Velero Backup",
            format_optional(velero.and_then(|velero| velero.name.as_deref())),
        )
        .field(
            "Velero Phase",
            format_optional(backup.velero_status().and_then(|status| status.phase)),
        );
    describe_queue(&mut describer, status.and_then(|status| status.queue_info.as_ref()));
    if backup.spec.delete_backup == Some(true) {
        describer.field("Deletion", "requested");
    }

    if let Some(spec) = &backup.spec.backup_spec {
        describe_backup_spec(&mut describer, spec);
    }
    if let Some(velero_status) = backup.velero_status() {
        describe_backup_status(&mut describer, velero_status, now);
    }
    describe_conditions(
        &mut describer,
        status.map(|status| status.conditions.as_slice()).unwrap_or_default(),
    );
    describe_sections(&mut describer, sections);

    describer.finish()
}

pub fn describe_non_admin_restore(
    restore: &NonAdminRestore,
    sections: &[Section],
    now: Timestamp,
) -> String {
    let mut describer = Describer::new();
    describe_metadata(&mut describer, &restore.metadata);

    let status = restore.status.as_ref();
    let velero = status.and_then(|status| status.velero_restore.as_ref());
    describer
        .blank()
        .field(
            "Request Phase",
            format_optional(status.and_then(|status| status.phase)),
        )
        .field(
            "Velero Restore",
            format_optional(velero.and_then(|velero| velero.name.as_deref())),
        )
        .field(
            "Velero Phase",
            format_optional(restore.velero_status().and_then(|status| status.phase)),
        );
    describe_queue(&mut describer, status.and_then(|status| status.queue_info.as_ref()));

    describe_restore_spec(&mut describer, &restore.spec.restore_spec);
    if let Some(velero_status) = restore.velero_status() {
        describe_restore_status(&mut describer, velero_status, now);
    }
    describe_conditions(
        &mut describer,
        status.map(|status| status.conditions.as_slice()).unwrap_or_default(),
    );
    describe_sections(&mut describer, sections);

    describer.finish()
}

pub fn describe_non_admin_backup_storage_location(
    location: &NonAdminBackupStorageLocation,
    now: Timestamp,
) -> String {
    let mut describer = Describer::new();
    describe_metadata(&mut describer, &location.metadata);

    let status = location.status.as_ref();
    let velero_status = location.velero_status();
    describer
        .blank()
        .field(
            "Request Phase",
            format_optional(status.and_then(|status| status.phase)),
        )
        .field(
            "Velero Phase",
            format_optional(velero_status.and_then(|status| status.phase.as_deref())),
        )
        .field(
            "Last Validated",
            format_time(
                velero_status.and_then(|status| status.last_validation_time.as_ref()),
                now,
            ),
        );
    if let Some(message) = velero_status.and_then(|status| status.message.as_deref()) {
        describer.field("Message", message);
    }

    describe_location_spec(&mut describer, &location.spec.backup_storage_location_spec);
    describe_conditions(
        &mut describer,
        status.map(|status| status.conditions.as_slice()).unwrap_or_default(),
    );

    describer.finish()
}

pub(super) fn describe_location_spec(describer: &mut Describer, spec: &BackupStorageLocationSpec) {
    describer
        .blank()
        .field("Provider", &spec.provider)
        .field("Bucket", &spec.object_storage.bucket)
        .field("Prefix", format_optional(spec.object_storage.prefix.as_deref()))
        .field("Credential", format_credential(spec.credential.as_ref()))
        .field("Backup Sync Period", format_optional(spec.backup_sync_period))
        .field("Validation Frequency", format_optional(spec.validation_frequency));

    describer.section("Config", |d| {
        if spec.config.is_empty() {
            d.line("<none>");
        }
        for (key, value) in &spec.config {
            d.field(key, value);
        }
    });
}

fn describe_queue(describer: &mut Describer, queue: Option<&QueueInfo>) {
    if let Some(queue) = queue.filter(|queue| queue.estimated_queue_position > 0) {
        describer.field("Queue Position", queue.estimated_queue_position);
    }
}

#[cfg(test)]
mod tests {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::{
        crd::{
            nonadmin::{
                Condition, ConditionStatus, NonAdminBackupSpec, NonAdminBackupStatus,
                NonAdminPhase, VeleroBackupReference,
            },
            velero::{BackupPhase, BackupSpec, BackupStatus},
        },
        download::DownloadTargetKind,
    };

    #[test]
    fn shows_request_and_velero_state() {
        let backup = NonAdminBackup {
            metadata: ObjectMeta {
                name: Some("shop".to_owned()),
                namespace: Some("team-a".to_owned()),
                ..ObjectMeta::default()
            },
            spec: NonAdminBackupSpec {
                backup_spec: Some(BackupSpec::default()),
                delete_backup: None,
            },
            status: Some(NonAdminBackupStatus {
                phase: Some(NonAdminPhase::Created),
                velero_backup: Some(VeleroBackupReference {
                    name: Some("nab-team-a-1a2b3c".to_owned()),
                    namespace: Some("openshift-adp".to_owned()),
                    nacuuid: None,
                    status: Some(BackupStatus {
                        phase: Some(BackupPhase::InProgress),
                        ..BackupStatus::default()
                    }),
                }),
                queue_info: Some(QueueInfo {
                    estimated_queue_position: 3,
                }),
                conditions: vec![Condition {
                    type_: "Accepted".to_owned(),
                    status: ConditionStatus::True,
                    reason: Some("BackupAccepted".to_owned()),
                    message: Some("backup accepted".to_owned()),
                    last_transition_time: None,
                }],
            }),
        };
        let sections = [Section {
            kind: DownloadTargetKind::BackupVolumeInfos,
            content: "[]".to_owned(),
        }];

        let output =
            describe_non_admin_backup(&backup, &sections, "2024-06-01T10:00:00Z".parse().unwrap());

        assert!(output.contains("Request Phase:            Created\n"));
        assert!(output.contains("Velero Backup:            nab-team-a-1a2b3c\n"));
        assert!(output.contains("Velero Phase:             InProgress\n"));
        assert!(output.contains("Queue Position:           3\n"));
        assert!(output.contains("Conditions:\n  Accepted=True\n"));
        assert!(output.ends_with("Volume Info:\n  []\n"));
    }
}
