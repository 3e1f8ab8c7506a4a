use k8s_openapi::jiff::Timestamp;

use super::{
    Describer, describe_metadata, describe_sections, format_bool, format_excluded,
    format_included, format_optional, format_or_selectors, format_progress, format_selector,
    format_time,
};
use crate::{
    crd::velero::{Backup, BackupSpec, BackupStatus, DataUpload, PodVolumeBackup},
    download::Section,
};

/// What `describe --details` adds to a backup.
#[derive(Clone, Debug, Default)]
pub struct BackupDetails {
    pub sections: Vec<Section>,
    pub data_uploads: Vec<DataUpload>,
    pub pod_volume_backups: Vec<PodVolumeBackup>,
}

pub fn describe_backup(backup: &Backup, details: Option<&BackupDetails>, now: Timestamp) -> String {
    let mut describer = Describer::new();
    describe_metadata(&mut describer, &backup.metadata);
    describer.blank();

    let default_status = BackupStatus::default();
    let status = backup.status.as_ref().unwrap_or(&default_status);
    describer.field("Phase", format_optional(status.phase));

    describe_backup_spec(&mut describer, &backup.spec);
    describe_backup_status(&mut describer, status, now);

    if let Some(details) = details {
        describe_sections(&mut describer, &details.sections);
        describe_data_uploads(&mut describer, &details.data_uploads);
        describe_pod_volume_backups(&mut describer, &details.pod_volume_backups);
    }

    describer.finish()
}

pub(super) fn describe_backup_spec(describer: &mut Describer, spec: &BackupSpec) {
    describer
        .section("Namespaces", |d| {
            d.field("Included", format_included(&spec.included_namespaces))
                .field("Excluded", format_excluded(&spec.excluded_namespaces));
        })
        .section("Resources", |d| {
            if uses_scoped_filters(spec) {
                d.field(
                    "Included cluster-scoped",
                    format_excluded(&spec.included_cluster_scoped_resources),
                )
                .field(
                    "Excluded cluster-scoped",
                    format_excluded(&spec.excluded_cluster_scoped_resources),
                )
                .field(
                    "Included namespace-scoped",
                    format_included(&spec.included_namespace_scoped_resources),
                )
                .field(
                    "Excluded namespace-scoped",
                    format_excluded(&spec.excluded_namespace_scoped_resources),
                );
            } else {
                d.field("Included", format_included(&spec.included_resources))
                    .field("Excluded", format_excluded(&spec.excluded_resources))
                    .field("Cluster-scoped", format_bool(spec.include_cluster_resources));
            }
        });

    describer
        .blank()
        .field("Label selector", format_selector(spec.label_selector.as_ref()))
        .field("Or label selector", format_or_selectors(&spec.or_label_selectors))
        .blank()
        .field("Storage Location", format_optional(spec.storage_location.as_deref()))
        .field("Velero-Native Snapshot PVs", format_bool(spec.snapshot_volumes))
        .field("Snapshot Move Data", format_bool(spec.snapshot_move_data))
        .field("Data Mover", format_optional(spec.data_mover.as_deref()))
        .field("File System Backup", format_bool(spec.default_volumes_to_fs_backup))
        .blank()
        .field("TTL", format_optional(spec.ttl))
        .field("CSI Snapshot Timeout", format_optional(spec.csi_snapshot_timeout))
        .field("Item Operation Timeout", format_optional(spec.item_operation_timeout));

    if !spec.volume_snapshot_locations.is_empty() {
        describer.field(
            "Volume Snapshot Locations",
            spec.volume_snapshot_locations.join(", "),
        );
    }
    if let Some(policy) = &spec.resource_policy {
        describer.field("Resource Policies", format!("{} {}", policy.kind, policy.name));
    }
    if let Some(parallel) = spec
        .uploader_config
        .as_ref()
        .and_then(|config| config.parallel_files_upload)
    {
        describer.field("Parallel Files Upload", parallel);
    }
    if !spec.ordered_resources.is_empty() {
        describer.section("Ordered Resources", |d| {
            for (kind, names) in &spec.ordered_resources {
                d.field(kind, names);
            }
        });
    }
}

fn uses_scoped_filters(spec: &BackupSpec) -> bool {
    !(spec.included_cluster_scoped_resources.is_empty()
        && spec.excluded_cluster_scoped_resources.is_empty()
        && spec.included_namespace_scoped_resources.is_empty()
        && spec.excluded_namespace_scoped_resources.is_empty())
}

pub(super) fn describe_backup_status(
    describer: &mut Describer,
    status: &BackupStatus,
    now: Timestamp,
) {
    describer
        .blank()
        .field("Started", format_time(status.start_timestamp.as_ref(), now))
        .field("Completed", format_time(status.completion_timestamp.as_ref(), now))
        .blank()
        .field("Expiration", format_time(status.expiration.as_ref(), now));

    if let Some(progress) = &status.progress {
        describer
            .blank()
            .field(
                "Total items to be backed up",
                format_optional(progress.total_items),
            )
            .field("Items backed up", format_optional(progress.items_backed_up));
    }

    describer
        .blank()
        .field("Errors", status.errors.unwrap_or_default())
        .field("Warnings", status.warnings.unwrap_or_default());

    if let Some(reason) = &status.failure_reason {
        describer.field("Failure reason", reason);
    }
    if !status.validation_errors.is_empty() {
        describer.section("Validation errors", |d| {
            for error in &status.validation_errors {
                d.line(error);
            }
        });
    }

    if let Some(attempted) = status.backup_item_operations_attempted {
        describer.blank().field(
            "Backup Item Operations",
            format!(
                "{} of {attempted} completed successfully, {} failed",
                status.backup_item_operations_completed.unwrap_or_default(),
                status.backup_item_operations_failed.unwrap_or_default(),
            ),
        );
    }
    if let Some(attempted) = status.volume_snapshots_attempted {
        describer.field(
            "Velero-Native Snapshots",
            format!(
                "{} of {attempted} snapshots completed successfully",
                status.volume_snapshots_completed.unwrap_or_default()
            ),
        );
    }
    if let Some(attempted) = status.csi_volume_snapshots_attempted {
        describer.field(
            "CSI Snapshots",
            format!(
                "{} of {attempted} snapshots completed successfully",
                status.csi_volume_snapshots_completed.unwrap_or_default()
            ),
        );
    }
}

fn describe_data_uploads(describer: &mut Describer, uploads: &[DataUpload]) {
    if uploads.is_empty() {
        return;
    }

    describer.section("Data Uploads", |d| {
        for upload in uploads {
            let status = upload.status.as_ref();
            d.line(format_args!(
                "{}: {}/{}",
                upload.metadata.name.as_deref().unwrap_or_default(),
                upload.spec.source_namespace,
                upload.spec.source_pvc,
            ));
            d.nested(|d| {
                d.field(
                    "Phase",
                    format_optional(status.and_then(|status| status.phase.as_deref())),
                )
                .field(
                    "Progress",
                    format_progress(status.and_then(|status| status.progress.as_ref())),
                )
                .field(
                    "Node",
                    format_optional(status.and_then(|status| status.node.as_deref())),
                );
            });
        }
    });
}

fn describe_pod_volume_backups(describer: &mut Describer, backups: &[PodVolumeBackup]) {
    if backups.is_empty() {
        return;
    }

    describer.section("Pod Volume Backups", |d| {
        for backup in backups {
            let status = backup.status.as_ref();
            d.line(format_args!(
                "{}/{}: {}",
                backup.spec.pod.namespace.as_deref().unwrap_or_default(),
                backup.spec.pod.name.as_deref().unwrap_or_default(),
                backup.spec.volume,
            ));
            d.nested(|d| {
                d.field(
                    "Phase",
                    format_optional(status.and_then(|status| status.phase.as_deref())),
                )
                .field(
                    "Progress",
                    format_progress(status.and_then(|status| status.progress.as_ref())),
                )
                .field("Node", &backup.spec.node);
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use kube::api::ObjectMeta;

    use super::*;
    use crate::{
        crd::velero::{BackupPhase, DataMovementStatus, DataUploadSpec},
        download::DownloadTargetKind,
    };

    fn nightly() -> Backup {
        Backup {
            metadata: ObjectMeta {
                name: Some("nightly".to_owned()),
                namespace: Some("openshift-adp".to_owned()),
                ..ObjectMeta::default()
            },
            spec: BackupSpec {
                included_namespaces: vec!["shop".to_owned()],
                ttl: Some("720h".parse().unwrap()),
                ..BackupSpec::default()
            },
            status: Some(BackupStatus {
                phase: Some(BackupPhase::Completed),
                warnings: Some(2),
                ..BackupStatus::default()
            }),
        }
    }

    fn now() -> Timestamp {
        "2024-06-01T10:00:00Z".parse().unwrap()
    }

    #[test]
    fn summary() {
        let output = describe_backup(&nightly(), None, now());

        assert!(output.contains("Phase:                    Completed\n"));
        assert!(output.contains("  Included:               shop\n"));
        assert!(output.contains("Snapshot Move Data:       auto\n"));
        assert!(output.contains("TTL:                      720h0m0s\n"));
        assert!(output.contains("Warnings:                 2\n"));
        assert!(!output.contains("Data Uploads"));
    }

    #[test]
    fn details_keep_section_order() {
        let details = BackupDetails {
            sections: vec![
                Section {
                    kind: DownloadTargetKind::BackupResourceList,
                    content: r#"{"v1/Namespace": ["shop"]}"#.to_owned(),
                },
                Section {
                    kind: DownloadTargetKind::BackupItemOperations,
                    content: "[]".to_owned(),
                },
            ],
            data_uploads: vec![DataUpload {
                metadata: ObjectMeta {
                    name: Some("nightly-x7k2p".to_owned()),
                    ..ObjectMeta::default()
                },
                spec: DataUploadSpec {
                    source_pvc: "data".to_owned(),
                    source_namespace: "shop".to_owned(),
                    ..DataUploadSpec::default()
                },
                status: Some(DataMovementStatus {
                    phase: Some("Completed".to_owned()),
                    ..DataMovementStatus::default()
                }),
            }],
            pod_volume_backups: Vec::new(),
        };

        let output = describe_backup(&nightly(), Some(&details), now());

        let resources = output.find("Resource List:").unwrap();
        let operations = output.find("Item Operations:").unwrap();
        let uploads = output.find("Data Uploads:").unwrap();
        assert!(resources < operations && operations < uploads);
        assert!(output.contains("  nightly-x7k2p: shop/data\n"));
        assert!(!output.contains("Pod Volume Backups"));
    }
}
