use k8s_openapi::jiff::Timestamp;

use super::{
    Describer, describe_metadata, describe_sections, format_bool, format_excluded,
    format_included, format_optional, format_or_selectors, format_progress, format_selector,
    format_time,
};
use crate::{
    crd::velero::{DataDownload, PodVolumeRestore, Restore, RestoreSpec, RestoreStatus},
    download::Section,
};

/// What `describe --details` adds to a restore.
#[derive(Clone, Debug, Default)]
pub struct RestoreDetails {
    pub sections: Vec<Section>,
    pub data_downloads: Vec<DataDownload>,
    pub pod_volume_restores: Vec<PodVolumeRestore>,
}

pub fn describe_restore(
    restore: &Restore,
    details: Option<&RestoreDetails>,
    now: Timestamp,
) -> String {
    let mut describer = Describer::new();
    describe_metadata(&mut describer, &restore.metadata);
    describer.blank();

    let default_status = RestoreStatus::default();
    let status = restore.status.as_ref().unwrap_or(&default_status);
    describer.field("Phase", format_optional(status.phase));

    describe_restore_spec(&mut describer, &restore.spec);
    describe_restore_status(&mut describer, status, now);

    if let Some(details) = details {
        describe_sections(&mut describer, &details.sections);
        describe_data_downloads(&mut describer, &details.data_downloads);
        describe_pod_volume_restores(&mut describer, &details.pod_volume_restores);
    }

    describer.finish()
}

pub(super) fn describe_restore_spec(describer: &mut Describer, spec: &RestoreSpec) {
    describer
        .blank()
        .field("Backup", format_optional(spec.backup_name.as_deref()));
    if let Some(schedule) = &spec.schedule_name {
        describer.field("Schedule", schedule).field(
            "Allow partially failed",
            format_bool(spec.allow_partially_failed),
        );
    }

    describer
        .section("Namespaces", |d| {
            d.field("Included", format_included(&spec.included_namespaces))
                .field("Excluded", format_excluded(&spec.excluded_namespaces));
        })
        .section("Resources", |d| {
            d.field("Included", format_included(&spec.included_resources))
                .field("Excluded", format_excluded(&spec.excluded_resources))
                .field("Cluster-scoped", format_bool(spec.include_cluster_resources));
        });

    describer.section("Namespace mappings", |d| {
        if spec.namespace_mapping.is_empty() {
            d.line("<none>");
        }
        for (source, target) in &spec.namespace_mapping {
            d.line(format_args!("{source}:{target}"));
        }
    });

    describer
        .blank()
        .field("Label selector", format_selector(spec.label_selector.as_ref()))
        .field("Or label selector", format_or_selectors(&spec.or_label_selectors))
        .blank()
        .field("Restore PVs", format_bool(spec.restore_pvs))
        .field("Preserve Service NodePorts", format_bool(spec.preserve_node_ports))
        .field(
            "Existing Resource Policy",
            format_optional(spec.existing_resource_policy),
        )
        .field("Item Operation Timeout", format_optional(spec.item_operation_timeout));

    if let Some(restore_status) = &spec.restore_status {
        describer.section("Restore status", |d| {
            d.field("Included", format_excluded(&restore_status.included_resources))
                .field("Excluded", format_excluded(&restore_status.excluded_resources));
        });
    }
    if let Some(config) = &spec.uploader_config {
        describer
            .blank()
            .field("Write Sparse Files", format_bool(config.write_sparse_files))
            .field(
                "Parallel Files Download",
                format_optional(config.parallel_files_download),
            );
    }
}

pub(super) fn describe_restore_status(
    describer: &mut Describer,
    status: &RestoreStatus,
    now: Timestamp,
) {
    describer
        .blank()
        .field("Started", format_time(status.start_timestamp.as_ref(), now))
        .field("Completed", format_time(status.completion_timestamp.as_ref(), now));

    if let Some(progress) = &status.progress {
        describer
            .blank()
            .field(
                "Total items to be restored",
                format_optional(progress.total_items),
            )
            .field("Items restored", format_optional(progress.items_restored));
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

    if let Some(attempted) = status.restore_item_operations_attempted {
        describer.blank().field(
            "Restore Item Operations",
            format!(
                "{} of {attempted} completed successfully, {} failed",
                status.restore_item_operations_completed.unwrap_or_default(),
                status.restore_item_operations_failed.unwrap_or_default(),
            ),
        );
    }
}

fn describe_data_downloads(describer: &mut Describer, downloads: &[DataDownload]) {
    if downloads.is_empty() {
        return;
    }

    describer.section("Data Downloads", |d| {
        for download in downloads {
            let status = download.status.as_ref();
            d.line(format_args!(
                "{}: {}/{}",
                download.metadata.name.as_deref().unwrap_or_default(),
                download.spec.target_volume.namespace,
                download.spec.target_volume.pvc,
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

fn describe_pod_volume_restores(describer: &mut Describer, restores: &[PodVolumeRestore]) {
    if restores.is_empty() {
        return;
    }

    describer.section("Pod Volume Restores", |d| {
        for restore in restores {
            let status = restore.status.as_ref();
            d.line(format_args!(
                "{}/{}: {}",
                restore.spec.pod.namespace.as_deref().unwrap_or_default(),
                restore.spec.pod.name.as_deref().unwrap_or_default(),
                restore.spec.volume,
            ));
            d.nested(|d| {
                d.field(
                    "Phase",
                    format_optional(status.and_then(|status| status.phase.as_deref())),
                )
                .field(
                    "Progress",
                    format_progress(status.and_then(|status| status.progress.as_ref())),
                );
            });
        }
    });
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use kube::api::ObjectMeta;

    use super::*;
    use crate::crd::velero::RestorePhase;

    #[test]
    fn schedule_restore_summary() {
        let restore = Restore {
            metadata: ObjectMeta {
                name: Some("nightly-20240601100000".to_owned()),
                namespace: Some("openshift-adp".to_owned()),
                ..ObjectMeta::default()
            },
            spec: RestoreSpec {
                schedule_name: Some("nightly".to_owned()),
                allow_partially_failed: Some(true),
                namespace_mapping: BTreeMap::from([("shop".to_owned(), "shop-copy".to_owned())]),
                ..RestoreSpec::default()
            },
            status: Some(RestoreStatus {
                phase: Some(RestorePhase::InProgress),
                ..RestoreStatus::default()
            }),
        };

        let output = describe_restore(&restore, None, "2024-06-01T10:00:00Z".parse().unwrap());

        assert!(output.contains("Phase:                    InProgress\n"));
        assert!(output.contains("Backup:                   <none>\n"));
        assert!(output.contains("Schedule:                 nightly\n"));
        assert!(output.contains("Allow partially failed:   true\n"));
        assert!(output.contains("Namespace mappings:\n  shop:shop-copy\n"));
        assert!(output.contains("Restore PVs:              auto\n"));
        assert!(output.contains("Started:                  <n/a>\n"));
    }
}
