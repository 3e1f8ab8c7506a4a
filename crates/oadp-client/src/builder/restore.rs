use jiff::Zoned;
use oadp_shared::time::Duration;

use super::{
    ConflictingRestoreSourcesSnafu, MetadataFlags, MissingRestoreSourceSnafu,
    NamespaceFilterFlags, ObjectMetaBuilder, PartiallyFailedWithoutScheduleSnafu, Result,
    SelectorFlags, flags::NamespaceMappings,
};
use crate::crd::velero::{
    ExistingResourcePolicy, Restore, RestoreSpec, RestoreStatusSpec, UploaderConfigForRestore,
};

/// What a restore restores from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestoreSource {
    Backup(String),

    /// The latest successful backup of a schedule.
    Schedule {
        name: String,
        allow_partially_failed: Option<bool>,
    },
}

impl RestoreSource {
    pub fn name(&self) -> &str {
        match self {
            Self::Backup(name) | Self::Schedule { name, .. } => name,
        }
    }

    fn apply(&self, spec: &mut RestoreSpec) {
        match self {
            Self::Backup(name) => spec.backup_name = Some(name.clone()),
            Self::Schedule {
                name,
                allow_partially_failed,
            } => {
                spec.schedule_name = Some(name.clone());
                spec.allow_partially_failed = *allow_partially_failed;
            }
        }
    }
}

/// `--from-backup` and `--from-schedule`, exactly one of them is required.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreSourceFlags {
    /// Backup to restore from.
    #[arg(long, value_name = "BACKUP")]
    pub from_backup: Option<String>,

    /// Schedule to restore from, its latest successful backup is used.
    #[arg(long, value_name = "SCHEDULE")]
    pub from_schedule: Option<String>,

    /// With --from-schedule, also consider partially failed backups.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub allow_partially_failed: Option<bool>,
}

impl RestoreSourceFlags {
    pub fn source(&self) -> Result<RestoreSource> {
        match (&self.from_backup, &self.from_schedule) {
            (Some(_), Some(_)) => ConflictingRestoreSourcesSnafu.fail(),
            (None, None) => MissingRestoreSourceSnafu.fail(),
            (Some(_), None) if self.allow_partially_failed.is_some() => {
                PartiallyFailedWithoutScheduleSnafu.fail()
            }
            (Some(backup), None) => Ok(RestoreSource::Backup(backup.clone())),
            (None, Some(schedule)) => Ok(RestoreSource::Schedule {
                name: schedule.clone(),
                allow_partially_failed: self.allow_partially_failed,
            }),
        }
    }
}

/// Namespace flags only admins get: filters and mappings.
#[derive(clap::Args, Clone, Debug, Default, PartialEq, Eq)]
pub struct RestoreNamespaceFlags {
    #[command(flatten)]
    pub filters: NamespaceFilterFlags,

    /// Restore into different namespaces, as `src1:dst1,src2:dst2`.
    #[arg(long, value_name = "MAPPINGS")]
    pub namespace_mappings: Option<NamespaceMappings>,
}

impl RestoreNamespaceFlags {
    pub fn apply(&self, spec: &mut RestoreSpec) {
        spec.included_namespaces
            .clone_from(&self.filters.include_namespaces);
        spec.excluded_namespaces
            .clone_from(&self.filters.exclude_namespaces);
        if let Some(NamespaceMappings(mappings)) = &self.namespace_mappings {
            spec.namespace_mapping.clone_from(mappings);
        }
    }
}

/// Flags shared by `restore create` and `nonadmin restore create`.
#[derive(clap::Args, Clone, Debug, Default, PartialEq)]
pub struct RestoreOptions {
    /// Resources to include, comma separated. `*` means all resources.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub include_resources: Vec<String>,

    /// Resources to exclude, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub exclude_resources: Vec<String>,

    /// Include cluster scoped resources. Unset means auto.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub include_cluster_resources: Option<bool>,

    #[command(flatten)]
    pub selectors: SelectorFlags,

    /// Restore persistent volumes from snapshots. Unset means auto.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub restore_volumes: Option<bool>,

    /// Keep the node ports of services. Unset means auto.
    #[arg(
        long = "preserve-nodeports",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub preserve_node_ports: Option<bool>,

    /// What to do with resources that already exist in the cluster.
    #[arg(long, value_enum, value_name = "POLICY")]
    pub existing_resource_policy: Option<ExistingResourcePolicy>,

    /// Resources whose status is restored, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub status_include_resources: Vec<String>,

    /// Resources whose status is not restored, comma separated.
    #[arg(long, value_delimiter = ',', value_name = "RESOURCES")]
    pub status_exclude_resources: Vec<String>,

    /// How long to wait for asynchronous item operations.
    #[arg(long, value_name = "DURATION")]
    pub item_operation_timeout: Option<Duration>,

    /// Write sparse files when restoring volumes with the file system
    /// uploader.
    #[arg(
        long,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    pub write_sparse_files: Option<bool>,

    /// Number of files downloaded in parallel by the file system uploader.
    #[arg(long, value_name = "COUNT")]
    pub parallel_files_download: Option<i32>,
}

impl RestoreOptions {
    /// Builds the restore spec for `source`. Fails only if both selector
    /// flags are set.
    pub fn build(&self, source: &RestoreSource) -> Result<RestoreSpec> {
        let (label_selector, or_label_selectors) = self.selectors.build()?;

        let mut spec = RestoreSpec {
            included_resources: self.include_resources.clone(),
            excluded_resources: self.exclude_resources.clone(),
            include_cluster_resources: self.include_cluster_resources,
            label_selector,
            or_label_selectors,
            restore_pvs: self.restore_volumes,
            preserve_node_ports: self.preserve_node_ports,
            existing_resource_policy: self.existing_resource_policy,
            item_operation_timeout: self.item_operation_timeout,
            ..RestoreSpec::default()
        };
        source.apply(&mut spec);

        if !self.status_include_resources.is_empty() || !self.status_exclude_resources.is_empty() {
            spec.restore_status = Some(RestoreStatusSpec {
                included_resources: self.status_include_resources.clone(),
                excluded_resources: self.status_exclude_resources.clone(),
            });
        }
        if self.write_sparse_files.is_some() || self.parallel_files_download.is_some() {
            spec.uploader_config = Some(UploaderConfigForRestore {
                write_sparse_files: self.write_sparse_files,
                parallel_files_download: self.parallel_files_download,
            });
        }

        Ok(spec)
    }
}

/// The name of a restore created without one: `<source>-<timestamp>`.
pub fn default_restore_name(source: &RestoreSource, now: &Zoned) -> String {
    format!(
        "{source}-{timestamp}",
        source = source.name(),
        timestamp = now.strftime("%Y%m%d%H%M%S")
    )
}

/// Builds a Velero [`Restore`] named `name` in the admin namespace.
pub fn restore(name: &str, namespace: &str, metadata: &MetadataFlags, spec: RestoreSpec) -> Restore {
    Restore {
        metadata: ObjectMetaBuilder::new()
            .name(name)
            .namespace(namespace)
            .with_metadata_flags(metadata)
            .build(),
        spec,
        status: None,
    }
}

#[cfg(test)]
mod tests {
    use jiff::tz::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::builder::Error;

    fn from_backup(backup: &str) -> RestoreSource {
        RestoreSource::Backup(backup.to_owned())
    }

    #[rstest]
    #[case(Some("nightly"), None, None, Ok(from_backup("nightly")))]
    #[case(
        None,
        Some("daily"),
        Some(true),
        Ok(RestoreSource::Schedule { name: "daily".to_owned(), allow_partially_failed: Some(true) })
    )]
    #[case(Some("nightly"), Some("daily"), None, Err(Error::ConflictingRestoreSources))]
    #[case(None, None, None, Err(Error::MissingRestoreSource))]
    #[case(Some("nightly"), None, Some(true), Err(Error::PartiallyFailedWithoutSchedule))]
    fn exactly_one_source(
        #[case] backup: Option<&str>,
        #[case] schedule: Option<&str>,
        #[case] allow_partially_failed: Option<bool>,
        #[case] expected: std::result::Result<RestoreSource, Error>,
    ) {
        let flags = RestoreSourceFlags {
            from_backup: backup.map(str::to_owned),
            from_schedule: schedule.map(str::to_owned),
            allow_partially_failed,
        };

        assert_eq!(flags.source(), expected);
    }

    #[test]
    fn default_name_appends_timestamp() {
        let now = "2024-05-01T08:09:10Z"
            .parse::<jiff::Timestamp>()
            .unwrap()
            .to_zoned(TimeZone::UTC);

        assert_eq!(
            default_restore_name(&from_backup("nightly"), &now),
            "nightly-20240501080910"
        );
    }

    #[test]
    fn unset_booleans_stay_unset() {
        let spec = RestoreOptions::default()
            .build(&from_backup("nightly"))
            .unwrap();

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({ "backupName": "nightly" })
        );
    }

    #[test]
    fn flags_end_up_in_the_spec() {
        let options = RestoreOptions {
            exclude_resources: vec!["events".to_owned()],
            restore_volumes: Some(false),
            existing_resource_policy: Some(ExistingResourcePolicy::Update),
            status_include_resources: vec!["deployments".to_owned()],
            write_sparse_files: Some(true),
            ..RestoreOptions::default()
        };
        let mut spec = options
            .build(&RestoreSource::Schedule {
                name: "daily".to_owned(),
                allow_partially_failed: None,
            })
            .unwrap();
        RestoreNamespaceFlags {
            namespace_mappings: Some("shop:shop-copy".parse().unwrap()),
            ..RestoreNamespaceFlags::default()
        }
        .apply(&mut spec);

        assert_eq!(
            serde_json::to_value(&spec).unwrap(),
            serde_json::json!({
                "scheduleName": "daily",
                "excludedResources": ["events"],
                "namespaceMapping": { "shop": "shop-copy" },
                "restorePVs": false,
                "restoreStatus": { "includedResources": ["deployments"] },
                "existingResourcePolicy": "update",
                "uploaderConfig": { "writeSparseFiles": true },
            })
        );
    }
}
